#![forbid(unsafe_code)]
#![warn(missing_docs)]

//!
//! Wrapper types for credentials handled by the scenario harness: admin keys, merchant API keys,
//! client secrets and connector account details. Wrapped values print as a placeholder in
//! `Debug` output so they never leak into step logs.
//!

mod strategy;
pub use strategy::{Strategy, WithType};

mod abs;
pub use abs::{ExposeInterface, PeekInterface};

mod secret;
pub use secret::Secret;

mod serde;
pub use crate::serde::SerializableSecret;

pub mod maskable;
pub use maskable::{Mask, Maskable};
