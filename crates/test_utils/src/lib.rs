#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Credential and automation settings for connector scenarios.

pub mod connector_auth;
pub mod errors;
