#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

mod admin;
mod halting;
mod payments;
mod payouts;
mod utils;
