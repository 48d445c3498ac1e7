pub mod admin;
pub mod classifier;
pub mod dispatcher;
pub mod mandate;
pub mod payments;
pub mod payouts;
pub mod utils;
