#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//!
//! Scenario engine: runs ordered payment, mandate and payout flows against a live payments API,
//! threads identifiers from one step into the next through a per-scenario context and checks
//! every response against an expected-outcome fixture.
//!

pub mod configs;
pub mod consts;
pub mod context;
pub mod core;
pub mod errors;
pub mod fixtures;
pub mod redirection;
pub mod scenario;
pub mod transport;
pub mod types;
pub mod validator;

pub use crate::{
    context::{ContextKey, ContextValue, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    scenario::{Scenario, ScenarioState, StepOutcome},
};
