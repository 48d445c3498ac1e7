//!
//! Redirection seam and the per-connector exceptions table.
//!
//! The engine never drives a browser. It hands the continuation it extracted to a
//! [`RedirectionHandler`] together with the connector and payment method, and treats the result
//! as opaque.
//!

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    errors::{CustomResult, RedirectionError},
    types::enums::{ContinuationKind, PaymentMethodFamily},
};

/// Which kind of customer interaction the continuation leads to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RedirectionFlow {
    ThreeDs,
    BankRedirect,
    BankTransfer,
    Upi,
}

impl From<PaymentMethodFamily> for RedirectionFlow {
    fn from(family: PaymentMethodFamily) -> Self {
        match family {
            PaymentMethodFamily::Generic | PaymentMethodFamily::Card | PaymentMethodFamily::Wallet => {
                Self::ThreeDs
            }
            PaymentMethodFamily::BankRedirect => Self::BankRedirect,
            PaymentMethodFamily::BankTransfer => Self::BankTransfer,
            PaymentMethodFamily::UpiCollect | PaymentMethodFamily::UpiIntent => Self::Upi,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RedirectionTarget {
    /// Field the url was read from, so QR payloads are not opened as pages
    pub kind: ContinuationKind,
    pub redirection_url: String,
    /// Where the customer lands once the interaction completes
    pub expected_url: String,
}

/// Whatever the handler observed at the end of the interaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedirectionOutcome(Value);

impl RedirectionOutcome {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

#[async_trait]
pub trait RedirectionHandler: Send + Sync {
    async fn follow(
        &self,
        flow: RedirectionFlow,
        target: RedirectionTarget,
        connector_id: &str,
        payment_method_type: Option<&str>,
        extra: Option<Value>,
    ) -> CustomResult<RedirectionOutcome, RedirectionError>;
}

/// Deviation from the standard continuation handling for one connector and payment method.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RedirectionOverride {
    /// Expect `next_action.type = wait_screen_information` instead of a redirect url
    WaitScreen,
    /// Keep the continuation but never hand it to the redirection handler
    SkipRedirection,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct RedirectionException {
    pub connector: String,
    pub payment_method_type: String,
    pub behaviour: RedirectionOverride,
}

/// `(connector, payment_method_type) -> override` table loaded from settings.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RedirectionOverrides {
    exceptions: Vec<RedirectionException>,
}

impl RedirectionOverrides {
    pub fn new(exceptions: Vec<RedirectionException>) -> Self {
        Self { exceptions }
    }

    pub fn lookup(
        &self,
        connector: &str,
        payment_method_type: Option<&str>,
    ) -> Option<RedirectionOverride> {
        let payment_method_type = payment_method_type?;
        self.exceptions
            .iter()
            .find(|exception| {
                exception.connector.eq_ignore_ascii_case(connector)
                    && exception
                        .payment_method_type
                        .eq_ignore_ascii_case(payment_method_type)
            })
            .map(|exception| exception.behaviour)
    }
}
