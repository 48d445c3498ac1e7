//! Enumerations of the payments API that the engine dispatches on.
//!
//! Raw strings are parsed with [`std::str::FromStr`] (snake_case); anything outside these sets is
//! an unmodelled response and surfaces as a classification error.

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaptureMethod {
    Automatic,
    Manual,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthenticationType {
    ThreeDs,
    NoThreeDs,
}

/// Domain status of a payment as reported in `status`.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,
    Failed,
    Cancelled,
    Processing,
    RequiresCustomerAction,
    RequiresMerchantAction,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresCapture,
    PartiallyCaptured,
    PartiallyCapturedAndCapturable,
}

/// Payment-method family the dispatcher specializes on. Derived from the response's
/// `payment_method` and, for UPI, `payment_method_type`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethodFamily {
    /// Any method without a dedicated flow, e.g. pay_later or bank_debit
    Generic,
    Card,
    Wallet,
    BankRedirect,
    BankTransfer,
    UpiCollect,
    UpiIntent,
}

/// Which `next_action` field a continuation token was read from.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContinuationKind {
    RedirectToUrl,
    QrCodeUrl,
    QrCodeFetchUrl,
    ImageDataUrl,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MandateStatus {
    Active,
    Inactive,
    Pending,
    Revoked,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayoutStatus {
    Success,
    Failed,
    Cancelled,
    Initiated,
    Expired,
    Reversed,
    Pending,
    Ineligible,
    RequiresCreation,
    RequiresConfirmation,
    RequiresPayoutMethodData,
    RequiresFulfillment,
    RequiresVendorAccountCreation,
}

/// Where a payout sits in the create → fulfill lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PayoutLifecycle {
    /// Created, not yet fulfilled
    Pending,
    /// Fulfilled, either explicitly or at creation through `auto_fulfill`
    Fulfilled,
    /// Failed, cancelled, expired, reversed or ineligible
    Terminated,
}

impl PayoutStatus {
    pub fn lifecycle(self) -> PayoutLifecycle {
        match self {
            Self::Success => PayoutLifecycle::Fulfilled,
            Self::Initiated
            | Self::Pending
            | Self::RequiresCreation
            | Self::RequiresConfirmation
            | Self::RequiresPayoutMethodData
            | Self::RequiresFulfillment
            | Self::RequiresVendorAccountCreation => PayoutLifecycle::Pending,
            Self::Failed | Self::Cancelled | Self::Expired | Self::Reversed | Self::Ineligible => {
                PayoutLifecycle::Terminated
            }
        }
    }
}
