//! Types.

use serde::Deserialize;
use strum::{Display, EnumString};
pub use tracing::Level;

/// Category and tag of log event.
#[derive(Debug, Default, Deserialize, Clone, Display, EnumString)]
pub enum Tag {
    /// General.
    #[default]
    General,
    /// API: outgoing request to the service under test.
    ApiOutgoingRequest,
    /// API: response received from the service under test.
    ApiIncomingResponse,
    /// Scenario context written.
    ContextWrite,
    /// Response classified.
    Classification,
    /// Control handed to the redirection handler.
    Redirection,
}

/// Scenario step being executed. Recorded on every step span as `flow`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Merchant account create flow
    MerchantsAccountCreate,
    /// Merchant account retrieve flow
    MerchantsAccountRetrieve,
    /// Merchant account delete flow
    MerchantsAccountDelete,
    /// Api key create flow
    ApiKeyCreate,
    /// Customer create flow
    CustomersCreate,
    /// Merchant connector create flow
    MerchantConnectorsCreate,
    /// Payments create flow
    PaymentsCreate,
    /// Payments confirm flow
    PaymentsConfirm,
    /// Payments capture flow
    PaymentsCapture,
    /// Payments cancel flow
    PaymentsCancel,
    /// Payments retrieve flow
    PaymentsRetrieve,
    /// Redirection handed off for a continuation token
    PaymentsRedirect,
    /// Refunds create flow
    RefundsCreate,
    /// Refunds retrieve flow
    RefundsRetrieve,
    /// Customer-initiated mandate setup
    MandateCustomerInitiated,
    /// Merchant-initiated payment against a mandate
    MandateMerchantInitiated,
    /// Mandate retrieve flow
    MandatesRetrieve,
    /// Mandates list for a customer
    MandatesList,
    /// Mandate revoke flow
    MandatesRevoke,
    /// Payouts create flow
    PayoutsCreate,
    /// Payouts fulfill flow
    PayoutsFulfill,
    /// Payouts update flow
    PayoutsUpdate,
    /// Payouts retrieve flow
    PayoutsRetrieve,
    /// Payouts cancel flow
    PayoutsCancel,
}
