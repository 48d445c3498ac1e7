//! Header names, error triples and defaults shared by the flows.

/// Header carrying merchant and admin API keys
pub const API_KEY_HEADER: &str = "api-key";

/// Correlation header returned by the service; logged, never validated
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Error code returned when a merchant-initiated payment violates its mandate
pub const MANDATE_VALIDATION_FAILED_CODE: &str = "HE_03";

pub const MANDATE_VALIDATION_FAILED_MESSAGE: &str = "Mandate Validation Failed";

pub const MANDATE_AMOUNT_EXCEEDED_REASON: &str = "request amount is greater than mandate amount";

pub const MANDATE_ALREADY_REVOKED_REASON: &str = "Mandate has already been revoked";

/// `next_action.type` of a response that shows a wait screen instead of a redirect
pub const WAIT_SCREEN_NEXT_ACTION: &str = "wait_screen_information";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Prefix of environment variables overriding [`crate::configs::settings::Settings`]
pub const CONFIG_ENV_PREFIX: &str = "SCENARIO";

/// Env variable holding an explicit settings file path
pub const CONFIG_FILE_PATH_ENV: &str = "SCENARIO_CONFIG_FILE_PATH";
