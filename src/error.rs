//! Error types for the scanners.

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Operator string was missing, not 5 to 8 characters long, or not all digits
    #[error("bad mcc/mnc: {0:?}")]
    InvalidOperatorFormat(Option<String>),

    #[error("unexpected cell location type: {0}")]
    UnsupportedLocationType(String),

    #[error("unexpected network type: {name}")]
    UnsupportedNetworkType { code: i32, name: String },

    #[error("unexpected phone type: {0}")]
    UnsupportedPhoneType(i32),

    /// Platform capability is not ready to be queried
    #[error("{0} service unavailable")]
    ServiceUnavailable(&'static str),

    #[error("scanner has not been configured")]
    NotConfigured,

    #[error("scanner is already configured")]
    AlreadyConfigured,

    /// Platform refused a location update request
    #[error("location request failed: {0}")]
    Request(String),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
