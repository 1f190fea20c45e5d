//! eSIM platform callback vocabulary.
//!
//! The platform download primitive reports completion through an
//! asynchronous callback carrying a result class, an operation
//! discriminator, an optional error code and a packed detail code.
//! These are modeled as enums rather than raw integers so the retry
//! classifier can match exhaustively.

use serde::{Deserialize, Serialize};

/// Result class of a platform eSIM operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadResult {
    Ok,
    /// Failed, but a remedial action may clear the cause.
    ResolvableError,
    Error,
}

/// Which platform operation a callback refers to. The download engine
/// registers for download callbacks only; anything else is not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EsimOperation {
    Download,
    /// Profile-server failure reported as a packed GSMA SGP.22
    /// subject/reason code in [`DownloadCallback::detailed_code`].
    SmdxSubjectReasonCode,
    Other(i32),
}

/// Platform error codes attached to a failed download operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EsimErrorCode {
    TimeOut,
    ConnectionError,
    OperationBusy,
    EuiccInsufficientMemory,
    InstallProfile,
    InvalidActivationCode,
    CertificateError,
    UnsupportedVersion,
    InvalidResponse,
    SimMissing,
    AddressMissing,
    NoProfilesAvailable,
    CarrierLocked,
    Other(i32),
}

impl EsimErrorCode {
    /// Human-readable name for diagnostics of unresolvable failures.
    pub fn describe(&self) -> String {
        match self {
            Self::TimeOut => "ERROR_TIME_OUT".into(),
            Self::ConnectionError => "ERROR_CONNECTION_ERROR".into(),
            Self::OperationBusy => "ERROR_OPERATION_BUSY".into(),
            Self::EuiccInsufficientMemory => "ERROR_EUICC_INSUFFICIENT_MEMORY".into(),
            Self::InstallProfile => "ERROR_INSTALL_PROFILE".into(),
            Self::InvalidActivationCode => "ERROR_INVALID_ACTIVATION_CODE".into(),
            Self::CertificateError => "ERROR_CERTIFICATE_ERROR".into(),
            Self::UnsupportedVersion => "ERROR_UNSUPPORTED_VERSION".into(),
            Self::InvalidResponse => "ERROR_INVALID_RESPONSE".into(),
            Self::SimMissing => "ERROR_SIM_MISSING".into(),
            Self::AddressMissing => "ERROR_ADDRESS_MISSING".into(),
            Self::NoProfilesAvailable => "ERROR_NO_PROFILES_AVAILABLE".into(),
            Self::CarrierLocked => "ERROR_CARRIER_LOCKED".into(),
            Self::Other(code) => format!("UNKNOWN({code})"),
        }
    }
}

/// One completion signal from the platform download primitive,
/// correlated to a primary subscription by the delivery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadCallback {
    pub result: DownloadResult,
    /// Packed vendor detail code; meaningful only for
    /// [`EsimOperation::SmdxSubjectReasonCode`].
    pub detailed_code: u32,
    pub operation: EsimOperation,
    pub error: Option<EsimErrorCode>,
}

impl DownloadCallback {
    /// A successful download completion.
    pub fn ok() -> Self {
        Self {
            result: DownloadResult::Ok,
            detailed_code: 0,
            operation: EsimOperation::Download,
            error: None,
        }
    }

    /// A failed download completion with the given result class and error.
    pub fn failure(result: DownloadResult, error: EsimErrorCode) -> Self {
        Self {
            result,
            detailed_code: 0,
            operation: EsimOperation::Download,
            error: Some(error),
        }
    }

    /// A profile-server failure carrying a packed subject/reason code.
    pub fn smdx(detailed_code: u32) -> Self {
        Self {
            result: DownloadResult::Error,
            detailed_code,
            operation: EsimOperation::SmdxSubjectReasonCode,
            error: None,
        }
    }
}

/// Decoded GSMA SGP.22 hierarchical error code pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmdxCode {
    /// Subject code, SGP.22 5.2.6.1 (for example "8.1.0": eUICC).
    pub subject: String,
    /// Reason code, SGP.22 5.2.6.2 (for example "4.8": insufficient memory).
    pub reason: String,
}

impl SmdxCode {
    pub fn matches(&self, subject: &str, reason: &str) -> bool {
        self.subject == subject && self.reason == reason
    }
}

impl std::fmt::Display for SmdxCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject, self.reason)
    }
}
