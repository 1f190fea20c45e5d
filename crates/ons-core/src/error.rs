use thiserror::Error;

use ons_types::SubscriptionId;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Failures surfaced by the provisioning core or its ports.
///
/// Terminal provisioning outcomes are not errors; they are reported as
/// [`ons_types::ProvisioningResult`] values. This type covers port
/// failures and engine lifecycle faults only.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("carrier config unavailable for subscription {0}")]
    ConfigUnavailable(SubscriptionId),

    #[error("subscription registry error: {0}")]
    Registry(String),

    #[error("esim platform error: {0}")]
    Esim(String),

    #[error("download engine stopped")]
    EngineStopped,

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}
