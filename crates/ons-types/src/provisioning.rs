//! Terminal outcome codes for provisioning evaluation and download retry.

use serde::{Deserialize, Serialize};

/// Terminal outcome of one provisioning evaluation.
///
/// Exactly one outcome per evaluation. `Success` means either that the
/// configuration is already complete or that a side-effect request
/// (download, grouping) was issued; completion of such a request is
/// observed via a later trigger, never awaited inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningResult {
    Success,
    /// SIM transport not ready yet; evaluation is re-triggered later.
    SimNotReady,
    /// Feature flag disabled in device configuration.
    AutoProvisioningDisabled,
    EsimNotSupported,
    MultiSimNotSupported,
    /// The inserted primary's carrier is not flagged for opportunistic
    /// data auto-provisioning.
    CarrierDoesntSupportCbrs,
    NoSimInserted,
    /// The only active subscription is itself opportunistic; an
    /// opportunistic profile must not be used without its primary.
    SingleActiveOpportunisticSim,
    /// Switching to dual-SIM capacity would require a restart.
    CannotSwitchToDualSimMode,
    /// Mode switch issued; a later trigger completes provisioning.
    SwitchedToDualSimMode,
    /// Both slots already carry primary subscriptions, no room for an
    /// opportunistic eSIM.
    DualActiveSubscriptions,
    Unknown,
}

impl ProvisioningResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SimNotReady => "sim_not_ready",
            Self::AutoProvisioningDisabled => "auto_provisioning_disabled",
            Self::EsimNotSupported => "esim_not_supported",
            Self::MultiSimNotSupported => "multi_sim_not_supported",
            Self::CarrierDoesntSupportCbrs => "carrier_doesnt_support_cbrs",
            Self::NoSimInserted => "no_sim_inserted",
            Self::SingleActiveOpportunisticSim => "single_active_opportunistic_sim",
            Self::CannotSwitchToDualSimMode => "cannot_switch_to_dual_sim_mode",
            Self::SwitchedToDualSimMode => "switched_to_dual_sim_mode",
            Self::DualActiveSubscriptions => "dual_active_subscriptions",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProvisioningResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery action derived from one download completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOperationCode {
    DownloadSuccessful,
    /// Fatal for this attempt cycle; no automatic retry until the next
    /// qualifying trigger (for example a SIM state change).
    StopRetryUntilSimStateChange,
    /// Free eUICC storage by deleting an inactive opportunistic profile,
    /// then retry.
    DeleteInactiveOppEsimIfExists,
    /// A stale profile from the same operator blocks installation;
    /// delete it, then retry.
    DeleteExistingProfileAndRetry,
    RetryAfterBackoffTime,
}

impl RetryOperationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadSuccessful => "download_successful",
            Self::StopRetryUntilSimStateChange => "stop_retry_until_sim_state_change",
            Self::DeleteInactiveOppEsimIfExists => "delete_inactive_opp_esim_if_exists",
            Self::DeleteExistingProfileAndRetry => "delete_existing_profile_and_retry",
            Self::RetryAfterBackoffTime => "retry_after_backoff_time",
        }
    }
}

impl std::fmt::Display for RetryOperationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
