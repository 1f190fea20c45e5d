//! Port traits for the provisioning core.
//!
//! Implemented by platform adapters (telephony, eSIM platform,
//! connectivity). Core logic depends only on these traits. Config and
//! capability queries are cheap cached reads; registry and eSIM calls
//! are requests whose completion is observed via later triggers, never
//! awaited inline by the decision engine.

use async_trait::async_trait;

use ons_types::{
    CarrierId, GroupId, RetryOperationCode, SubscriptionId, SubscriptionInfo, SubscriptionSnapshot,
};

use crate::error::Result;

/// Per-operator configuration, device capabilities and connectivity
/// state.
#[async_trait]
pub trait CarrierConfig: Send + Sync {
    /// SIM transport ready for queries.
    async fn is_sim_ready(&self) -> Result<bool>;

    /// Feature flag from device configuration. Nothing runs when false.
    async fn is_auto_provisioning_enabled(&self) -> Result<bool>;

    async fn is_esim_supported(&self) -> Result<bool>;

    /// Device supports two simultaneously active subscriptions.
    async fn is_multi_sim_capable(&self) -> Result<bool>;

    /// Device currently limited to one active subscription.
    async fn is_single_sim_mode(&self) -> Result<bool>;

    /// Request a switch to dual-capacity mode. Returns false when the
    /// switch would require a restart; true when the switch was issued
    /// (completion arrives as a later SIM state change trigger).
    async fn switch_to_multi_sim_mode(&self) -> Result<bool>;

    /// The given primary's carrier is flagged for opportunistic data
    /// auto-provisioning.
    async fn carrier_supports_auto_provisioning(&self, sub: SubscriptionId) -> Result<bool>;

    /// Carrier ids the given primary's operator declares as its
    /// opportunistic counterparts.
    async fn opportunistic_carrier_ids(&self, sub: SubscriptionId) -> Result<Vec<CarrierId>>;

    /// FQDN of the operator's profile server, if configured.
    async fn smdp_server_address(&self, sub: SubscriptionId) -> Result<Option<String>>;

    /// Unit multiplier (seconds) for exponential retry delay.
    async fn backoff_base_seconds(&self, sub: SubscriptionId) -> Result<u32>;

    /// Retry ceiling; further attempts wait for the next trigger.
    async fn max_retry_attempts(&self, sub: SubscriptionId) -> Result<u32>;

    /// Validated internet connectivity is available.
    async fn is_connected(&self) -> Result<bool>;

    /// Persist the retry-when-connected flag consumed by the
    /// connectivity-restored trigger.
    async fn set_retry_when_connected(&self, enable: bool) -> Result<()>;

    async fn retry_when_connected(&self) -> Result<bool>;
}

/// Subscription registry operations: snapshots, grouping and profile
/// deletion. Counterpart matching lives in the core
/// ([`crate::matching`]), not behind this port.
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Point-in-time view of the subscriptions selected for service.
    async fn active_subscriptions(&self) -> Result<SubscriptionSnapshot>;

    /// All known subscriptions, including downloaded-but-inactive
    /// embedded profiles.
    async fn available_subscriptions(&self) -> Result<Vec<SubscriptionInfo>>;

    async fn is_active(&self, sub: SubscriptionId) -> Result<bool>;

    /// Create a fresh group containing only the given subscription.
    async fn create_group(&self, sub: SubscriptionId) -> Result<GroupId>;

    /// Add the opportunistic subscription to the primary's group and
    /// mark it opportunistic.
    async fn group_with_psim_and_mark_opportunistic(
        &self,
        opp: SubscriptionId,
        group: GroupId,
    ) -> Result<()>;

    /// Free eUICC storage: delete one inactive opportunistic profile,
    /// preferring profiles of the given primary's operator. Returns
    /// false when nothing suitable was found.
    async fn delete_inactive_opportunistic(&self, psim: SubscriptionId) -> Result<bool>;

    async fn delete_subscription(&self, sub: SubscriptionId) -> Result<()>;
}

/// The platform download primitive. One request, one later callback
/// delivered through [`crate::downloader::DownloadHandle`].
#[async_trait]
pub trait EsimClient: Send + Sync {
    async fn request_download(
        &self,
        primary: SubscriptionId,
        activation_code: &str,
    ) -> Result<()>;
}

/// Upward notifications to the orchestrator.
#[async_trait]
pub trait DownloadListener: Send + Sync {
    async fn on_download_complete(&self, primary: SubscriptionId);

    async fn on_download_error(&self, code: RetryOperationCode, primary: SubscriptionId);
}
