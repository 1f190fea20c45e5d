//! Shared types for opportunistic subscription auto-provisioning.
//!
//! Pure data: identifiers, subscription snapshots, terminal result codes
//! and the eSIM platform callback vocabulary. No behavior beyond
//! constructors, accessors and serde. Every boundary (decision engine,
//! download engine, orchestrator adapters) speaks these types.

pub mod esim;
pub mod provisioning;
pub mod subscription;

pub use esim::{DownloadCallback, DownloadResult, EsimErrorCode, EsimOperation, SmdxCode};
pub use provisioning::{ProvisioningResult, RetryOperationCode};
pub use subscription::{
    CarrierId, GroupId, SubscriptionId, SubscriptionInfo, SubscriptionSnapshot,
};
