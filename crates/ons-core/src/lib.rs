//! Opportunistic eSIM auto-provisioning core.
//!
//! Decides when a device needs a secondary opportunistic profile
//! downloaded and grouped with its physical primary subscription, and
//! drives the asynchronous profile download to completion through
//! classified retries. Platform concerns (telephony registry, eSIM
//! platform, carrier configuration, connectivity) sit behind port
//! traits in [`ports`]; this crate carries no transport of its own.
//!
//! Wiring: adapters implement the ports, a [`downloader::ProfileDownloader`]
//! actor is spawned with a shutdown channel, and its handle is given to
//! a [`decision::ProvisioningEngine`] that the orchestrator invokes on
//! each trigger.

pub mod decision;
pub mod downloader;
pub mod error;
pub mod matching;
pub mod ports;
pub mod smdx;

#[cfg(test)]
pub(crate) mod testing;

pub use decision::ProvisioningEngine;
pub use downloader::{classify_callback, DownloadEvent, DownloadHandle, ProfileDownloader};
pub use error::{ProvisionError, Result};
pub use matching::find_opportunistic_subscription;
pub use ports::{CarrierConfig, DownloadListener, EsimClient, SubscriptionRegistry};
pub use smdx::{decode_smdx, SMDX_DOWNLOAD_ORDER_EXPIRED, SMDX_EUICC_INSUFFICIENT_MEMORY};
