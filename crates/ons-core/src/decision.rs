//! Provisioning decision engine.
//!
//! One evaluation per trigger: an ordered short-circuit walk over device
//! capabilities and the active subscription snapshot, ending in exactly
//! one [`ProvisioningResult`]. The engine requests side effects (mode
//! switch, grouping, download) from its ports but never waits for their
//! completion; completion arrives as a later trigger.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ons_types::{
    GroupId, ProvisioningResult, SubscriptionId, SubscriptionInfo, SubscriptionSnapshot,
};

use crate::downloader::DownloadHandle;
use crate::error::Result;
use crate::matching;
use crate::ports::{CarrierConfig, SubscriptionRegistry};

pub struct ProvisioningEngine {
    config: Arc<dyn CarrierConfig>,
    registry: Arc<dyn SubscriptionRegistry>,
    downloader: DownloadHandle,
}

impl ProvisioningEngine {
    pub fn new(
        config: Arc<dyn CarrierConfig>,
        registry: Arc<dyn SubscriptionRegistry>,
        downloader: DownloadHandle,
    ) -> Self {
        Self {
            config,
            registry,
            downloader,
        }
    }

    /// Evaluate the current subscription configuration and request at
    /// most one provisioning action. Idempotent for an unchanged
    /// snapshot and configuration.
    pub async fn evaluate(&self) -> Result<ProvisioningResult> {
        if !self.config.is_sim_ready().await? {
            return Ok(ProvisioningResult::SimNotReady);
        }
        if !self.config.is_auto_provisioning_enabled().await? {
            return Ok(ProvisioningResult::AutoProvisioningDisabled);
        }
        if !self.config.is_esim_supported().await? {
            return Ok(ProvisioningResult::EsimNotSupported);
        }
        if !self.config.is_multi_sim_capable().await? {
            return Ok(ProvisioningResult::MultiSimNotSupported);
        }

        let snapshot = self.registry.active_subscriptions().await?;
        let result = match snapshot.active_count() {
            0 => ProvisioningResult::NoSimInserted,
            1 => {
                // Just checked, the snapshot has exactly one entry.
                let Some(sub) = snapshot.iter().next().cloned() else {
                    return Ok(ProvisioningResult::Unknown);
                };
                self.evaluate_single(sub).await?
            }
            _ => self.evaluate_multiple(&snapshot).await?,
        };

        info!(result = %result, "provisioning evaluation finished");
        Ok(result)
    }

    /// One active subscription: the candidate primary. Gate on its
    /// carrier and the device's active-subscription capacity, then
    /// either capture an already-downloaded counterpart or start a
    /// download.
    async fn evaluate_single(&self, sub: SubscriptionInfo) -> Result<ProvisioningResult> {
        if sub.opportunistic {
            // Opportunistic-only service is not a supported setup.
            return Ok(ProvisioningResult::SingleActiveOpportunisticSim);
        }
        if !self
            .config
            .carrier_supports_auto_provisioning(sub.id)
            .await?
        {
            return Ok(ProvisioningResult::CarrierDoesntSupportCbrs);
        }
        if self.config.is_single_sim_mode().await? {
            if !self.config.switch_to_multi_sim_mode().await? {
                return Ok(ProvisioningResult::CannotSwitchToDualSimMode);
            }
            // Switch issued; a SIM state change re-triggers evaluation
            // once it completes.
            info!(psim = %sub.id, "switch to dual-subscription mode requested");
            return Ok(ProvisioningResult::SwitchedToDualSimMode);
        }

        let group = self.ensure_group(&sub).await?;
        let counterpart =
            matching::find_opportunistic_subscription(&*self.config, &*self.registry, sub.id)
                .await?;
        match counterpart {
            Some(opp) => {
                self.group_counterpart(sub.id, &opp, group).await?;
            }
            None => {
                debug!(psim = %sub.id, "no downloaded counterpart, requesting download");
                self.downloader.request_download(sub.id)?;
            }
        }
        Ok(ProvisioningResult::Success)
    }

    /// Two or more active subscriptions: room for an opportunistic
    /// profile only if one of them already is (or can become) the
    /// counterpart of a supported primary.
    async fn evaluate_multiple(&self, snapshot: &SubscriptionSnapshot) -> Result<ProvisioningResult> {
        if snapshot.all_physical() {
            return Ok(ProvisioningResult::DualActiveSubscriptions);
        }

        for sub in snapshot.iter().filter(|s| !s.embedded) {
            if !self
                .config
                .carrier_supports_auto_provisioning(sub.id)
                .await?
            {
                continue;
            }
            let counterpart =
                matching::find_opportunistic_subscription(&*self.config, &*self.registry, sub.id)
                    .await?;
            let Some(opp) = counterpart else { continue };

            if opp.opportunistic && self.registry.is_active(opp.id).await? {
                debug!(psim = %sub.id, opp = %opp.id, "already provisioned, nothing to do");
                return Ok(ProvisioningResult::Success);
            }

            let group = self.ensure_group(sub).await?;
            self.group_counterpart(sub.id, &opp, group).await?;
            return Ok(ProvisioningResult::Success);
        }

        // The embedded subscription present is not a counterpart of any
        // supported primary, so both slots are taken.
        Ok(ProvisioningResult::DualActiveSubscriptions)
    }

    async fn ensure_group(&self, sub: &SubscriptionInfo) -> Result<GroupId> {
        match sub.group_id {
            Some(group) => Ok(group),
            None => self.registry.create_group(sub.id).await,
        }
    }

    async fn group_counterpart(
        &self,
        psim: SubscriptionId,
        opp: &SubscriptionInfo,
        group: GroupId,
    ) -> Result<()> {
        info!(%psim, opp = %opp.id, %group, "grouping opportunistic counterpart");
        self.registry
            .group_with_psim_and_mark_opportunistic(opp.id, group)
            .await
    }

    /// Completion hook for a finished profile download: capture the new
    /// profile into the primary's group.
    pub async fn handle_download_complete(&self, primary: SubscriptionId) -> Result<()> {
        self.config.set_retry_when_connected(false).await?;

        let snapshot = self.registry.active_subscriptions().await?;
        let Some(psim) = snapshot.get(primary).cloned() else {
            warn!(%primary, "primary no longer active after download, leaving profile ungrouped");
            return Ok(());
        };

        let counterpart =
            matching::find_opportunistic_subscription(&*self.config, &*self.registry, primary)
                .await?;
        let Some(opp) = counterpart else {
            warn!(%primary, "downloaded profile not found in subscription registry");
            return Ok(());
        };

        let group = self.ensure_group(&psim).await?;
        self.group_counterpart(primary, &opp, group).await
    }

    /// SIM state changes simply re-run the evaluation.
    pub async fn handle_sim_state_change(&self) -> Result<ProvisioningResult> {
        self.evaluate().await
    }

    /// Connectivity restored: re-evaluate only when a download was
    /// deferred for lack of a connection.
    pub async fn handle_connectivity_restored(&self) -> Result<Option<ProvisioningResult>> {
        if !self.config.retry_when_connected().await? {
            return Ok(None);
        }
        self.config.set_retry_when_connected(false).await?;
        info!("connection restored, resuming deferred provisioning");
        Ok(Some(self.evaluate().await?))
    }
}
