//! Opportunistic counterpart matching.
//!
//! A downloaded opportunistic profile is recognized by carrier id: the
//! primary's operator declares the carrier ids of its opportunistic
//! counterparts in carrier configuration. Group compatibility matters
//! because a profile grouped with some other primary must not be
//! captured.

use tracing::{debug, warn};

use ons_types::{SubscriptionId, SubscriptionInfo};

use crate::error::Result;
use crate::ports::{CarrierConfig, SubscriptionRegistry};

/// Search available subscriptions for the opportunistic counterpart of
/// the given primary: an embedded profile whose carrier id appears in
/// the primary's declared opportunistic list and which is either
/// ungrouped or already in the primary's group.
pub async fn find_opportunistic_subscription(
    config: &dyn CarrierConfig,
    registry: &dyn SubscriptionRegistry,
    psim: SubscriptionId,
) -> Result<Option<SubscriptionInfo>> {
    let carrier_ids = config.opportunistic_carrier_ids(psim).await?;
    if carrier_ids.is_empty() {
        warn!(%psim, "opportunistic carrier-id list is empty in carrier config");
        return Ok(None);
    }

    let psim_group = registry
        .active_subscriptions()
        .await?
        .get(psim)
        .and_then(|sub| sub.group_id);

    for sub in registry.available_subscriptions().await? {
        if sub.id == psim || !sub.embedded {
            continue;
        }
        if !carrier_ids.contains(&sub.carrier_id) {
            continue;
        }
        if sub.group_id.is_none() || sub.group_id == psim_group {
            debug!(%psim, opp = %sub.id, "opportunistic counterpart found");
            return Ok(Some(sub));
        }
    }

    Ok(None)
}
