//! Subscription identity and snapshot types.
//!
//! A snapshot is a point-in-time view produced by the subscription
//! registry. The provisioning core never mutates subscription state
//! directly; it only reads these views and issues requests back to the
//! registry port.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform identifier of one subscription slot (physical or embedded).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SubscriptionId(pub i32);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Carrier identifier as declared by the operator registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CarrierId(pub i32);

impl std::fmt::Display for CarrierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription group id. Subscriptions in the same group share cellular
/// service; an opportunistic profile must be grouped with its primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time attributes of one subscription, as reported by the
/// subscription registry. Read-only to the provisioning core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub carrier_id: CarrierId,
    /// True for embedded (eSIM) profiles, false for physical SIM cards.
    pub embedded: bool,
    /// Marked opportunistic in the registry.
    pub opportunistic: bool,
    /// Group membership, if any.
    pub group_id: Option<GroupId>,
    pub mcc: String,
    pub mnc: String,
}

impl SubscriptionInfo {
    /// A plain physical subscription with no group membership.
    pub fn physical(id: SubscriptionId, carrier_id: CarrierId) -> Self {
        Self {
            id,
            carrier_id,
            embedded: false,
            opportunistic: false,
            group_id: None,
            mcc: String::new(),
            mnc: String::new(),
        }
    }

    /// An embedded subscription with no group membership.
    pub fn embedded(id: SubscriptionId, carrier_id: CarrierId) -> Self {
        Self {
            id,
            carrier_id,
            embedded: true,
            opportunistic: false,
            group_id: None,
            mcc: String::new(),
            mnc: String::new(),
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn marked_opportunistic(mut self) -> Self {
        self.opportunistic = true;
        self
    }
}

/// Ordered view of the subscriptions currently selected for cellular
/// service. A given subscription id appears at most once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    active: Vec<SubscriptionInfo>,
}

impl SubscriptionSnapshot {
    /// Build a snapshot, keeping the first occurrence of each id.
    pub fn new(active: Vec<SubscriptionInfo>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let active = active
            .into_iter()
            .filter(|sub| seen.insert(sub.id))
            .collect();
        Self { active }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubscriptionInfo> {
        self.active.iter()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<&SubscriptionInfo> {
        self.active.iter().find(|sub| sub.id == id)
    }

    /// True when every active subscription is a physical SIM.
    pub fn all_physical(&self) -> bool {
        self.active.iter().all(|sub| !sub.embedded)
    }
}
