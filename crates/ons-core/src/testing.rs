//! In-memory fake ports for unit tests. Record every request so tests
//! can assert on side effects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ons_types::{
    CarrierId, GroupId, RetryOperationCode, SubscriptionId, SubscriptionInfo,
    SubscriptionSnapshot,
};

use crate::error::Result;
use crate::ports::{CarrierConfig, DownloadListener, EsimClient, SubscriptionRegistry};

/// Carrier configuration fake with per-flag toggles.
pub(crate) struct FakeConfig {
    sim_ready: AtomicBool,
    enabled: AtomicBool,
    esim_supported: AtomicBool,
    multi_sim_capable: AtomicBool,
    single_sim_mode: AtomicBool,
    switch_result: AtomicBool,
    pub switch_calls: AtomicUsize,
    carrier_supported: Mutex<HashMap<SubscriptionId, bool>>,
    opp_carrier_ids: Mutex<Vec<CarrierId>>,
    smdp_address: Mutex<Option<String>>,
    backoff_base_secs: AtomicU32,
    max_attempts: AtomicU32,
    connected: AtomicBool,
    retry_when_connected: AtomicBool,
}

impl FakeConfig {
    /// Device ready for provisioning: SIM up, feature enabled, eSIM and
    /// multi-SIM capable, dual mode active, internet connected.
    pub fn cbrs_ready() -> Self {
        Self {
            sim_ready: AtomicBool::new(true),
            enabled: AtomicBool::new(true),
            esim_supported: AtomicBool::new(true),
            multi_sim_capable: AtomicBool::new(true),
            single_sim_mode: AtomicBool::new(false),
            switch_result: AtomicBool::new(true),
            switch_calls: AtomicUsize::new(0),
            carrier_supported: Mutex::new(HashMap::new()),
            opp_carrier_ids: Mutex::new(Vec::new()),
            smdp_address: Mutex::new(Some("smdp.example.com".to_string())),
            backoff_base_secs: AtomicU32::new(1),
            max_attempts: AtomicU32::new(3),
            connected: AtomicBool::new(true),
            retry_when_connected: AtomicBool::new(false),
        }
    }

    pub fn set_sim_ready(&self, v: bool) {
        self.sim_ready.store(v, Ordering::SeqCst);
    }

    pub fn set_enabled(&self, v: bool) {
        self.enabled.store(v, Ordering::SeqCst);
    }

    pub fn set_esim_supported(&self, v: bool) {
        self.esim_supported.store(v, Ordering::SeqCst);
    }

    pub fn set_multi_sim_capable(&self, v: bool) {
        self.multi_sim_capable.store(v, Ordering::SeqCst);
    }

    pub fn set_single_sim_mode(&self, v: bool) {
        self.single_sim_mode.store(v, Ordering::SeqCst);
    }

    pub fn set_switch_result(&self, v: bool) {
        self.switch_result.store(v, Ordering::SeqCst);
    }

    pub fn set_carrier_supported(&self, sub: SubscriptionId, v: bool) {
        self.carrier_supported.lock().unwrap().insert(sub, v);
    }

    pub fn set_opportunistic_carrier_ids(&self, ids: Vec<CarrierId>) {
        *self.opp_carrier_ids.lock().unwrap() = ids;
    }

    pub fn set_smdp_address(&self, addr: Option<&str>) {
        *self.smdp_address.lock().unwrap() = addr.map(str::to_string);
    }

    pub fn set_backoff_base_secs(&self, v: u32) {
        self.backoff_base_secs.store(v, Ordering::SeqCst);
    }

    pub fn set_max_attempts(&self, v: u32) {
        self.max_attempts.store(v, Ordering::SeqCst);
    }

    pub fn set_connected(&self, v: bool) {
        self.connected.store(v, Ordering::SeqCst);
    }

    pub fn retry_when_connected_flag(&self) -> bool {
        self.retry_when_connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CarrierConfig for FakeConfig {
    async fn is_sim_ready(&self) -> Result<bool> {
        Ok(self.sim_ready.load(Ordering::SeqCst))
    }

    async fn is_auto_provisioning_enabled(&self) -> Result<bool> {
        Ok(self.enabled.load(Ordering::SeqCst))
    }

    async fn is_esim_supported(&self) -> Result<bool> {
        Ok(self.esim_supported.load(Ordering::SeqCst))
    }

    async fn is_multi_sim_capable(&self) -> Result<bool> {
        Ok(self.multi_sim_capable.load(Ordering::SeqCst))
    }

    async fn is_single_sim_mode(&self) -> Result<bool> {
        Ok(self.single_sim_mode.load(Ordering::SeqCst))
    }

    async fn switch_to_multi_sim_mode(&self) -> Result<bool> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.switch_result.load(Ordering::SeqCst))
    }

    async fn carrier_supports_auto_provisioning(&self, sub: SubscriptionId) -> Result<bool> {
        Ok(self
            .carrier_supported
            .lock()
            .unwrap()
            .get(&sub)
            .copied()
            .unwrap_or(false))
    }

    async fn opportunistic_carrier_ids(&self, _sub: SubscriptionId) -> Result<Vec<CarrierId>> {
        Ok(self.opp_carrier_ids.lock().unwrap().clone())
    }

    async fn smdp_server_address(&self, _sub: SubscriptionId) -> Result<Option<String>> {
        Ok(self.smdp_address.lock().unwrap().clone())
    }

    async fn backoff_base_seconds(&self, _sub: SubscriptionId) -> Result<u32> {
        Ok(self.backoff_base_secs.load(Ordering::SeqCst))
    }

    async fn max_retry_attempts(&self, _sub: SubscriptionId) -> Result<u32> {
        Ok(self.max_attempts.load(Ordering::SeqCst))
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn set_retry_when_connected(&self, enable: bool) -> Result<()> {
        self.retry_when_connected.store(enable, Ordering::SeqCst);
        Ok(())
    }

    async fn retry_when_connected(&self) -> Result<bool> {
        Ok(self.retry_when_connected.load(Ordering::SeqCst))
    }
}

/// Subscription registry fake backed by plain vectors.
#[derive(Default)]
pub(crate) struct FakeRegistry {
    active: Mutex<SubscriptionSnapshot>,
    available: Mutex<Vec<SubscriptionInfo>>,
    group: Mutex<Option<GroupId>>,
    pub created_groups: Mutex<Vec<SubscriptionId>>,
    pub grouped: Mutex<Vec<(SubscriptionId, GroupId)>>,
    pub deleted: Mutex<Vec<SubscriptionId>>,
    pub delete_inactive_calls: Mutex<Vec<SubscriptionId>>,
    delete_inactive_result: AtomicBool,
}

impl FakeRegistry {
    pub fn set_active(&self, snapshot: SubscriptionSnapshot) {
        *self.active.lock().unwrap() = snapshot;
    }

    pub fn set_available(&self, subs: Vec<SubscriptionInfo>) {
        *self.available.lock().unwrap() = subs;
    }

    pub fn set_delete_inactive_result(&self, v: bool) {
        self.delete_inactive_result.store(v, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionRegistry for FakeRegistry {
    async fn active_subscriptions(&self) -> Result<SubscriptionSnapshot> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn available_subscriptions(&self) -> Result<Vec<SubscriptionInfo>> {
        Ok(self.available.lock().unwrap().clone())
    }

    async fn is_active(&self, sub: SubscriptionId) -> Result<bool> {
        Ok(self.active.lock().unwrap().get(sub).is_some())
    }

    async fn create_group(&self, sub: SubscriptionId) -> Result<GroupId> {
        self.created_groups.lock().unwrap().push(sub);
        let mut group = self.group.lock().unwrap();
        let id = group.get_or_insert_with(GroupId::random);
        Ok(*id)
    }

    async fn group_with_psim_and_mark_opportunistic(
        &self,
        opp: SubscriptionId,
        group: GroupId,
    ) -> Result<()> {
        self.grouped.lock().unwrap().push((opp, group));
        Ok(())
    }

    async fn delete_inactive_opportunistic(&self, psim: SubscriptionId) -> Result<bool> {
        self.delete_inactive_calls.lock().unwrap().push(psim);
        Ok(self.delete_inactive_result.load(Ordering::SeqCst))
    }

    async fn delete_subscription(&self, sub: SubscriptionId) -> Result<()> {
        self.deleted.lock().unwrap().push(sub);
        Ok(())
    }
}

/// Records download requests and forwards them to the test.
pub(crate) struct FakeEsim {
    tx: mpsc::UnboundedSender<(SubscriptionId, String)>,
}

impl FakeEsim {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SubscriptionId, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EsimClient for FakeEsim {
    async fn request_download(
        &self,
        primary: SubscriptionId,
        activation_code: &str,
    ) -> Result<()> {
        let _ = self.tx.send((primary, activation_code.to_string()));
        Ok(())
    }
}

/// Upward notification observed by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListenerEvent {
    Complete(SubscriptionId),
    Error(RetryOperationCode, SubscriptionId),
}

pub(crate) struct FakeListener {
    tx: mpsc::UnboundedSender<ListenerEvent>,
}

impl FakeListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ListenerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DownloadListener for FakeListener {
    async fn on_download_complete(&self, primary: SubscriptionId) {
        let _ = self.tx.send(ListenerEvent::Complete(primary));
    }

    async fn on_download_error(&self, code: RetryOperationCode, primary: SubscriptionId) {
        let _ = self.tx.send(ListenerEvent::Error(code, primary));
    }
}
