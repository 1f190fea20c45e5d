//! Opportunistic profile download with classified retry.
//!
//! Single-consumer actor per process: requests, platform callbacks and
//! retry timers all arrive as [`DownloadEvent`]s on one channel, so the
//! per-primary attempt state needs no locking. Callbacks are classified
//! into a small recovery taxonomy ([`RetryOperationCode`]); transient
//! failures are retried with exponential backoff and jitter up to the
//! operator-configured ceiling, unresolvable failures are reported
//! upward and left for the next qualifying trigger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ons_types::{
    DownloadCallback, DownloadResult, EsimErrorCode, EsimOperation, RetryOperationCode,
    SubscriptionId,
};

use crate::error::{ProvisionError, Result};
use crate::matching;
use crate::ports::{CarrierConfig, DownloadListener, EsimClient, SubscriptionRegistry};
use crate::smdx::{decode_smdx, SMDX_DOWNLOAD_ORDER_EXPIRED, SMDX_EUICC_INSUFFICIENT_MEMORY};

/// Events consumed by the download actor.
#[derive(Debug)]
pub enum DownloadEvent {
    /// Begin (or restart) a download for the given primary subscription.
    Request { primary: SubscriptionId },
    /// Completion signal from the eSIM platform.
    Callback {
        primary: SubscriptionId,
        callback: DownloadCallback,
    },
    /// A scheduled retry timer elapsed.
    RetryTimerFired {
        primary: SubscriptionId,
        generation: u64,
    },
}

/// Cloneable entry point feeding the download actor. Held by the
/// decision engine (requests) and the platform callback adapter
/// (completions).
#[derive(Clone)]
pub struct DownloadHandle {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl DownloadHandle {
    pub fn request_download(&self, primary: SubscriptionId) -> Result<()> {
        self.send(DownloadEvent::Request { primary })
    }

    pub fn deliver_callback(
        &self,
        primary: SubscriptionId,
        callback: DownloadCallback,
    ) -> Result<()> {
        self.send(DownloadEvent::Callback { primary, callback })
    }

    fn retry_fired(&self, primary: SubscriptionId, generation: u64) {
        // The actor shutting down while a timer is in flight is normal.
        let _ = self.tx.send(DownloadEvent::RetryTimerFired {
            primary,
            generation,
        });
    }

    fn send(&self, event: DownloadEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| ProvisionError::EngineStopped)
    }
}

/// Per-primary retry bookkeeping. At most one in-flight download or
/// scheduled retry per primary subscription id; a newer request
/// supersedes by bumping the generation and aborting the timer.
struct DownloadAttempt {
    retry_count: u32,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    last_attempt_at: DateTime<Utc>,
}

impl DownloadAttempt {
    fn new(generation: u64) -> Self {
        Self {
            retry_count: 0,
            generation,
            timer: None,
            last_attempt_at: Utc::now(),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// The download retry engine.
pub struct ProfileDownloader {
    config: Arc<dyn CarrierConfig>,
    registry: Arc<dyn SubscriptionRegistry>,
    esim: Arc<dyn EsimClient>,
    listener: Arc<dyn DownloadListener>,
    handle: DownloadHandle,
    rx: mpsc::UnboundedReceiver<DownloadEvent>,
    attempts: HashMap<SubscriptionId, DownloadAttempt>,
    next_generation: u64,
}

impl ProfileDownloader {
    pub fn new(
        config: Arc<dyn CarrierConfig>,
        registry: Arc<dyn SubscriptionRegistry>,
        esim: Arc<dyn EsimClient>,
        listener: Arc<dyn DownloadListener>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            registry,
            esim,
            listener,
            handle: DownloadHandle { tx },
            rx,
            attempts: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn handle(&self) -> DownloadHandle {
        self.handle.clone()
    }

    /// Run the actor loop until the shutdown signal flips or every
    /// handle is dropped. Pending timers are cancelled on exit with no
    /// side effects on the subscription registry.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("profile downloader started");
        loop {
            tokio::select! {
                event = self.rx.recv() => {
                    let Some(event) = event else { break };
                    if let Err(e) = self.handle_event(event).await {
                        error!(error = %e, "download event failed");
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.cancel_all();
        info!("profile downloader stopped");
    }

    fn cancel_all(&mut self) {
        for attempt in self.attempts.values_mut() {
            attempt.cancel_timer();
        }
        self.attempts.clear();
    }

    async fn handle_event(&mut self, event: DownloadEvent) -> Result<()> {
        match event {
            DownloadEvent::Request { primary } => self.start_download(primary).await,
            DownloadEvent::Callback { primary, callback } => {
                self.handle_callback(primary, callback).await
            }
            DownloadEvent::RetryTimerFired {
                primary,
                generation,
            } => match self.attempts.get(&primary) {
                Some(attempt) if attempt.generation == generation => {
                    self.start_download(primary).await
                }
                _ => {
                    debug!(%primary, generation, "stale retry timer ignored");
                    Ok(())
                }
            },
        }
    }

    /// Issue one download request for the given primary, gated on
    /// connectivity and profile-server configuration.
    async fn start_download(&mut self, primary: SubscriptionId) -> Result<()> {
        if !self.config.is_connected().await? {
            info!(%primary, "no internet connection, deferring esim download");
            self.config.set_retry_when_connected(true).await?;
            return Ok(());
        }

        let address = self.config.smdp_server_address(primary).await?;
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            // Configuration defect, not a transient failure: no retry.
            warn!(%primary, "smdp server address missing in carrier config");
            return Ok(());
        };

        let generation = self.begin_attempt(primary);
        let activation_code = format!("1${address}$");
        debug!(%primary, generation, "download request sent to esim platform");
        self.esim.request_download(primary, &activation_code).await
    }

    /// Supersede any pending attempt for this primary and stamp a fresh
    /// generation, so stale timers become no-ops.
    fn begin_attempt(&mut self, primary: SubscriptionId) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let attempt = self
            .attempts
            .entry(primary)
            .or_insert_with(|| DownloadAttempt::new(generation));
        attempt.cancel_timer();
        attempt.generation = generation;
        attempt.last_attempt_at = Utc::now();
        generation
    }

    async fn handle_callback(
        &mut self,
        primary: SubscriptionId,
        callback: DownloadCallback,
    ) -> Result<()> {
        let op = classify_callback(&callback);
        debug!(
            %primary,
            op = op.as_str(),
            result = ?callback.result,
            error = ?callback.error,
            "download callback classified"
        );

        match op {
            RetryOperationCode::DownloadSuccessful => {
                self.clear(primary);
                self.listener.on_download_complete(primary).await;
                Ok(())
            }
            RetryOperationCode::StopRetryUntilSimStateChange => {
                if let Some(err) = callback.error {
                    error!(%primary, error = %err.describe(), "unresolvable download error");
                }
                self.clear(primary);
                self.listener.on_download_error(op, primary).await;
                Ok(())
            }
            RetryOperationCode::DeleteInactiveOppEsimIfExists => {
                if self.registry.delete_inactive_opportunistic(primary).await? {
                    self.schedule_retry(primary).await
                } else {
                    warn!(%primary, "no inactive opportunistic esim to free storage");
                    self.clear(primary);
                    self.listener.on_download_error(op, primary).await;
                    Ok(())
                }
            }
            RetryOperationCode::DeleteExistingProfileAndRetry => {
                let existing = matching::find_opportunistic_subscription(
                    &*self.config,
                    &*self.registry,
                    primary,
                )
                .await?;
                match existing {
                    Some(opp) => {
                        info!(%primary, opp = %opp.id, "deleting stale profile before retry");
                        self.registry.delete_subscription(opp.id).await?;
                        self.schedule_retry(primary).await
                    }
                    None => {
                        warn!(%primary, "no stale profile found to delete");
                        self.clear(primary);
                        self.listener.on_download_error(op, primary).await;
                        Ok(())
                    }
                }
            }
            RetryOperationCode::RetryAfterBackoffTime => self.schedule_retry(primary).await,
        }
    }

    fn clear(&mut self, primary: SubscriptionId) {
        if let Some(mut attempt) = self.attempts.remove(&primary) {
            attempt.cancel_timer();
        }
    }

    /// Count the failure and either arm a jittered backoff timer or
    /// abandon the download once the attempt ceiling is reached.
    async fn schedule_retry(&mut self, primary: SubscriptionId) -> Result<()> {
        let max_attempts = self.config.max_retry_attempts(primary).await?;
        let base_secs = self.config.backoff_base_seconds(primary).await?;

        let Some(attempt) = self.attempts.get_mut(&primary) else {
            debug!(%primary, "retry requested for unknown download, ignoring");
            return Ok(());
        };

        attempt.retry_count += 1;
        if attempt.retry_count >= max_attempts {
            warn!(
                %primary,
                attempts = attempt.retry_count,
                last_attempt_at = %attempt.last_attempt_at,
                "download retry attempts exhausted, waiting for next trigger"
            );
            self.clear(primary);
            return Ok(());
        }

        let delay = calculate_backoff_delay(attempt.retry_count, base_secs);
        let generation = attempt.generation;
        info!(
            %primary,
            retry = attempt.retry_count,
            delay_secs = delay.as_secs(),
            "download retry scheduled"
        );

        let handle = self.handle.clone();
        attempt.cancel_timer();
        attempt.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.retry_fired(primary, generation);
        }));
        Ok(())
    }
}

/// Map one platform callback onto the recovery taxonomy.
pub fn classify_callback(callback: &DownloadCallback) -> RetryOperationCode {
    match callback.operation {
        EsimOperation::Download => {
            if callback.result == DownloadResult::Ok {
                return RetryOperationCode::DownloadSuccessful;
            }
            match callback.error {
                Some(EsimErrorCode::EuiccInsufficientMemory) => {
                    RetryOperationCode::DeleteInactiveOppEsimIfExists
                }
                Some(
                    EsimErrorCode::TimeOut
                    | EsimErrorCode::ConnectionError
                    | EsimErrorCode::OperationBusy,
                ) => RetryOperationCode::RetryAfterBackoffTime,
                Some(EsimErrorCode::InstallProfile) => {
                    RetryOperationCode::DeleteExistingProfileAndRetry
                }
                _ => RetryOperationCode::StopRetryUntilSimStateChange,
            }
        }
        EsimOperation::SmdxSubjectReasonCode => {
            let code = decode_smdx(callback.detailed_code);
            if code.matches(
                SMDX_EUICC_INSUFFICIENT_MEMORY.0,
                SMDX_EUICC_INSUFFICIENT_MEMORY.1,
            ) {
                RetryOperationCode::DeleteInactiveOppEsimIfExists
            } else if code.matches(
                SMDX_DOWNLOAD_ORDER_EXPIRED.0,
                SMDX_DOWNLOAD_ORDER_EXPIRED.1,
            ) {
                RetryOperationCode::RetryAfterBackoffTime
            } else {
                RetryOperationCode::StopRetryUntilSimStateChange
            }
        }
        // Callbacks are registered for download requests only; anything
        // else is not ours.
        EsimOperation::Other(_) => RetryOperationCode::StopRetryUntilSimStateChange,
    }
}

/// Jittered exponential backoff: a uniform draw from `[1, 2^n - 1]`
/// backoff units, where `n` is the retry count. The first retry
/// collapses to exactly one unit.
fn calculate_backoff_delay(retry_count: u32, backoff_base_secs: u32) -> Duration {
    // Ceiling computed before the draw; capped to keep the shift sane
    // for absurd retry configurations.
    let ceiling = (1u64 << retry_count.min(16)) - 1;
    let units = rand::thread_rng().gen_range(1..=ceiling.max(1));
    Duration::from_secs(units * u64::from(backoff_base_secs))
}
