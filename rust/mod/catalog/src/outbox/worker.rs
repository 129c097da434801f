use std::sync::Arc;
use std::time::Duration;

use storeadmin_blob::{content_type_for, AssetStorage};
use storeadmin_core::{now_unix, ServiceError};
use storeadmin_matching::{ItemImage, ItemRegistration, ItemServices};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::store::OutboxStore;
use crate::model::{DeliveryStatus, Notification, NotifyAction};

/// Configuration for the outbox delivery loop.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// How often to look for due rows when nobody wakes the worker.
    pub poll_interval: Duration,
    /// Rows claimed per scan.
    pub batch_size: u32,
    /// Attempts before a row is marked FAILED.
    pub max_attempts: u32,
    /// First retry delay (seconds); doubles per attempt.
    pub backoff_base_secs: i64,
    /// Upper bound on the retry delay (seconds).
    pub backoff_max_secs: i64,
    /// A claimed row not finished within this many seconds is handed out again.
    pub stale_after_secs: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            max_attempts: 8,
            backoff_base_secs: 5,
            backoff_max_secs: 3600,
            stale_after_secs: 120,
        }
    }
}

impl OutboxConfig {
    /// Delay before the next try after `attempts` failures:
    /// `base * 2^(attempts-1)`, capped at `backoff_max_secs`.
    pub fn backoff_secs(&self, attempts: u32) -> i64 {
        let exp = attempts.saturating_sub(1);
        let factor = 1i64.checked_shl(exp).filter(|f| *f > 0).unwrap_or(i64::MAX);
        self.backoff_base_secs
            .max(0)
            .saturating_mul(factor)
            .min(self.backoff_max_secs)
    }
}

/// Counts from one delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub retrying: usize,
    pub failed: usize,
}

/// Delivers claimed outbox rows to the item-matching services.
pub struct OutboxWorker {
    store: OutboxStore,
    services: ItemServices,
    assets: Arc<AssetStorage>,
    config: OutboxConfig,
}

impl OutboxWorker {
    pub fn new(
        store: OutboxStore,
        services: ItemServices,
        assets: Arc<AssetStorage>,
        config: OutboxConfig,
    ) -> Self {
        Self {
            store,
            services,
            assets,
            config,
        }
    }

    /// One pass: recover expired leases, then claim and deliver every due
    /// row, batch by batch.
    pub async fn deliver_due(&self) -> Result<DeliveryReport, ServiceError> {
        let mut report = DeliveryReport::default();

        let now = now_unix();
        let reset = self.store.reset_stale(now)?;
        if reset > 0 {
            info!("outbox: reset {reset} stale deliveries");
        }

        loop {
            let now = now_unix();
            let batch = self.store.claim_due(
                now,
                now + self.config.stale_after_secs,
                self.config.batch_size.max(1),
            )?;
            if batch.is_empty() {
                break;
            }
            debug!(count = batch.len(), "outbox batch claimed");

            for n in &batch {
                match self.deliver(n).await {
                    Ok(()) => {
                        self.store.mark_delivered(&n.id)?;
                        report.delivered += 1;
                    }
                    Err(reason) => {
                        let attempts = n.attempts + 1;
                        let give_up = attempts >= self.config.max_attempts;
                        let retry_at = now_unix() + self.config.backoff_secs(attempts);
                        match self.store.record_failure(n, &reason, retry_at, give_up)? {
                            DeliveryStatus::Failed => {
                                error!(
                                    service = %n.service, ml_id = n.ml_id, attempts,
                                    "outbox: giving up on {}: {reason}", n.action.as_str()
                                );
                                report.failed += 1;
                            }
                            _ => {
                                warn!(
                                    service = %n.service, ml_id = n.ml_id, attempts,
                                    "outbox: {} failed, retry at {retry_at}: {reason}",
                                    n.action.as_str()
                                );
                                report.retrying += 1;
                            }
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    async fn deliver(&self, n: &Notification) -> Result<(), String> {
        let service = self
            .services
            .get(&n.service)
            .ok_or_else(|| format!("no item service named {:?}", n.service))?;

        match n.action {
            NotifyAction::Register => {
                let image = match &n.image_key {
                    Some(key) => Some(self.load_image(key)?),
                    None => None,
                };
                let item = ItemRegistration {
                    ml_id: n.ml_id,
                    category: n.category.clone().unwrap_or_default(),
                    image,
                };
                service.register(&item).await.map_err(|e| e.to_string())
            }
            NotifyAction::Remove => service.remove(n.ml_id).await.map_err(|e| e.to_string()),
        }
    }

    fn load_image(&self, key: &str) -> Result<ItemImage, String> {
        let bytes = self
            .assets
            .read_key(key)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("image {} not found", key))?;
        let file_name = key.rsplit('/').next().unwrap_or(key).to_string();
        Ok(ItemImage {
            content_type: content_type_for(&file_name).map(str::to_string),
            bytes,
            file_name,
        })
    }
}

/// Start the background delivery loop.
///
/// Runs a pass whenever `wake` is notified and at least every
/// `poll_interval`. Returns a CancellationToken that stops the loop.
pub fn start(worker: Arc<OutboxWorker>, wake: Arc<Notify>) -> CancellationToken {
    let cancel = CancellationToken::new();
    let interval = worker.config.poll_interval;

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            info!("outbox worker started (interval={interval:?})");
            loop {
                match worker.deliver_due().await {
                    Ok(r) if r == DeliveryReport::default() => {}
                    Ok(r) => info!(
                        "outbox: delivered {}, retrying {}, failed {}",
                        r.delivered, r.retrying, r.failed
                    ),
                    Err(e) => error!("outbox worker error: {e}"),
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("outbox worker stopped");
                        break;
                    }
                    _ = wake.notified() => {}
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
    }

    cancel
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use storeadmin_blob::FileStore;
    use storeadmin_gateway::Gateway;
    use storeadmin_matching::{ItemService, MatchingError};
    use storeadmin_sql::SqliteStore;

    use super::*;
    use crate::model::NotificationQuery;
    use crate::outbox::store::{enqueue, ItemRef};
    use crate::service::schema::init_schema;

    /// Records calls; fails the first `fail_times` of them.
    struct FakeService {
        name: String,
        calls: Mutex<Vec<(NotifyAction, i64, Option<usize>)>>,
        fail_times: Mutex<u32>,
    }

    impl FakeService {
        fn new(name: &str, fail_times: u32) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                calls: Mutex::new(Vec::new()),
                fail_times: Mutex::new(fail_times),
            })
        }

        fn outcome(&self) -> Result<(), MatchingError> {
            let mut left = self.fail_times.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(MatchingError::Request("unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ItemService for FakeService {
        fn name(&self) -> &str {
            &self.name
        }

        async fn register(&self, item: &ItemRegistration) -> Result<(), MatchingError> {
            let image_len = item.image.as_ref().map(|i| i.bytes.len());
            self.calls
                .lock()
                .unwrap()
                .push((NotifyAction::Register, item.ml_id, image_len));
            self.outcome()
        }

        async fn remove(&self, ml_id: i64) -> Result<(), MatchingError> {
            self.calls.lock().unwrap().push((NotifyAction::Remove, ml_id, None));
            self.outcome()
        }
    }

    struct Harness {
        worker: OutboxWorker,
        store: OutboxStore,
        gateway: Gateway,
        assets: Arc<AssetStorage>,
        _dir: tempfile::TempDir,
    }

    fn harness(fakes: &[Arc<FakeService>], config: OutboxConfig) -> Harness {
        let gateway = Gateway::new(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap();
        init_schema(&gateway).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let assets = Arc::new(AssetStorage::new(
            Arc::new(FileStore::open(dir.path()).unwrap()),
            "http://localhost/assets",
        ));
        let mut services = ItemServices::new();
        for f in fakes {
            services.insert(f.clone());
        }
        let store = OutboxStore::new(gateway.clone());
        Harness {
            worker: OutboxWorker::new(store.clone(), services, Arc::clone(&assets), config),
            store,
            gateway,
            assets,
            _dir: dir,
        }
    }

    fn queue(h: &Harness, names: &[&str], action: NotifyAction, ml_id: i64, image_key: Option<&str>) {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        h.gateway
            .transaction(|tx| {
                enqueue(
                    tx,
                    &names,
                    action,
                    ItemRef {
                        ml_id,
                        category: Some("Dresses"),
                        image_key,
                    },
                    now_unix(),
                )
            })
            .unwrap();
    }

    fn statuses(h: &Harness) -> HashMap<String, DeliveryStatus> {
        h.store
            .list(&NotificationQuery::default())
            .unwrap()
            .rows
            .into_iter()
            .map(|n| (n.service, n.status))
            .collect()
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = OutboxConfig {
            backoff_base_secs: 5,
            backoff_max_secs: 60,
            ..Default::default()
        };
        assert_eq!(cfg.backoff_secs(1), 5);
        assert_eq!(cfg.backoff_secs(2), 10);
        assert_eq!(cfg.backoff_secs(4), 40);
        assert_eq!(cfg.backoff_secs(5), 60);
        assert_eq!(cfg.backoff_secs(200), 60);
    }

    #[tokio::test]
    async fn delivers_register_with_image_to_every_service() {
        let a = FakeService::new("similarity", 0);
        let b = FakeService::new("outfit", 0);
        let h = harness(&[a.clone(), b.clone()], OutboxConfig::default());
        h.assets.upload("product-images", "product_1_x.png", b"pngdata").unwrap();
        queue(&h, &["similarity", "outfit"], NotifyAction::Register, 9, Some("product-images/product_1_x.png"));

        let report = h.worker.deliver_due().await.unwrap();
        assert_eq!(report.delivered, 2);

        for fake in [&a, &b] {
            assert_eq!(*fake.calls.lock().unwrap(), vec![(NotifyAction::Register, 9, Some(7))]);
        }
        assert!(statuses(&h).values().all(|s| *s == DeliveryStatus::Delivered));
    }

    #[tokio::test]
    async fn one_failing_service_does_not_block_the_others() {
        let ok = FakeService::new("similarity", 0);
        let down = FakeService::new("outfit", 100);
        let h = harness(&[ok.clone(), down.clone()], OutboxConfig::default());
        queue(&h, &["similarity", "outfit"], NotifyAction::Remove, 4, None);

        let report = h.worker.deliver_due().await.unwrap();
        assert_eq!(report, DeliveryReport { delivered: 1, retrying: 1, failed: 0 });

        let s = statuses(&h);
        assert_eq!(s["similarity"], DeliveryStatus::Delivered);
        assert_eq!(s["outfit"], DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn failed_row_is_retried_after_backoff() {
        let flaky = FakeService::new("similarity", 1);
        let cfg = OutboxConfig {
            backoff_base_secs: 0,
            ..Default::default()
        };
        let h = harness(&[flaky.clone()], cfg);
        queue(&h, &["similarity"], NotifyAction::Remove, 4, None);

        let first = h.worker.deliver_due().await.unwrap();
        // Zero backoff: the retry is due within the same pass.
        assert_eq!(first.retrying, 1);
        assert_eq!(first.delivered, 1);
        assert_eq!(flaky.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let down = FakeService::new("similarity", 100);
        let cfg = OutboxConfig {
            max_attempts: 3,
            backoff_base_secs: 0,
            ..Default::default()
        };
        let h = harness(&[down.clone()], cfg);
        queue(&h, &["similarity"], NotifyAction::Remove, 4, None);

        let report = h.worker.deliver_due().await.unwrap();
        assert_eq!(report, DeliveryReport { delivered: 0, retrying: 2, failed: 1 });
        assert_eq!(down.calls.lock().unwrap().len(), 3);

        let n = h.store.list(&NotificationQuery::default()).unwrap().rows.remove(0);
        assert_eq!(n.status, DeliveryStatus::Failed);
        assert_eq!(n.attempts, 3);
        assert!(n.last_error.unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn unknown_service_and_missing_image_are_failures() {
        let h = harness(&[FakeService::new("similarity", 0)], OutboxConfig::default());
        queue(&h, &["retired"], NotifyAction::Remove, 1, None);
        queue(&h, &["similarity"], NotifyAction::Register, 2, Some("product-images/gone.png"));

        let report = h.worker.deliver_due().await.unwrap();
        assert_eq!(report.retrying, 2);
        let page = h.store.list(&NotificationQuery::default()).unwrap();
        let errors: Vec<String> = page.rows.into_iter().filter_map(|n| n.last_error).collect();
        assert!(errors.iter().any(|e| e.contains("retired")));
        assert!(errors.iter().any(|e| e.contains("not found")));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_on_wake_and_stops_on_cancel() {
        let fake = FakeService::new("similarity", 0);
        let cfg = OutboxConfig {
            poll_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let h = harness(&[fake.clone()], cfg);
        let Harness { worker, gateway, store, _dir, .. } = h;
        let wake = Arc::new(Notify::new());
        let cancel = start(Arc::new(worker), Arc::clone(&wake));

        // Let the initial pass run on the empty queue.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let names = vec!["similarity".to_string()];
        gateway
            .transaction(|tx| {
                enqueue(
                    tx,
                    &names,
                    NotifyAction::Remove,
                    ItemRef { ml_id: 5, category: None, image_key: None },
                    now_unix(),
                )
            })
            .unwrap();
        wake.notify_one();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*fake.calls.lock().unwrap(), vec![(NotifyAction::Remove, 5, None)]);
        let page = store.list(&NotificationQuery::default()).unwrap();
        assert_eq!(page.rows[0].status, DeliveryStatus::Delivered);

        cancel.cancel();
    }
}
