//! Behaviour under a racing writer, and across independently opened stores.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use localconn::{ChannelConfig, Consistency, LocalConnection, Scope};
use localconn_store::{FileSlotStore, MemorySlotStore, SlotStore};

// ---------------------------------------------------------------------------
// A store where another context writes right after our next read
// ---------------------------------------------------------------------------

struct RacingStore {
    inner: Arc<MemorySlotStore>,
    // Entry appended behind the reader's back after the next `get`.
    pending: Mutex<Option<String>>,
}

impl RacingStore {
    fn new(inner: Arc<MemorySlotStore>) -> Self {
        Self {
            inner,
            pending: Mutex::new(None),
        }
    }

    fn race_next_read(&self, entry: String) {
        *self.pending.lock().unwrap() = Some(entry);
    }
}

#[async_trait]
impl SlotStore for RacingStore {
    async fn get(&self, key: &str) -> localconn_store::Result<String> {
        let value = self.inner.get(key).await?;
        let pending = self.pending.lock().unwrap().take();
        if let Some(entry) = pending {
            let raced = if value.is_empty() {
                entry
            } else {
                format!("{value}&{entry}")
            };
            self.inner.set(key, &raced).await?;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> localconn_store::Result<()> {
        self.inner.set(key, value).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> localconn_store::Result<bool> {
        self.inner.compare_and_set(key, expected, value).await
    }

    fn supports_compare_and_set(&self) -> bool {
        true
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(log: &Log) -> impl Fn(&Scope, &[String]) -> anyhow::Result<()> + Send + Sync + 'static {
    let log = log.clone();
    move |_: &Scope, args: &[String]| -> anyhow::Result<()> {
        log.lock().unwrap().push(args.join("|"));
        Ok(())
    }
}

async fn racing_receiver(
    consistency: Consistency,
) -> (
    Arc<MemorySlotStore>,
    LocalConnection<Arc<RacingStore>>,
    LocalConnection<Arc<MemorySlotStore>>,
    Log,
) {
    let shared = Arc::new(MemorySlotStore::new());
    let config = ChannelConfig::default()
        .with_auto_listen(false)
        .with_consistency(consistency);

    let receiver = LocalConnection::connect(
        Arc::new(RacingStore::new(shared.clone())),
        config.clone(),
    )
    .await
    .unwrap();
    let sender = LocalConnection::connect(shared.clone(), config).await.unwrap();

    let log: Log = Arc::default();
    receiver.add_callback("msg", recorder(&log));
    (shared, receiver, sender, log)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn weak_cycle_can_lose_a_racing_send() {
    let (shared, receiver, sender, log) = racing_receiver(Consistency::Weak).await;

    sender.send("msg", &["first"]).await;
    receiver
        .store()
        .race_next_read(format!("{}:msg:raced", sender.origin()));
    receiver.consume_once().await.unwrap();

    // The raced token was overwritten by the rewrite.
    assert_eq!(*log.lock().unwrap(), vec!["first"]);
    assert_eq!(shared.value("localconnection"), "");
}

#[tokio::test]
async fn strict_cycle_keeps_a_racing_send() {
    let (shared, receiver, sender, log) = racing_receiver(Consistency::Strict).await;

    sender.send("msg", &["first"]).await;
    receiver
        .store()
        .race_next_read(format!("{}:msg:raced", sender.origin()));
    let report = receiver.consume_once().await.unwrap();

    assert!(report.rewritten);
    assert_eq!(*log.lock().unwrap(), vec!["first", "raced"]);
    assert_eq!(shared.value("localconnection"), "");
}

#[tokio::test]
async fn strict_channels_exchange_in_both_directions() {
    let store = Arc::new(MemorySlotStore::new());
    let config = ChannelConfig::default()
        .with_auto_listen(false)
        .with_consistency(Consistency::Strict);
    let a = LocalConnection::connect(store.clone(), config.clone()).await.unwrap();
    let b = LocalConnection::connect(store.clone(), config).await.unwrap();
    let (log_a, log_b): (Log, Log) = (Arc::default(), Arc::default());
    a.add_callback("msg", recorder(&log_a));
    b.add_callback("msg", recorder(&log_b));

    assert!(a.send("msg", &["from-a"]).await);
    assert!(b.send("msg", &["from-b"]).await);
    a.consume_once().await.unwrap();
    b.consume_once().await.unwrap();

    assert_eq!(*log_a.lock().unwrap(), vec!["from-b"]);
    assert_eq!(*log_b.lock().unwrap(), vec!["from-a"]);
    assert_eq!(store.value("localconnection"), "");
}

#[tokio::test]
async fn file_store_carries_events_between_separately_opened_handles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("localconn");
    let config = ChannelConfig::default()
        .with_name("editor")
        .with_auto_listen(false);

    let a = LocalConnection::connect(FileSlotStore::new(&path), config.clone())
        .await
        .unwrap();
    let b = LocalConnection::connect(FileSlotStore::new(&path), config)
        .await
        .unwrap();
    let log: Log = Arc::default();
    b.add_callback("msg", recorder(&log));

    assert!(a.send("msg", &["saved", "doc.txt"]).await);
    let report = b.consume_once().await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(*log.lock().unwrap(), vec!["saved|doc.txt"]);
    assert_eq!(FileSlotStore::new(&path).get("editor").await.unwrap(), "");
}
