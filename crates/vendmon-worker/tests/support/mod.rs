//! Shared fixtures for the worker integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;
use vendmon_db::Database;
use vendmon_vendor::{PartSearch, Result as VendorResult, Vendor, VendorError, VendorPart};
use vendmon_worker::{
    consume, ConsumeStats, Connector, InboundMessage, LoopError, MessageSource, Pipeline,
};

pub const IDLE: Duration = Duration::from_millis(1);
pub const VPINFO: &str = "maintenance_vendor_vpinfo";
pub const VPMAP: &str = "maintenance_vendor_vpmap";

/// Fresh in-memory database with the schema applied.
pub async fn test_database() -> Database {
    let db = Database::new(":memory:").await.expect("create test database");
    db.run_migrations().await.expect("run migrations");
    db
}

/// Row count of a table.
pub async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count rows")
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

/// How a stubbed part fetch fails.
#[derive(Debug, Clone, Copy)]
pub enum FetchFailure {
    Permanent,
    Other,
    Hang,
}

/// Vendor with scripted search results and fetch failures.
pub struct StubVendor {
    name: String,
    canonical_name: String,
    searches: HashMap<String, PartSearch>,
    failures: HashMap<String, FetchFailure>,
    hang_searches: bool,
    fetches: Mutex<Vec<(String, String, u32)>>,
    search_calls: Mutex<Vec<String>>,
}

impl StubVendor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            canonical_name: name.to_string(),
            searches: HashMap::new(),
            failures: HashMap::new(),
            hang_searches: false,
            fetches: Mutex::new(Vec::new()),
            search_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_canonical_name(mut self, canonical_name: &str) -> Self {
        self.canonical_name = canonical_name.to_string();
        self
    }

    pub fn with_search(mut self, ident: &str, search: PartSearch) -> Self {
        self.searches.insert(ident.to_string(), search);
        self
    }

    pub fn with_fetch_failure(mut self, vpno: &str, failure: FetchFailure) -> Self {
        self.failures.insert(vpno.to_string(), failure);
        self
    }

    pub fn with_hanging_search(mut self) -> Self {
        self.hang_searches = true;
        self
    }

    /// `(vpno, ident, refresh_depth)` of every fetch call.
    pub fn fetches(&self) -> Vec<(String, String, u32)> {
        self.fetches.lock().expect("lock fetches").clone()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().expect("lock searches").clone()
    }
}

#[async_trait]
impl Vendor for StubVendor {
    fn name(&self) -> &str {
        &self.name
    }

    fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    async fn fetch_part_info(
        &self,
        vpno: &str,
        ident: &str,
        refresh_depth: u32,
    ) -> VendorResult<VendorPart> {
        self.fetches.lock().expect("lock fetches").push((
            vpno.to_string(),
            ident.to_string(),
            refresh_depth,
        ));

        match self.failures.get(vpno) {
            Some(FetchFailure::Permanent) => Err(VendorError::PermanentRetrieval {
                vendor: self.name.clone(),
                vpno: vpno.to_string(),
                reason: "part withdrawn".to_string(),
            }),
            Some(FetchFailure::Other) => Err(VendorError::Other {
                vendor: self.name.clone(),
                message: "upstream returned 503".to_string(),
            }),
            Some(FetchFailure::Hang) => std::future::pending().await,
            None => Ok(VendorPart {
                vpno: vpno.to_string(),
                ident: ident.to_string(),
                description: format!("{ident} from {}", self.name),
                unit_price: Some(0.12),
                stock: Some(100),
                fetched_at: Utc::now(),
            }),
        }
    }

    async fn search_part_numbers(&self, ident: &str) -> VendorResult<PartSearch> {
        self.search_calls
            .lock()
            .expect("lock searches")
            .push(ident.to_string());

        if self.hang_searches {
            std::future::pending::<()>().await;
        }

        Ok(self.searches.get(ident).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Stored {
    delivery_tag: u64,
    redelivered: bool,
    body: Vec<u8>,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Stored>,
    unacked: Vec<Stored>,
    acked: Vec<u64>,
    subscriptions: u32,
    failing_subscribes: u32,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, QueueState>,
    next_tag: u64,
}

/// In-process stand-in for a broker with manual acknowledgement.
///
/// Closing a subscription returns its unacknowledged deliveries to the front
/// of the queue, flagged as redelivered.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<T>(&self, queue: &str, f: impl FnOnce(&mut QueueState) -> T) -> T {
        let mut state = self.state.lock().expect("lock broker");
        f(state.queues.entry(queue.to_string()).or_default())
    }

    /// Enqueue a message and return its delivery tag.
    pub fn publish(&self, queue: &str, body: impl Into<Vec<u8>>) -> u64 {
        let mut state = self.state.lock().expect("lock broker");
        state.next_tag += 1;
        let delivery_tag = state.next_tag;
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .ready
            .push_back(Stored {
                delivery_tag,
                redelivered: false,
                body: body.into(),
            });
        delivery_tag
    }

    pub fn acked(&self, queue: &str) -> Vec<u64> {
        self.with_queue(queue, |q| q.acked.clone())
    }

    /// Messages waiting for delivery.
    pub fn ready(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.ready.len())
    }

    /// Messages delivered but not acknowledged.
    pub fn unacked(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.unacked.len())
    }

    pub fn subscriptions(&self, queue: &str) -> u32 {
        self.with_queue(queue, |q| q.subscriptions)
    }

    /// Make the next `count` subscribe attempts on `queue` fail.
    pub fn fail_subscribes(&self, queue: &str, count: u32) {
        self.with_queue(queue, |q| q.failing_subscribes = count);
    }

    pub fn is_drained(&self, queue: &str) -> bool {
        self.with_queue(queue, |q| q.ready.is_empty() && q.unacked.is_empty())
    }

    /// Wait until `queue` has acknowledged `count` messages.
    pub async fn wait_for_acks(&self, queue: &str, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.acked(queue).len() < count {
                tokio::time::sleep(IDLE).await;
            }
        })
        .await
        .expect("acknowledgements arrive in time");
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    type Source = MemorySubscription;

    async fn subscribe(&self, queue: &str) -> vendmon_worker::Result<MemorySubscription> {
        self.with_queue(queue, |q| {
            if q.failing_subscribes > 0 {
                q.failing_subscribes -= 1;
                return Err(LoopError::Connection("connection refused".to_string()));
            }
            q.subscriptions += 1;
            Ok(())
        })?;

        Ok(MemorySubscription {
            broker: self.clone(),
            queue: queue.to_string(),
        })
    }
}

/// Subscription handed out by [`MemoryBroker`].
pub struct MemorySubscription {
    broker: MemoryBroker,
    queue: String,
}

#[async_trait]
impl MessageSource for MemorySubscription {
    async fn pull(&mut self, idle: Duration) -> vendmon_worker::Result<Option<InboundMessage>> {
        let next = self.broker.with_queue(&self.queue, |q| {
            let stored = q.ready.pop_front()?;
            q.unacked.push(stored.clone());
            Some(InboundMessage {
                delivery_tag: stored.delivery_tag,
                redelivered: stored.redelivered,
                body: stored.body,
            })
        });

        if next.is_none() {
            tokio::time::sleep(idle).await;
        }
        Ok(next)
    }

    async fn ack(&mut self, delivery_tag: u64) -> vendmon_worker::Result<()> {
        self.broker.with_queue(&self.queue, |q| {
            let position = q
                .unacked
                .iter()
                .position(|stored| stored.delivery_tag == delivery_tag)
                .ok_or_else(|| LoopError::Ack {
                    delivery_tag,
                    reason: "unknown delivery tag".to_string(),
                })?;
            q.unacked.remove(position);
            q.acked.push(delivery_tag);
            Ok(())
        })
    }

    async fn close(&mut self) -> vendmon_worker::Result<()> {
        self.broker.with_queue(&self.queue, |q| {
            for mut stored in q.unacked.drain(..).rev() {
                stored.redelivered = true;
                q.ready.push_front(stored);
            }
        });
        Ok(())
    }
}

/// Consume `queue` with `pipeline` until the queue is drained or a message fails.
///
/// The subscription is closed afterwards, so a failed message is back on the
/// queue when this returns.
pub async fn consume_until_drained<P: Pipeline>(
    broker: &MemoryBroker,
    queue: &str,
    pipeline: &P,
) -> (Result<(), LoopError>, ConsumeStats) {
    let mut source = broker.subscribe(queue).await.expect("subscribe");
    let shutdown = CancellationToken::new();
    let mut stats = ConsumeStats::default();

    let (result, ()) = tokio::join!(
        async {
            let result = consume(queue, &mut source, pipeline, IDLE, &shutdown, &mut stats).await;
            shutdown.cancel();
            result
        },
        async {
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = async {
                    while !broker.is_drained(queue) {
                        tokio::time::sleep(IDLE).await;
                    }
                } => shutdown.cancel(),
            }
        }
    );

    source.close().await.expect("close subscription");
    (result, stats)
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().expect("lock log buffer")).into_owned()
    }

    /// Lines at `level` (e.g. `"WARN"`).
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().nth(1) == Some(level))
            .map(ToString::to_string)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("lock log buffer")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
