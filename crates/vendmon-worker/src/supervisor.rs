//! Queue Subscription Supervisor: one independent consume loop per queue.

use crate::consumer::{consume, ConsumeStats, LoopState};
use crate::error::Result;
use crate::pipeline::{InfoRefreshPipeline, MappingPipeline, Pipeline};
use crate::queue::{Connector, MessageSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vendmon_core::{AppConfig, QueueKind};
use vendmon_db::Database;
use vendmon_vendor::VendorRegistry;

/// Final account of one consume loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    /// Queue the loop consumed
    pub queue: QueueKind,
    /// State the loop ended in
    pub state: LoopState,
    /// Counters summed over every subscription
    pub stats: ConsumeStats,
    /// How many times the loop re-subscribed after a failure
    pub restarts: u32,
    /// Most recent failure, if any
    pub last_error: Option<String>,
}

impl LoopReport {
    fn new(queue: QueueKind) -> Self {
        Self {
            queue,
            state: LoopState::Connecting,
            stats: ConsumeStats::default(),
            restarts: 0,
            last_error: None,
        }
    }
}

/// Starts and isolates the info-refresh and mapping loops.
///
/// The loops share only the vendor registry and the database pool. A loop
/// that fails closes its subscription so the broker takes the unacknowledged
/// message back, then re-subscribes after the restart delay.
pub struct Supervisor {
    registry: VendorRegistry,
    database: Database,
    vpinfo_queue: String,
    vpmap_queue: String,
    idle: Duration,
    call_timeout: Option<Duration>,
    restart_delay: Option<Duration>,
}

impl Supervisor {
    /// Create a supervisor from the worker configuration.
    #[must_use]
    pub fn new(config: &AppConfig, registry: VendorRegistry, database: Database) -> Self {
        Self {
            registry,
            database,
            vpinfo_queue: config.queue_name(QueueKind::VpInfo).to_string(),
            vpmap_queue: config.queue_name(QueueKind::VpMap).to_string(),
            idle: config.queues.idle_poll_interval(),
            call_timeout: config.vendors.call_timeout(),
            restart_delay: config.supervisor.restart_delay(),
        }
    }

    /// Override the delay before a failed loop re-subscribes. `None` leaves it stopped.
    #[must_use]
    pub fn with_restart_delay(mut self, restart_delay: Option<Duration>) -> Self {
        self.restart_delay = restart_delay;
        self
    }

    /// Override the vendor call bound used by both pipelines.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Subscribe to both queues and start their loops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<C>(self, connector: C) -> SupervisorHandle
    where
        C: Connector + 'static,
    {
        info!(
            vpinfo = %self.vpinfo_queue,
            vpmap = %self.vpmap_queue,
            "Starting vendor maintenance queue monitors"
        );

        let connector = Arc::new(connector);
        let shutdown = CancellationToken::new();

        let vpinfo = InfoRefreshPipeline::new(self.registry.clone())
            .with_call_timeout(self.call_timeout);
        let vpmap = MappingPipeline::new(self.registry, self.database)
            .with_call_timeout(self.call_timeout);

        let tasks = vec![
            (
                QueueKind::VpInfo,
                tokio::spawn(supervise(
                    self.vpinfo_queue,
                    Arc::clone(&connector),
                    vpinfo,
                    self.idle,
                    self.restart_delay,
                    shutdown.clone(),
                )),
            ),
            (
                QueueKind::VpMap,
                tokio::spawn(supervise(
                    self.vpmap_queue,
                    connector,
                    vpmap,
                    self.idle,
                    self.restart_delay,
                    shutdown.clone(),
                )),
            ),
        ];

        SupervisorHandle { shutdown, tasks }
    }
}

/// Handle to the running loops.
pub struct SupervisorHandle {
    shutdown: CancellationToken,
    tasks: Vec<(QueueKind, JoinHandle<LoopReport>)>,
}

impl SupervisorHandle {
    /// Ask every loop to stop after its current pull.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for every loop to end and collect their reports.
    pub async fn join(self) -> Vec<LoopReport> {
        let mut reports = Vec::with_capacity(self.tasks.len());

        for (queue, task) in self.tasks {
            match task.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(%queue, "consume loop task aborted: {e}");
                    reports.push(LoopReport {
                        state: LoopState::Failed,
                        last_error: Some(e.to_string()),
                        ..LoopReport::new(queue)
                    });
                }
            }
        }

        reports
    }

    /// Shut down and wait for the reports.
    pub async fn stop(self) -> Vec<LoopReport> {
        self.shutdown();
        self.join().await
    }
}

/// Drive one queue until shutdown, re-subscribing after failures.
async fn supervise<C, P>(
    queue: String,
    connector: Arc<C>,
    pipeline: P,
    idle: Duration,
    restart_delay: Option<Duration>,
    shutdown: CancellationToken,
) -> LoopReport
where
    C: Connector,
    P: Pipeline,
{
    let mut report = LoopReport::new(pipeline.kind());

    loop {
        transition(&queue, &mut report, LoopState::Connecting);

        match run_subscription(&queue, connector.as_ref(), &pipeline, idle, &shutdown, &mut report)
            .await
        {
            Ok(()) => {
                transition(&queue, &mut report, LoopState::Stopped);
                return report;
            }
            Err(err) => {
                error!(%queue, error = %err, "consume loop failed");
                report.last_error = Some(err.to_string());
                transition(&queue, &mut report, LoopState::Failed);
            }
        }

        let Some(delay) = restart_delay else {
            return report;
        };

        tokio::select! {
            () = shutdown.cancelled() => return report,
            () = tokio::time::sleep(delay) => {}
        }

        report.restarts += 1;
        info!(%queue, restarts = report.restarts, "restarting consume loop");
    }
}

async fn run_subscription<C, P>(
    queue: &str,
    connector: &C,
    pipeline: &P,
    idle: Duration,
    shutdown: &CancellationToken,
    report: &mut LoopReport,
) -> Result<()>
where
    C: Connector,
    P: Pipeline,
{
    let mut source = tokio::select! {
        () = shutdown.cancelled() => return Ok(()),
        subscribed = connector.subscribe(queue) => subscribed?,
    };
    transition(queue, report, LoopState::Subscribed);

    let consumed = consume(queue, &mut source, pipeline, idle, shutdown, &mut report.stats).await;

    if let Err(err) = source.close().await {
        warn!(queue, error = %err, "failed to close subscription");
    }

    consumed
}

fn transition(queue: &str, report: &mut LoopReport, state: LoopState) {
    info!(queue, from = %report.state, to = %state, "loop state");
    report.state = state;
}
