//! Vendmon Worker - Queue-driven vendor maintenance.
//!
//! Consumes two durable queues and keeps vendor data current:
//!
//! - `maintenance_vendor_vpinfo`: refresh one vendor part (`{ident, vendor, vpno}`)
//! - `maintenance_vendor_vpmap`: map an identity to vendor part numbers (`{ident, vendor}`)
//!
//! Each queue runs its own loop that pulls one message, processes it and
//! only then acknowledges it. A message whose processing fails is never
//! acknowledged; the broker redelivers it.
//!
//! # Architecture
//!
//! - **Queue seams** ([`queue`]): `MessageSource` / `Connector` traits
//! - **AMQP** ([`amqp`]): `lapin`-backed subscriptions
//! - **Pipelines** ([`pipeline`]): info refresh and mapping
//! - **Consume loop** ([`consumer`]): pull, process, acknowledge
//! - **Supervisor** ([`supervisor`]): one isolated task per queue
//!
//! # Example
//!
//! ```rust,no_run
//! use vendmon_core::AppConfig;
//! use vendmon_db::Database;
//! use vendmon_vendor::{CatalogLoader, VendorRegistry};
//! use vendmon_worker::{AmqpConnector, Supervisor};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::load_with_env()?;
//! let registry = VendorRegistry::load_from(&CatalogLoader::new(&config.vendors.catalog_dir)?)?;
//! let database = Database::connect(&config.database).await?;
//! database.run_migrations().await?;
//!
//! let handle = Supervisor::new(&config, registry, database).start(AmqpConnector::new(&config.broker));
//! tokio::signal::ctrl_c().await?;
//! let reports = handle.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod amqp;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod supervisor;

// Re-export commonly used types
pub use amqp::{AmqpConnector, AmqpSubscription};
pub use consumer::{consume, ConsumeStats, LoopState};
pub use error::{LoopError, PipelineError, Result};
pub use pipeline::{InfoRefreshPipeline, MappingPipeline, Outcome, Pipeline};
pub use queue::{Connector, InboundMessage, MessageSource};
pub use supervisor::{LoopReport, Supervisor, SupervisorHandle};
