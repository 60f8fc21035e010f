//! Core library for the sensor analysis service.
//!
//! Clients upload batches of timestamped environmental readings (temperature,
//! humidity, dew point) and poll a job id while a background worker classifies
//! every reading against configured thresholds, screens the batch for
//! statistical anomalies, and rolls the outcome up into a dashboard summary.
//!
//! Module layout:
//! - [`models`] – wire types: readings, verdicts, notifications, summary
//! - [`thresholds`] – threshold bands and the per-variable evaluator
//! - [`stats`] / [`anomaly`] – batch statistics and the anomaly detector
//! - [`analyzer`] – per-reading verdict assembly
//! - [`summary`] – dashboard aggregation
//! - [`jobs`] – job state machine and the in-memory store
//! - [`pipeline`] – work queue, background consumer, batch driver
//! - [`notify`] – outbound notification sinks
//! - [`routes`] – HTTP surface (EMBP gateway plus per-endpoint subrouters)
//! - [`config`] – environment-driven configuration

pub mod analyzer;
pub mod anomaly;
pub mod config;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod routes;
pub mod stats;
pub mod summary;
pub mod thresholds;

pub use config::Config;
