//! rsyslog-exporter - Prometheus exporter for rsyslog impstats
//!
//! This library receives rsyslog impstats JSON records over syslog, classifies
//! each record by shape, normalizes its counters into a labeled metric table
//! and exposes that table in Prometheus text format.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod stats;
pub mod syslog;
pub mod telemetry;
