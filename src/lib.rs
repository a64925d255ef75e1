//! # MSSQL Config Advisor
//!
//! Configuration health checks for a fleet of Microsoft SQL Server instances.
//!
//! For every server in a list the advisor gathers host and engine facts,
//! evaluates them against a fixed set of best-practice rules and produces two
//! reports:
//! - **Recommendations**: one CSV row per setting that should change
//! - **Detailed analysis**: the facts gathered from each server, including
//!   its database file inventory
//!
//! ## Architecture
//!
//! - [`database`] collects facts through the [`FactSource`] trait
//! - [`engine`] turns facts into [`Recommendation`]s (pure, no I/O)
//! - [`report`] accumulates both reports
//! - [`runner`] drives the server loop and isolates per-server failures

pub mod config;
pub mod constants;
pub mod database;
pub mod engine;
pub mod error;
pub mod facts;
pub mod report;
pub mod runner;
pub mod server_list;

pub use config::Config;
pub use database::{FactSession, FactSource, MssqlFactSource};
pub use engine::{evaluate, recommended_max_dop, Recommendation, Setting};
pub use error::AdvisorError;
pub use facts::{DatabaseFile, ServerFacts};
pub use report::ReportBuilder;
pub use runner::{RunSummary, Runner};
