//! Recommendation engine: best-practice rules over collected facts.

mod maxdop;
mod recommendation;
mod rules;

pub use maxdop::recommended_max_dop;
pub use recommendation::{Recommendation, Setting};
pub use rules::{evaluate, recommended_max_server_memory_gb, recommended_tempdb_files};
