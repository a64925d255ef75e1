//! Server-list runner.
//!
//! Drives one pass over the server list: connect, collect, evaluate, append.
//! A failing server is logged and recorded as a `Connection Error` row; it
//! never aborts the batch.

use crate::database::{FactSession, FactSource};
use crate::engine::{evaluate, Recommendation};
use crate::error::AdvisorError;
use crate::facts::ServerSnapshot;
use crate::report::ReportBuilder;
use crate::server_list::ServerTarget;
use futures_util::stream::{self, StreamExt};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Per-server progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Pending,
    Connected,
    Analyzed,
    Done,
    Failed,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Connected => "connected",
            Self::Analyzed => "analyzed",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of analyzing one server, before it is merged into the report.
#[derive(Debug)]
pub struct ServerOutcome {
    pub server_name: String,
    pub state: ServerState,
    pub result: Result<AnalyzedServer, AdvisorError>,
    pub elapsed: Duration,
}

/// Facts and recommendations of a server that was analyzed successfully.
#[derive(Debug)]
pub struct AnalyzedServer {
    pub snapshot: ServerSnapshot,
    pub recommendations: Vec<Recommendation>,
}

/// Totals for a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: String,
    pub servers: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub recommendations: usize,
}

/// Runs the analysis over a server list.
pub struct Runner<S> {
    source: S,
    concurrency: usize,
    server_timeout: Duration,
}

impl<S: FactSource> Runner<S> {
    /// Create a runner. A concurrency of 0 is treated as 1.
    pub fn new(source: S, concurrency: usize, server_timeout: Duration) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            server_timeout,
        }
    }

    /// Analyze every target and return the filled report with a summary.
    ///
    /// Report order always follows `targets` order, whatever the concurrency.
    pub async fn run(&self, targets: &[ServerTarget]) -> (ReportBuilder, RunSummary) {
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        let span = info_span!("run", run_id = %run_id);

        async move {
            info!(
                "Analyzing {} server(s) with concurrency {}",
                targets.len(),
                self.concurrency
            );

            let mut report = ReportBuilder::new();
            let mut summary = RunSummary {
                run_id: run_id.clone(),
                servers: targets.len(),
                analyzed: 0,
                failed: 0,
                recommendations: 0,
            };

            let mut outcomes = stream::iter(targets.iter().map(|target| self.analyze(target)))
                .buffered(self.concurrency);

            while let Some(mut outcome) = outcomes.next().await {
                match &outcome.result {
                    Ok(analyzed) => {
                        report.append_recommendations(&analyzed.recommendations);
                        report.append_server_detail(
                            &analyzed.snapshot.facts,
                            &analyzed.snapshot.files,
                        );
                        outcome.state = ServerState::Done;
                        summary.analyzed += 1;
                    }
                    Err(e) => {
                        report.append_recommendations(&[Recommendation::connection_error(
                            &outcome.server_name,
                            e,
                        )]);
                        summary.failed += 1;
                    }
                }
                debug!(
                    "{}: {} in {} ms",
                    outcome.server_name,
                    outcome.state,
                    outcome.elapsed.as_millis()
                );
            }

            summary.recommendations = report.recommendation_count();
            info!(
                "Run complete: {} analyzed, {} failed, {} recommendation(s)",
                summary.analyzed, summary.failed, summary.recommendations
            );
            (report, summary)
        }
        .instrument(span)
        .await
    }

    /// Analyze a single server, converting any failure into the outcome.
    pub async fn analyze(&self, target: &ServerTarget) -> ServerOutcome {
        let start = Instant::now();
        info!("Analyzing server {}", target.name);

        let mut state = ServerState::Pending;
        let collection = self.collect(target, &mut state);
        let result = match tokio::time::timeout(self.server_timeout, collection).await {
            Ok(result) => result,
            Err(_) => Err(AdvisorError::timeout(self.server_timeout)),
        };

        if let Err(e) = &result {
            let hint = e
                .suggestion()
                .map(|hint| format!(" ({})", hint))
                .unwrap_or_default();
            error!("Failed to analyze server {}: {}{}", target.name, e, hint);
            state = ServerState::Failed;
        }

        ServerOutcome {
            server_name: target.name.clone(),
            state,
            result,
            elapsed: start.elapsed(),
        }
    }

    async fn collect(
        &self,
        target: &ServerTarget,
        state: &mut ServerState,
    ) -> Result<AnalyzedServer, AdvisorError> {
        let session = self.source.connect(target).await?;
        *state = ServerState::Connected;

        let facts = session.server_facts(&target.name).await?;
        let files = session.database_files().await?;
        let recommendations = evaluate(&facts, &files);
        *state = ServerState::Analyzed;

        debug!(
            "{}: {} recommendation(s) from {} database file(s)",
            target.name,
            recommendations.len(),
            files.len()
        );

        Ok(AnalyzedServer {
            snapshot: ServerSnapshot { facts, files },
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Setting;
    use crate::facts::{DatabaseFile, FileType, MaxSize, MemoryModel, ServerFacts};
    use std::collections::HashMap;

    /// How a fixture server behaves.
    #[derive(Clone)]
    enum Fixture {
        Healthy { facts: ServerFacts, delay: Duration },
        Unreachable,
        QueryFails,
        Hangs,
    }

    struct FixtureSource {
        servers: HashMap<String, Fixture>,
    }

    struct FixtureSession {
        fixture: Fixture,
    }

    impl FactSource for FixtureSource {
        type Session = FixtureSession;

        async fn connect(&self, target: &ServerTarget) -> Result<FixtureSession, AdvisorError> {
            match self.servers.get(&target.name) {
                None | Some(Fixture::Unreachable) => Err(AdvisorError::connection(format!(
                    "Failed to establish connection to {}",
                    target.name
                ))),
                Some(fixture) => Ok(FixtureSession {
                    fixture: fixture.clone(),
                }),
            }
        }
    }

    impl FactSession for FixtureSession {
        async fn server_facts(&self, server_name: &str) -> Result<ServerFacts, AdvisorError> {
            match &self.fixture {
                Fixture::Healthy { facts, delay } => {
                    tokio::time::sleep(*delay).await;
                    Ok(ServerFacts {
                        server_name: server_name.to_string(),
                        ..facts.clone()
                    })
                }
                Fixture::QueryFails => Err(AdvisorError::collection_with_code(
                    "VIEW SERVER STATE permission was denied",
                    300,
                )),
                Fixture::Hangs => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(AdvisorError::internal("unreachable"))
                }
                Fixture::Unreachable => Err(AdvisorError::internal("not connected")),
            }
        }

        async fn database_files(&self) -> Result<Vec<DatabaseFile>, AdvisorError> {
            Ok(vec![DatabaseFile {
                database_name: "Sales".to_string(),
                logical_file_name: "Sales_log".to_string(),
                file_type: Some(FileType::Log),
                current_size_mb: Some(512.0),
                is_percent_growth: Some(true),
                growth_value: Some(10.0),
                max_size: Some(MaxSize::Unlimited),
            }])
        }
    }

    fn facts_needing_maxdop() -> ServerFacts {
        ServerFacts {
            cpu_count: Some(16),
            numa_node_count: Some(1),
            memory_model: Some(MemoryModel::LockPages),
            current_max_dop: Some(0),
            ..ServerFacts::default()
        }
    }

    fn healthy(delay_ms: u64) -> Fixture {
        Fixture::Healthy {
            facts: facts_needing_maxdop(),
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn targets(names: &[&str]) -> Vec<ServerTarget> {
        names
            .iter()
            .map(|n| ServerTarget::parse(n).expect("valid target"))
            .collect()
    }

    fn runner(servers: Vec<(&str, Fixture)>, concurrency: usize) -> Runner<FixtureSource> {
        let source = FixtureSource {
            servers: servers
                .into_iter()
                .map(|(name, fixture)| (name.to_string(), fixture))
                .collect(),
        };
        Runner::new(source, concurrency, Duration::from_secs(5))
    }

    fn csv_lines(report: &ReportBuilder) -> Vec<String> {
        report.render().0.lines().skip(1).map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_failed_server_does_not_abort_batch() {
        let runner = runner(
            vec![
                ("db01", healthy(0)),
                ("db02", Fixture::Unreachable),
                ("db03", healthy(0)),
            ],
            1,
        );

        let (report, summary) = runner.run(&targets(&["db01", "db02", "db03"])).await;

        assert_eq!(summary.servers, 3);
        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(report.server_count(), 2);

        let lines = csv_lines(&report);
        let errors: Vec<&String> = lines
            .iter()
            .filter(|l| l.contains(",Connection Error,"))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("db02,Connection Error,,,"));
        assert!(errors[0].contains("Failed to establish connection to db02"));

        let (_, detail) = report.render();
        assert!(detail.contains("Server: db01"));
        assert!(!detail.contains("Server: db02"));
        assert!(detail.contains("Server: db03"));
    }

    #[tokio::test]
    async fn test_rows_follow_server_then_rule_order() {
        let runner = runner(vec![("db01", healthy(0)), ("db02", healthy(0))], 1);
        let (report, summary) = runner.run(&targets(&["db01", "db02"])).await;

        let lines = csv_lines(&report);
        let keys: Vec<String> = lines
            .iter()
            .map(|l| l.split(',').take(2).collect::<Vec<_>>().join(","))
            .collect();
        assert_eq!(
            keys,
            vec![
                "db01,MAXDOP",
                "db01,File Growth",
                "db02,MAXDOP",
                "db02,File Growth"
            ]
        );
        assert!(lines[0].starts_with("db01,MAXDOP,0,8,"));
        assert_eq!(summary.recommendations, 4);
    }

    #[tokio::test]
    async fn test_concurrent_run_preserves_input_order() {
        // The first server is the slowest; its rows must still come first.
        let runner = runner(
            vec![
                ("db01", healthy(60)),
                ("db02", healthy(0)),
                ("db03", Fixture::Unreachable),
                ("db04", healthy(10)),
            ],
            4,
        );

        let (report, summary) = runner.run(&targets(&["db01", "db02", "db03", "db04"])).await;
        assert_eq!(summary.analyzed, 3);

        let servers: Vec<String> = csv_lines(&report)
            .iter()
            .map(|l| l.split(',').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            servers,
            vec!["db01", "db01", "db02", "db02", "db03", "db04", "db04"]
        );
    }

    #[tokio::test]
    async fn test_collection_error_is_recorded() {
        let runner = runner(vec![("db01", Fixture::QueryFails)], 1);
        let outcome = runner.analyze(&targets(&["db01"])[0]).await;

        assert_eq!(outcome.state, ServerState::Failed);
        let err = outcome.result.expect_err("should fail");
        assert!(matches!(
            err,
            AdvisorError::Collection {
                sql_error_code: Some(300),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_hanging_server_times_out() {
        let source = FixtureSource {
            servers: [("db01".to_string(), Fixture::Hangs)].into_iter().collect(),
        };
        let runner = Runner::new(source, 1, Duration::from_millis(50));

        let (report, summary) = runner.run(&targets(&["db01"])).await;
        assert_eq!(summary.failed, 1);
        let lines = csv_lines(&report);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Timeout: operation exceeded 50 ms"));
    }

    #[tokio::test]
    async fn test_successful_analysis_reaches_analyzed_state() {
        let runner = runner(vec![("db01", healthy(0))], 1);
        let outcome = runner.analyze(&targets(&["db01"])[0]).await;

        assert_eq!(outcome.state, ServerState::Analyzed);
        let analyzed = outcome.result.expect("analyzed");
        assert_eq!(analyzed.snapshot.facts.server_name, "db01");
        assert_eq!(analyzed.recommendations[0].setting, Setting::MaxDop);
        assert_eq!(analyzed.recommendations[0].recommended_value, "8");
    }

    #[tokio::test]
    async fn test_empty_server_list() {
        let runner = runner(vec![], 1);
        let (report, summary) = runner.run(&[]).await;
        assert_eq!(summary.servers, 0);
        assert_eq!(report.recommendation_count(), 0);
    }
}
