//! Run ledger: one row per batch execution.
//!
//! Lifecycle is `pending -> running -> {completed, failed}`. A run is pending
//! until `start` writes its row; both end states are terminal. Stage flags
//! only ever move from false to true, in collect/parse/clean/signal order,
//! and each flag is written in the same transaction as its counters.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use thiserror::Error;
use tracing::{info, warn};

use super::diesel_models::{
    NewRun, NewRunStatistic, NewSourceStatistic, RunRecord, RunStatisticRecord,
    SourceStatisticRecord,
};
use super::diesel_pool::{
    begin_immediate, end_transaction, AsyncSqliteConnection, AsyncSqlitePool, DieselError,
};
use super::util::{day_to_text, is_unique_violation};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{
    Run, RunOutcome, RunStatistic, RunStatus, SourceStatistic, Stage, StageCounters, StageFlags,
    StatValue,
};
use crate::schema::{pipeline_runs, run_statistics, source_statistics};

/// Lifecycle errors. None of them leave the ledger modified.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("run '{0}' already exists")]
    DuplicateRun(String),

    #[error("run '{0}' does not exist or has already finished")]
    UnknownRun(String),

    #[error("cannot complete stage '{stage}' of run '{run_id}': {reason}")]
    InvalidTransition {
        run_id: String,
        stage: &'static str,
        reason: String,
    },

    #[error("run '{run_id}' already finished as '{status}'")]
    AlreadyFinished { run_id: String, status: &'static str },

    #[error("statistic '{key}' already recorded for run '{run_id}'")]
    DuplicateStatistic { run_id: String, key: String },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl From<RunRecord> for Run {
    fn from(record: RunRecord) -> Self {
        let started_at = parse_datetime(&record.started_at);
        Run {
            run_date: NaiveDate::parse_from_str(&record.run_date, "%Y-%m-%d")
                .unwrap_or_else(|_| started_at.date_naive()),
            run_id: record.run_id,
            started_at,
            completed_at: parse_datetime_opt(record.completed_at),
            status: RunStatus::from_str(&record.status).unwrap_or(RunStatus::Running),
            stages: StageFlags {
                collect: record.collect_completed != 0,
                parse: record.parse_completed != 0,
                clean: record.clean_completed != 0,
                signal: record.signal_completed != 0,
            },
            counters: StageCounters {
                sources: record.total_sources,
                fetched: record.total_fetched,
                parsed: record.total_parsed,
                cleaned: record.total_cleaned,
                analyzed: record.total_analyzed,
            },
            errors: record.errors,
        }
    }
}

impl From<RunStatisticRecord> for RunStatistic {
    fn from(record: RunStatisticRecord) -> Self {
        let value = match (record.metric_value, record.details) {
            (Some(n), _) => StatValue::Number(n),
            (None, Some(details)) => StatValue::Details(
                serde_json::from_str(&details).unwrap_or(serde_json::Value::String(details)),
            ),
            (None, None) => StatValue::Details(serde_json::Value::Null),
        };
        RunStatistic {
            run_id: record.run_id,
            stage: Stage::from_str(&record.stage).unwrap_or(Stage::Collect),
            metric_name: record.metric_name,
            value,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

impl From<SourceStatisticRecord> for SourceStatistic {
    fn from(record: SourceStatisticRecord) -> Self {
        SourceStatistic {
            source_name: record.source_name,
            articles_fetched: record.articles_fetched,
            succeeded: record.succeeded != 0,
            error: record.error,
        }
    }
}

/// Load a run that is still accepting writes.
async fn load_running(conn: &mut AsyncSqliteConnection, run_id: &str) -> Result<Run, LedgerError> {
    let record = pipeline_runs::table
        .find(run_id)
        .select(RunRecord::as_select())
        .first::<RunRecord>(conn)
        .await
        .optional()?;

    match record.map(Run::from) {
        Some(run) if !run.status.is_terminal() => Ok(run),
        _ => Err(LedgerError::UnknownRun(run_id.to_string())),
    }
}

async fn ensure_exists(conn: &mut AsyncSqliteConnection, run_id: &str) -> Result<(), LedgerError> {
    use diesel::dsl::count_star;
    let count: i64 = pipeline_runs::table
        .filter(pipeline_runs::run_id.eq(run_id))
        .select(count_star())
        .first(conn)
        .await?;
    if count == 0 {
        return Err(LedgerError::UnknownRun(run_id.to_string()));
    }
    Ok(())
}

async fn complete_stage(
    conn: &mut AsyncSqliteConnection,
    run_id: &str,
    stage: Stage,
    counters: StageCounters,
) -> Result<Run, LedgerError> {
    let mut run = load_running(conn, run_id).await?;

    if let Some(prev) = stage.predecessor() {
        if !run.stages.is_complete(prev) {
            return Err(LedgerError::InvalidTransition {
                run_id: run_id.to_string(),
                stage: stage.as_str(),
                reason: format!("stage '{}' is not complete", prev.as_str()),
            });
        }
    }
    if run.stages.is_complete(stage) {
        return Err(LedgerError::InvalidTransition {
            run_id: run_id.to_string(),
            stage: stage.as_str(),
            reason: "stage is already complete".to_string(),
        });
    }

    match stage {
        Stage::Collect => run.stages.collect = true,
        Stage::Parse => run.stages.parse = true,
        Stage::Clean => run.stages.clean = true,
        Stage::Signal => run.stages.signal = true,
    }
    run.counters = run.counters.merged_with(&counters);

    diesel::update(pipeline_runs::table.find(run_id))
        .set((
            pipeline_runs::collect_completed.eq(i32::from(run.stages.collect)),
            pipeline_runs::parse_completed.eq(i32::from(run.stages.parse)),
            pipeline_runs::clean_completed.eq(i32::from(run.stages.clean)),
            pipeline_runs::signal_completed.eq(i32::from(run.stages.signal)),
            pipeline_runs::total_sources.eq(run.counters.sources),
            pipeline_runs::total_fetched.eq(run.counters.fetched),
            pipeline_runs::total_parsed.eq(run.counters.parsed),
            pipeline_runs::total_cleaned.eq(run.counters.cleaned),
            pipeline_runs::total_analyzed.eq(run.counters.analyzed),
        ))
        .execute(conn)
        .await?;

    Ok(run)
}

async fn append_error(
    conn: &mut AsyncSqliteConnection,
    run_id: &str,
    entry: String,
) -> Result<Run, LedgerError> {
    let mut run = load_running(conn, run_id).await?;
    let errors = match run.errors.take() {
        Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, entry),
        _ => entry,
    };

    diesel::update(pipeline_runs::table.find(run_id))
        .set(pipeline_runs::errors.eq(Some(&errors)))
        .execute(conn)
        .await?;

    run.errors = Some(errors);
    Ok(run)
}

/// Returns the run and whether this call changed it.
async fn close_run(
    conn: &mut AsyncSqliteConnection,
    run_id: &str,
    target: RunStatus,
) -> Result<(Run, bool), LedgerError> {
    let record = pipeline_runs::table
        .find(run_id)
        .select(RunRecord::as_select())
        .first::<RunRecord>(conn)
        .await
        .optional()?;
    let Some(mut run) = record.map(Run::from) else {
        return Err(LedgerError::UnknownRun(run_id.to_string()));
    };

    if run.status == target {
        return Ok((run, false));
    }
    if run.status.is_terminal() {
        return Err(LedgerError::AlreadyFinished {
            run_id: run_id.to_string(),
            status: run.status.as_str(),
        });
    }

    let completed_at = Utc::now().to_rfc3339();
    diesel::update(pipeline_runs::table.find(run_id))
        .set((
            pipeline_runs::status.eq(target.as_str()),
            pipeline_runs::completed_at.eq(Some(&completed_at)),
        ))
        .execute(conn)
        .await?;

    run.status = target;
    run.completed_at = Some(parse_datetime(&completed_at));
    Ok((run, true))
}

async fn insert_statistics(
    conn: &mut AsyncSqliteConnection,
    run_id: &str,
    stage: Stage,
    metrics: &[(String, StatValue)],
    created_at: &str,
) -> Result<(), LedgerError> {
    ensure_exists(conn, run_id).await?;

    for (name, value) in metrics {
        let (metric_value, details) = match value {
            StatValue::Number(n) => (Some(*n), None),
            StatValue::Details(v) => (None, Some(v.to_string())),
        };
        diesel::insert_into(run_statistics::table)
            .values(&NewRunStatistic {
                run_id,
                stage: stage.as_str(),
                metric_name: name,
                metric_value,
                details: details.as_deref(),
                created_at,
            })
            .execute(conn)
            .await
            .map_err(|e| duplicate_or(e, run_id, name))?;
    }
    Ok(())
}

async fn insert_source_statistics(
    conn: &mut AsyncSqliteConnection,
    run_id: &str,
    sources: &[SourceStatistic],
    created_at: &str,
) -> Result<(), LedgerError> {
    ensure_exists(conn, run_id).await?;

    for source in sources {
        diesel::insert_into(source_statistics::table)
            .values(&NewSourceStatistic {
                run_id,
                source_name: &source.source_name,
                articles_fetched: source.articles_fetched,
                succeeded: i32::from(source.succeeded),
                error: source.error.as_deref(),
                created_at,
            })
            .execute(conn)
            .await
            .map_err(|e| duplicate_or(e, run_id, &source.source_name))?;
    }
    Ok(())
}

/// Every transition runs in its own immediate transaction, so runs with
/// different ids never block each other for longer than one write.
#[derive(Clone)]
pub struct RunLedger {
    pool: AsyncSqlitePool,
}

impl RunLedger {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Create the run in `running` state with no stages complete and no counters.
    pub async fn start(&self, run_id: &str, run_date: NaiveDate) -> Result<Run, LedgerError> {
        let mut conn = self.pool.get().await?;
        let started_at = Utc::now();
        let started_text = started_at.to_rfc3339();
        let date_text = day_to_text(run_date);

        diesel::insert_into(pipeline_runs::table)
            .values(&NewRun {
                run_id,
                run_date: &date_text,
                started_at: &started_text,
                status: RunStatus::Running.as_str(),
                collect_completed: 0,
                parse_completed: 0,
                clean_completed: 0,
                signal_completed: 0,
            })
            .execute(&mut conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    LedgerError::DuplicateRun(run_id.to_string())
                } else {
                    LedgerError::Database(e)
                }
            })?;

        info!("Run {} started for {}", run_id, date_text);
        Ok(Run {
            run_id: run_id.to_string(),
            run_date,
            started_at: parse_datetime(&started_text),
            completed_at: None,
            status: RunStatus::Running,
            stages: StageFlags::default(),
            counters: StageCounters::default(),
            errors: None,
        })
    }

    /// Flag `stage` complete and record the counters it reports.
    ///
    /// Counters left `None` keep whatever an earlier stage recorded.
    pub async fn mark_stage_complete(
        &self,
        run_id: &str,
        stage: Stage,
        counters: StageCounters,
    ) -> Result<Run, LedgerError> {
        let mut conn = self.pool.get().await?;

        begin_immediate(&mut conn).await?;
        let result = complete_stage(&mut conn, run_id, stage, counters).await;
        let run = end_transaction(&mut conn, result).await?;

        info!("Run {}: stage '{}' complete", run_id, stage.as_str());
        Ok(run)
    }

    /// Append a non-fatal error to the run without changing its status.
    pub async fn record_error(&self, run_id: &str, message: &str) -> Result<Run, LedgerError> {
        // One entry per line.
        let entry = message.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut conn = self.pool.get().await?;

        begin_immediate(&mut conn).await?;
        let result = append_error(&mut conn, run_id, entry).await;
        let run = end_transaction(&mut conn, result).await?;

        warn!("Run {} recorded error: {}", run_id, message);
        Ok(run)
    }

    /// Move the run to its terminal state and stamp the completion time.
    ///
    /// Repeating the same outcome returns the stored run unchanged.
    pub async fn finish(&self, run_id: &str, outcome: RunOutcome) -> Result<Run, LedgerError> {
        let target = RunStatus::from(outcome);
        let mut conn = self.pool.get().await?;

        begin_immediate(&mut conn).await?;
        let result = close_run(&mut conn, run_id, target).await;
        let (run, changed) = end_transaction(&mut conn, result).await?;

        if changed {
            info!("Run {} finished: {}", run_id, target.as_str());
        }
        Ok(run)
    }

    pub async fn get(&self, run_id: &str) -> Result<Option<Run>, DieselError> {
        let mut conn = self.pool.get().await?;

        pipeline_runs::table
            .find(run_id)
            .select(RunRecord::as_select())
            .first::<RunRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Run::from))
    }

    /// Current state; `Pending` when the run has not been started.
    pub async fn status(&self, run_id: &str) -> Result<RunStatus, DieselError> {
        Ok(self
            .get(run_id)
            .await?
            .map_or(RunStatus::Pending, |run| run.status))
    }

    /// Most recently started runs first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Run>, DieselError> {
        let mut conn = self.pool.get().await?;

        pipeline_runs::table
            .order((pipeline_runs::started_at.desc(), pipeline_runs::run_id.desc()))
            .limit(limit)
            .select(RunRecord::as_select())
            .load::<RunRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Run::from).collect())
    }

    /// Append per-run metrics. A key already written for the run fails the
    /// whole call and nothing from it is stored.
    pub async fn record_statistics(
        &self,
        run_id: &str,
        stage: Stage,
        metrics: &[(String, StatValue)],
    ) -> Result<(), LedgerError> {
        let created_at = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;

        begin_immediate(&mut conn).await?;
        let result = insert_statistics(&mut conn, run_id, stage, metrics, &created_at).await;
        end_transaction(&mut conn, result).await
    }

    /// Append per-source fetch outcomes, with the same write-once rule as
    /// [`RunLedger::record_statistics`].
    pub async fn record_source_statistics(
        &self,
        run_id: &str,
        sources: &[SourceStatistic],
    ) -> Result<(), LedgerError> {
        let created_at = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;

        begin_immediate(&mut conn).await?;
        let result = insert_source_statistics(&mut conn, run_id, sources, &created_at).await;
        end_transaction(&mut conn, result).await
    }

    pub async fn statistics(&self, run_id: &str) -> Result<Vec<RunStatistic>, DieselError> {
        let mut conn = self.pool.get().await?;

        run_statistics::table
            .filter(run_statistics::run_id.eq(run_id))
            .order(run_statistics::id.asc())
            .select(RunStatisticRecord::as_select())
            .load::<RunStatisticRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(RunStatistic::from).collect())
    }

    pub async fn source_statistics(&self, run_id: &str) -> Result<Vec<SourceStatistic>, DieselError> {
        let mut conn = self.pool.get().await?;

        source_statistics::table
            .filter(source_statistics::run_id.eq(run_id))
            .order(source_statistics::source_name.asc())
            .select(SourceStatisticRecord::as_select())
            .load::<SourceStatisticRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(SourceStatistic::from).collect())
    }
}

fn duplicate_or(e: DieselError, run_id: &str, key: &str) -> LedgerError {
    if is_unique_violation(&e) {
        LedgerError::DuplicateStatistic {
            run_id: run_id.to_string(),
            key: key.to_string(),
        }
    } else {
        LedgerError::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SentimentLabel;
    use crate::repository::test_support::{day, record, setup_test_db};

    fn fetched(n: i64) -> StageCounters {
        StageCounters {
            fetched: Some(n),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_creates_running_run() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();

        assert_eq!(ledger.status("R1").await.unwrap(), RunStatus::Pending);
        let run = ledger.start("R1", day("2024-01-03")).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.stages, StageFlags::default());
        assert!(run.counters.is_empty());

        let stored = ledger.get("R1").await.unwrap().unwrap();
        assert_eq!(stored.run_date, day("2024-01-03"));
        assert!(stored.completed_at.is_none());
        assert_eq!(ledger.status("R1").await.unwrap(), RunStatus::Running);
    }

    #[tokio::test]
    async fn test_duplicate_start_fails() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();

        ledger.start("R1", day("2024-01-03")).await.unwrap();
        let err = ledger.start("R1", day("2024-01-04")).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateRun(_)));

        let stored = ledger.get("R1").await.unwrap().unwrap();
        assert_eq!(stored.run_date, day("2024-01-03"));
    }

    #[tokio::test]
    async fn test_out_of_order_stage_rejected() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        ledger.start("R1", day("2024-01-03")).await.unwrap();

        let run = ledger
            .mark_stage_complete("R1", Stage::Collect, fetched(30))
            .await
            .unwrap();
        assert!(run.stages.collect);
        assert_eq!(run.counters.fetched, Some(30));

        let err = ledger
            .mark_stage_complete("R1", Stage::Clean, StageCounters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        let stored = ledger.get("R1").await.unwrap().unwrap();
        assert!(!stored.stages.clean);
        assert!(stored.stages.is_monotonic());
    }

    #[tokio::test]
    async fn test_stages_in_order_accumulate_counters() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        ledger.start("R1", day("2024-01-03")).await.unwrap();

        ledger
            .mark_stage_complete(
                "R1",
                Stage::Collect,
                StageCounters {
                    sources: Some(30),
                    fetched: Some(28),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        ledger
            .mark_stage_complete(
                "R1",
                Stage::Parse,
                StageCounters {
                    parsed: Some(27),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = ledger
            .mark_stage_complete("R1", Stage::Parse, StageCounters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        let stored = ledger.get("R1").await.unwrap().unwrap();
        assert!(stored.stages.collect && stored.stages.parse);
        assert_eq!(stored.counters.sources, Some(30));
        assert_eq!(stored.counters.fetched, Some(28));
        assert_eq!(stored.counters.parsed, Some(27));
        assert_eq!(stored.counters.cleaned, None);
    }

    #[tokio::test]
    async fn test_unknown_and_terminal_runs_reject_stage_writes() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();

        let err = ledger
            .mark_stage_complete("nope", Stage::Collect, fetched(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownRun(_)));

        ledger.start("R1", day("2024-01-03")).await.unwrap();
        ledger.finish("R1", RunOutcome::Failed).await.unwrap();
        let err = ledger
            .mark_stage_complete("R1", Stage::Collect, fetched(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownRun(_)));
    }

    #[tokio::test]
    async fn test_partial_failure_still_completes() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        ledger.start("R1", day("2024-01-03")).await.unwrap();

        ledger.record_error("R1", "source detik timed out").await.unwrap();
        ledger
            .record_error("R1", "source antara:\nHTTP 503")
            .await
            .unwrap();
        ledger
            .mark_stage_complete("R1", Stage::Collect, fetched(28))
            .await
            .unwrap();
        let run = ledger.finish("R1", RunOutcome::Completed).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.completed_at.is_some());
        assert_eq!(
            run.error_entries(),
            vec!["source detik timed out", "source antara: HTTP 503"]
        );

        let err = ledger.record_error("R1", "late").await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownRun(_)));
    }

    #[tokio::test]
    async fn test_finish_idempotent_and_conflicting() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        ledger.start("R1", day("2024-01-03")).await.unwrap();

        let first = ledger.finish("R1", RunOutcome::Completed).await.unwrap();
        let second = ledger.finish("R1", RunOutcome::Completed).await.unwrap();
        assert_eq!(first.completed_at, second.completed_at);

        let err = ledger.finish("R1", RunOutcome::Failed).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyFinished { .. }));
        assert_eq!(ledger.status("R1").await.unwrap(), RunStatus::Completed);

        let err = ledger.finish("R2", RunOutcome::Completed).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownRun(_)));
    }

    #[tokio::test]
    async fn test_statistics_are_write_once() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        ledger.start("R1", day("2024-01-03")).await.unwrap();

        ledger
            .record_statistics(
                "R1",
                Stage::Signal,
                &[
                    ("articles_analyzed".to_string(), StatValue::Number(27.0)),
                    (
                        "sentiment_distribution".to_string(),
                        StatValue::Details(serde_json::json!({"positive": 10, "negative": 5})),
                    ),
                ],
            )
            .await
            .unwrap();

        let err = ledger
            .record_statistics(
                "R1",
                Stage::Signal,
                &[
                    ("entities_found".to_string(), StatValue::Number(3.0)),
                    ("articles_analyzed".to_string(), StatValue::Number(30.0)),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateStatistic { .. }));

        let stats = ledger.statistics("R1").await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].value, StatValue::Number(27.0));
        assert!(matches!(stats[1].value, StatValue::Details(_)));

        ledger
            .record_source_statistics(
                "R1",
                &[
                    SourceStatistic {
                        source_name: "kompas".to_string(),
                        articles_fetched: 12,
                        succeeded: true,
                        error: None,
                    },
                    SourceStatistic {
                        source_name: "detik".to_string(),
                        articles_fetched: 0,
                        succeeded: false,
                        error: Some("timeout".to_string()),
                    },
                ],
            )
            .await
            .unwrap();
        let err = ledger
            .record_source_statistics(
                "R1",
                &[SourceStatistic {
                    source_name: "kompas".to_string(),
                    articles_fetched: 13,
                    succeeded: true,
                    error: None,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateStatistic { .. }));

        let sources = ledger.source_statistics("R1").await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].source_name, "kompas");
        assert_eq!(sources[1].articles_fetched, 12);

        let err = ledger
            .record_statistics("R9", Stage::Collect, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownRun(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_independent_runs_progress_concurrently() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        let ids: Vec<String> = (0..16).map(|i| format!("R{:02}", i)).collect();
        for id in &ids {
            ledger.start(id, day("2024-01-03")).await.unwrap();
        }

        let articles = ctx.articles();
        let ingest = tokio::spawn(async move {
            let records: Vec<_> = (0..20)
                .map(|i| record(&format!("fp-{}", i), Some("2024-01-03"), SentimentLabel::Neutral))
                .collect();
            articles.ingest(&records).await
        });

        let mut handles = Vec::new();
        for id in ids.clone() {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.record_error(&id, "source detik timed out").await?;
                for stage in Stage::ALL {
                    ledger.mark_stage_complete(&id, stage, fetched(1)).await?;
                }
                ledger.finish(&id, RunOutcome::Completed).await?;
                Ok::<_, LedgerError>(())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(ingest.await.unwrap().unwrap().inserted, 20);

        for id in &ids {
            let run = ledger.get(id).await.unwrap().unwrap();
            assert_eq!(run.status, RunStatus::Completed);
            assert!(run.stages.signal);
            assert_eq!(run.error_entries().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let (ctx, _dir) = setup_test_db().await;
        let ledger = ctx.runs();
        for id in ["R1", "R2", "R3"] {
            ledger.start(id, day("2024-01-03")).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let runs = ledger.list_recent(2).await.unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, ["R3", "R2"]);
    }
}
