//! Run ledger commands: the orchestrator interface and the run monitor.

use chrono::{NaiveDate, Utc};
use console::style;

use crate::config::Settings;
use crate::models::{Run, RunOutcome, RunStatus, Stage, StageCounters, StatValue};
use crate::repository::RunLedger;

use super::helpers::{format_duration, truncate};

async fn open_ledger(settings: &Settings) -> anyhow::Result<RunLedger> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    Ok(ctx.runs())
}

fn styled_status(status: RunStatus) -> console::StyledObject<&'static str> {
    match status {
        RunStatus::Completed => style(status.as_str()).green(),
        RunStatus::Failed => style(status.as_str()).red(),
        RunStatus::Running => style(status.as_str()).yellow(),
        RunStatus::Pending => style(status.as_str()).dim(),
    }
}

fn stage_marks(run: &Run) -> String {
    Stage::ALL
        .iter()
        .map(|&stage| {
            if run.stages.is_complete(stage) {
                stage.as_str()[..1].to_uppercase()
            } else {
                "-".to_string()
            }
        })
        .collect()
}

pub async fn cmd_run_start(
    settings: &Settings,
    run_id: &str,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let run_date = date.unwrap_or_else(|| Utc::now().date_naive());
    let run = ledger.start(run_id, run_date).await?;

    println!(
        "{} Started run {} ({})",
        style("✓").green(),
        style(&run.run_id).bold(),
        run.run_date
    );
    Ok(())
}

pub async fn cmd_run_stage(
    settings: &Settings,
    run_id: &str,
    stage: Stage,
    counters: StageCounters,
) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    ledger.mark_stage_complete(run_id, stage, counters).await?;

    let metrics: Vec<(String, StatValue)> = [
        ("sources", counters.sources),
        ("fetched", counters.fetched),
        ("parsed", counters.parsed),
        ("cleaned", counters.cleaned),
        ("analyzed", counters.analyzed),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value.map(|v| (format!("{}_{}", stage.as_str(), name), StatValue::Number(v as f64)))
    })
    .collect();
    if !metrics.is_empty() {
        ledger.record_statistics(run_id, stage, &metrics).await?;
    }

    println!(
        "{} Stage {} complete for run {}",
        style("✓").green(),
        style(stage.as_str()).cyan(),
        run_id
    );
    Ok(())
}

pub async fn cmd_run_error(settings: &Settings, run_id: &str, message: &str) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let run = ledger.record_error(run_id, message).await?;

    println!(
        "{} Recorded error on run {} ({} total)",
        style("!").yellow(),
        run_id,
        run.error_entries().len()
    );
    Ok(())
}

pub async fn cmd_run_finish(
    settings: &Settings,
    run_id: &str,
    outcome: RunOutcome,
) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let run = ledger.finish(run_id, outcome).await?;

    let duration = run
        .duration()
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} Run {} finished as {} in {}",
        style("✓").green(),
        style(&run.run_id).bold(),
        styled_status(run.status),
        duration
    );
    Ok(())
}

pub async fn cmd_run_show(settings: &Settings, run_id: &str) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let Some(run) = ledger.get(run_id).await? else {
        println!(
            "{} Run '{}' not found (status: {})",
            style("✗").red(),
            run_id,
            RunStatus::Pending.as_str()
        );
        return Ok(());
    };

    println!("\n{} {}", style("Run").bold(), style(&run.run_id).bold());
    println!("{}", "-".repeat(50));
    println!("  {:<12} {}", "Date:", run.run_date);
    println!("  {:<12} {}", "Status:", styled_status(run.status));
    println!("  {:<12} {}", "Started:", run.started_at.to_rfc3339());
    if let Some(done) = run.completed_at {
        println!("  {:<12} {}", "Completed:", done.to_rfc3339());
    }
    if let Some(d) = run.duration() {
        println!("  {:<12} {}", "Duration:", format_duration(d));
    }

    println!("\n{}", style("Stages:").cyan());
    for stage in Stage::ALL {
        let mark = if run.stages.is_complete(stage) {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!("  {} {}", mark, stage.as_str());
    }

    let c = run.counters;
    let counters = [
        ("sources", c.sources),
        ("fetched", c.fetched),
        ("parsed", c.parsed),
        ("cleaned", c.cleaned),
        ("analyzed", c.analyzed),
    ];
    if !c.is_empty() {
        println!("\n{}", style("Counters:").cyan());
        for (name, value) in counters {
            if let Some(v) = value {
                println!("  {:<12} {}", name, v);
            }
        }
    }

    let statistics = ledger.statistics(run_id).await?;
    if !statistics.is_empty() {
        println!("\n{}", style("Statistics:").cyan());
        for stat in statistics {
            let value = match stat.value {
                StatValue::Number(n) => n.to_string(),
                StatValue::Details(v) => v.to_string(),
            };
            println!("  {:<8} {:<28} {}", stat.stage.as_str(), stat.metric_name, value);
        }
    }

    let sources = ledger.source_statistics(run_id).await?;
    if !sources.is_empty() {
        println!("\n{}", style("Sources:").cyan());
        for src in sources {
            let mark = if src.succeeded {
                style("✓").green()
            } else {
                style("✗").red()
            };
            print!("  {} {:<24} {:>6}", mark, src.source_name, src.articles_fetched);
            match src.error {
                Some(err) => println!("  {}", style(truncate(&err, 60)).dim()),
                None => println!(),
            }
        }
    }

    let errors = run.error_entries();
    if !errors.is_empty() {
        println!("\n{}", style("Errors:").red());
        for err in errors {
            println!("  {}", err);
        }
    }

    Ok(())
}

/// Recent runs, newest first.
pub async fn cmd_runs(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let runs = ledger.list_recent(limit.max(1)).await?;

    if runs.is_empty() {
        println!("{} No runs recorded yet", style("!").yellow());
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<20} {:<11} {:<10} {:<7} {:>9}  {}",
            "RUN", "DATE", "STATUS", "STAGES", "DURATION", "ERRORS"
        ))
        .bold()
    );
    for run in &runs {
        let duration = run
            .duration()
            .map(format_duration)
            .unwrap_or_else(|| "-".to_string());
        let errors = run.error_entries();
        let error_text = match errors.last() {
            Some(last) if errors.len() > 1 => {
                format!("({}) {}", errors.len(), truncate(last, 40))
            }
            Some(last) => truncate(last, 44),
            None => String::new(),
        };

        println!(
            "{:<20} {:<11} {:<10} {:<7} {:>9}  {}",
            truncate(&run.run_id, 20),
            run.run_date.to_string(),
            styled_status(run.status),
            stage_marks(run),
            duration,
            style(error_text).dim()
        );
    }

    Ok(())
}
