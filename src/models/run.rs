//! Pipeline run ledger models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No ledger row exists yet for the run id.
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Terminal outcome requested by `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed,
}

impl From<RunOutcome> for RunStatus {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => RunStatus::Completed,
            RunOutcome::Failed => RunStatus::Failed,
        }
    }
}

/// Pipeline stage. Declaration order is completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collect,
    Parse,
    Clean,
    Signal,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Self::Collect, Self::Parse, Self::Clean, Self::Signal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Parse => "parse",
            Self::Clean => "clean",
            Self::Signal => "signal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "collect" => Some(Self::Collect),
            "parse" => Some(Self::Parse),
            "clean" => Some(Self::Clean),
            "signal" => Some(Self::Signal),
            _ => None,
        }
    }

    /// The stage that must be complete before this one.
    pub fn predecessor(&self) -> Option<Stage> {
        match self {
            Self::Collect => None,
            Self::Parse => Some(Self::Collect),
            Self::Clean => Some(Self::Parse),
            Self::Signal => Some(Self::Clean),
        }
    }
}

/// Per-stage completion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    pub collect: bool,
    pub parse: bool,
    pub clean: bool,
    pub signal: bool,
}

impl StageFlags {
    pub fn is_complete(&self, stage: Stage) -> bool {
        match stage {
            Stage::Collect => self.collect,
            Stage::Parse => self.parse,
            Stage::Clean => self.clean,
            Stage::Signal => self.signal,
        }
    }

    /// True when no stage is flagged complete ahead of an incomplete predecessor.
    pub fn is_monotonic(&self) -> bool {
        Stage::ALL.iter().all(|stage| {
            !self.is_complete(*stage)
                || stage
                    .predecessor()
                    .map_or(true, |prev| self.is_complete(prev))
        })
    }
}

/// Stage counters. `None` means the stage has not reported the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed: Option<i64>,
}

impl StageCounters {
    /// Overlay the values reported in `other`, keeping ours where it is silent.
    pub fn merged_with(&self, other: &StageCounters) -> StageCounters {
        StageCounters {
            sources: other.sources.or(self.sources),
            fetched: other.fetched.or(self.fetched),
            parsed: other.parsed.or(self.parsed),
            cleaned: other.cleaned.or(self.cleaned),
            analyzed: other.analyzed.or(self.analyzed),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StageCounters::default()
    }
}

/// One batch execution tracked by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub stages: StageFlags,
    pub counters: StageCounters,
    /// Accumulated non-fatal errors, newline separated.
    pub errors: Option<String>,
}

impl Run {
    /// Individual error entries in the order they were recorded.
    pub fn error_entries(&self) -> Vec<&str> {
        self.errors
            .as_deref()
            .map(|e| e.lines().filter(|l| !l.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Wall-clock duration for finished runs.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

/// Value of a run statistic: numeric, or structured details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Details(serde_json::Value),
}

impl From<serde_json::Value> for StatValue {
    fn from(value: serde_json::Value) -> Self {
        match value.as_f64() {
            Some(n) => StatValue::Number(n),
            None => StatValue::Details(value),
        }
    }
}

/// Append-only per-run metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatistic {
    pub run_id: String,
    pub stage: Stage,
    pub metric_name: String,
    pub value: StatValue,
    pub created_at: DateTime<Utc>,
}

/// Append-only per-run, per-source fetch outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatistic {
    pub source_name: String,
    pub articles_fetched: i64,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
