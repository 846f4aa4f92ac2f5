//! The five-stage query pipeline shown in the Query Flow panel.
//!
//! Stage statuses are derived from the local execution phase: the progress
//! messages advance through the stages, a successful result completes them
//! all, and an error marks the stage that was running as failed.

use std::time::Duration;

/// Delay between simulated progress messages.
pub const PROGRESS_STEP: Duration = Duration::from_millis(500);

/// Progress messages shown before the query is submitted.
pub static PROGRESS_MESSAGES: [&str; 6] = [
    "Parsing SQL query...",
    "Creating execution plan...",
    "Distributing to workers...",
    "Executing on workers...",
    "Aggregating results...",
    "Returning results...",
];

/// Sample queries offered by the Query Flow panel.
pub const SAMPLE_QUERIES: [&str; 4] = [
    "SELECT name, age FROM users WHERE age > 30",
    "SELECT COUNT(*) FROM users",
    "SELECT u.name, o.order_id FROM users u JOIN orders o ON u.user_id = o.user_id",
    "SELECT * FROM products WHERE category = 'Electronics'",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parser,
    Planner,
    ShardAssignment,
    WorkerExecution,
    Aggregation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Parser,
        Stage::Planner,
        Stage::ShardAssignment,
        Stage::WorkerExecution,
        Stage::Aggregation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Parser => "SQL Parser",
            Stage::Planner => "Query Planner",
            Stage::ShardAssignment => "Shard Assignment",
            Stage::WorkerExecution => "Worker Execution",
            Stage::Aggregation => "Result Aggregation",
        }
    }
}

/// Status of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Running,
    Pending,
    Failed,
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Completed => "completed",
            StepStatus::Running => "running",
            StepStatus::Pending => "pending",
            StepStatus::Failed => "failed",
        }
    }
}

/// Where the current query execution is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    /// `n` progress messages shown so far.
    Progress(usize),
    /// All messages shown, waiting for the REST response.
    Submitted,
    Succeeded,
    /// Failed while `stage` was running.
    Failed { stage: usize },
}

impl ExecutionPhase {
    /// Whether a query is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, ExecutionPhase::Progress(_) | ExecutionPhase::Submitted)
    }

    /// Index of the stage currently running, if any.
    pub fn running_stage(&self) -> Option<usize> {
        match *self {
            ExecutionPhase::Progress(n) => Some(stage_for_message(n.saturating_sub(1))),
            ExecutionPhase::Submitted => Some(Stage::ALL.len() - 1),
            _ => None,
        }
    }

    /// Progress messages visible in this phase.
    pub fn messages(&self) -> &'static [&'static str] {
        match *self {
            ExecutionPhase::Idle => &[],
            ExecutionPhase::Progress(n) => &PROGRESS_MESSAGES[..n.min(PROGRESS_MESSAGES.len())],
            _ => &PROGRESS_MESSAGES,
        }
    }

    /// Status of each stage in [`Stage::ALL`] order.
    pub fn step_statuses(&self) -> [StepStatus; 5] {
        let mut statuses = [StepStatus::Pending; 5];
        match *self {
            ExecutionPhase::Idle => {}
            ExecutionPhase::Succeeded => statuses = [StepStatus::Completed; 5],
            ExecutionPhase::Failed { stage } => {
                let stage = stage.min(statuses.len() - 1);
                statuses[..stage].fill(StepStatus::Completed);
                statuses[stage] = StepStatus::Failed;
            }
            ExecutionPhase::Progress(_) | ExecutionPhase::Submitted => {
                if let Some(stage) = self.running_stage() {
                    statuses[..stage].fill(StepStatus::Completed);
                    statuses[stage] = StepStatus::Running;
                }
            }
        }
        statuses
    }
}

/// The last two messages both belong to aggregation.
fn stage_for_message(index: usize) -> usize {
    index.min(Stage::ALL.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use StepStatus::*;

    #[test]
    fn test_idle_is_all_pending() {
        assert_eq!(ExecutionPhase::Idle.step_statuses(), [Pending; 5]);
        assert!(ExecutionPhase::Idle.messages().is_empty());
    }

    #[test]
    fn test_progress_advances_stages() {
        assert_eq!(
            ExecutionPhase::Progress(1).step_statuses(),
            [Running, Pending, Pending, Pending, Pending]
        );
        assert_eq!(
            ExecutionPhase::Progress(3).step_statuses(),
            [Completed, Completed, Running, Pending, Pending]
        );
        assert_eq!(
            ExecutionPhase::Progress(6).step_statuses(),
            [Completed, Completed, Completed, Completed, Running]
        );
        assert_eq!(ExecutionPhase::Progress(2).messages(), &PROGRESS_MESSAGES[..2]);
    }

    #[test]
    fn test_terminal_phases() {
        assert_eq!(ExecutionPhase::Succeeded.step_statuses(), [Completed; 5]);
        assert_eq!(
            ExecutionPhase::Failed { stage: 4 }.step_statuses(),
            [Completed, Completed, Completed, Completed, Failed]
        );
        assert!(!ExecutionPhase::Succeeded.is_running());
        assert!(ExecutionPhase::Submitted.is_running());
    }
}
