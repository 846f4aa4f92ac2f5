//! Script of the guided demo.

use std::time::Duration;

/// One step of the demo walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoStep {
    pub title: &'static str,
    pub description: &'static str,
    pub duration: Duration,
}

pub static DEMO_STEPS: [DemoStep; 4] = [
    DemoStep {
        title: "System Overview",
        description: "Show the distributed architecture with coordinator and workers",
        duration: Duration::from_millis(3000),
    },
    DemoStep {
        title: "Query Execution",
        description: "Execute a sample query and show the distributed processing",
        duration: Duration::from_millis(5000),
    },
    DemoStep {
        title: "Performance Metrics",
        description: "Display real-time performance metrics and worker utilization",
        duration: Duration::from_millis(4000),
    },
    DemoStep {
        title: "Fault Tolerance",
        description: "Demonstrate system resilience and recovery mechanisms",
        duration: Duration::from_millis(3000),
    },
];

/// Step at which the canned queries run.
pub const QUERY_STEP: usize = 1;

/// Pause after each canned query.
pub const QUERY_PAUSE: Duration = Duration::from_millis(1000);

/// A canned query and what it demonstrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoQuery {
    pub sql: &'static str,
    pub description: &'static str,
}

pub const DEMO_QUERIES: [DemoQuery; 3] = [
    DemoQuery {
        sql: "SELECT name, age FROM users WHERE age > 30",
        description: "Simple filtered query across sharded data",
    },
    DemoQuery {
        sql: "SELECT COUNT(*) FROM users",
        description: "Aggregation query with distributed counting",
    },
    DemoQuery {
        sql: "SELECT u.name, o.order_id FROM users u JOIN orders o ON u.user_id = o.user_id",
        description: "Complex JOIN query across multiple tables",
    },
];

/// Static notes shown below the demo controls, as (heading, text).
pub const CONCEPTS: [(&str, &str); 3] = [
    (
        "Microservices Architecture",
        "The system uses a coordinator-worker pattern where the coordinator manages query \
         planning and execution across multiple worker nodes.",
    ),
    (
        "Data Sharding",
        "Data is distributed across workers using hash-based and range-based sharding \
         strategies for optimal query performance.",
    ),
    (
        "Fault Tolerance",
        "The system includes health monitoring, automatic failure detection, and query retry \
         mechanisms for reliability.",
    ),
];

pub const TECHNOLOGY: [(&str, &str); 3] = [
    (
        "Backend",
        "Java 17, Spring Boot, gRPC, Protocol Buffers, PostgreSQL, HikariCP connection pooling",
    ),
    ("Frontend", "Terminal dashboard over WebSocket for real-time updates"),
    (
        "Communication",
        "gRPC for high-performance inter-service communication, WebSocket for real-time \
         visualization",
    ),
];

/// Demo state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemoState {
    #[default]
    Idle,
    /// Index into [`DEMO_STEPS`].
    Running(usize),
}

impl DemoState {
    pub fn is_running(&self) -> bool {
        matches!(self, DemoState::Running(_))
    }

    /// The step shown, if running.
    pub fn step(&self) -> Option<&'static DemoStep> {
        match *self {
            DemoState::Running(i) => DEMO_STEPS.get(i),
            DemoState::Idle => None,
        }
    }

    /// Fraction of the script reached, counting the current step.
    pub fn progress(&self) -> f64 {
        match *self {
            DemoState::Running(i) => ((i + 1) as f64 / DEMO_STEPS.len() as f64).min(1.0),
            DemoState::Idle => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_timing() {
        let total: Duration = DEMO_STEPS.iter().map(|s| s.duration).sum();
        assert_eq!(total, Duration::from_secs(15));
        assert_eq!(DEMO_STEPS[QUERY_STEP].title, "Query Execution");
    }

    #[test]
    fn test_state_progress() {
        assert_eq!(DemoState::Idle.progress(), 0.0);
        assert_eq!(DemoState::Running(0).progress(), 0.25);
        assert_eq!(DemoState::Running(3).progress(), 1.0);
        assert_eq!(DemoState::Running(2).step().unwrap().title, "Performance Metrics");
        assert!(DemoState::Idle.step().is_none());
    }
}
