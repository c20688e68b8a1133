/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Event traces: loading from YAML and replaying through a [`PolicyEngine`].
//!
//! The expected YAML structure is:
//! ```yaml
//! config:                  # optional, same keys as the policy config file
//!   io_order: fifo
//! steps:
//!   - running_cpu: 0       # raw ids, 0 = none; both optional
//!     running_io: 0
//!     events:
//!       - { time: 0, kind: task_arrival, task: { id: 1, priority: high, deadline: 10 } }
//!       - { time: 1, kind: timer }
//!     expect: { cpu: 1, io: 0 }   # optional
//! ```
//!
//! `task_arrival` needs a complete task (`id`, `priority`, `deadline`;
//! `arrival_time` defaults to the event time).  The other task events only
//! need `id`, since the engine resolves them against its registry.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{PolicyConfig, PolicyConfigEntry};
use crate::scheduler::{Decision, PolicyEngine};
use crate::task::{id_from_raw, Action, Event, EventKind, Priority, Task, TaskId};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Structural problems in a trace that YAML parsing alone cannot catch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("step {step}, event {event}: '{kind}' requires a task")]
    MissingTask {
        step: usize,
        event: usize,
        kind: &'static str,
    },

    #[error("step {step}, event {event}: 'timer' must not carry a task")]
    UnexpectedTask { step: usize, event: usize },

    #[error("step {step}, event {event}: task {task} arrival is missing '{field}'")]
    IncompleteArrival {
        step: usize,
        event: usize,
        task: TaskId,
        field: &'static str,
    },
}

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TraceFile {
    #[serde(default)]
    config: Option<PolicyConfigEntry>,
    #[serde(default)]
    steps: Vec<StepEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepEntry {
    #[serde(default)]
    running_cpu: u32,
    #[serde(default)]
    running_io: u32,
    #[serde(default)]
    events: Vec<EventEntry>,
    #[serde(default)]
    expect: Option<ExpectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventEntry {
    time: u64,
    kind: KindEntry,
    #[serde(default)]
    task: Option<TaskEntry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum KindEntry {
    Timer,
    TaskArrival,
    TaskFinish,
    IoRequest,
    IoEnd,
}

impl KindEntry {
    fn as_str(self) -> &'static str {
        match self {
            KindEntry::Timer => "timer",
            KindEntry::TaskArrival => "task_arrival",
            KindEntry::TaskFinish => "task_finish",
            KindEntry::IoRequest => "io_request",
            KindEntry::IoEnd => "io_end",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PriorityEntry {
    High,
    Low,
}

impl From<PriorityEntry> for Priority {
    fn from(p: PriorityEntry) -> Self {
        match p {
            PriorityEntry::High => Priority::High,
            PriorityEntry::Low => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    id: TaskId,
    #[serde(default)]
    priority: Option<PriorityEntry>,
    #[serde(default)]
    deadline: Option<i64>,
    #[serde(default)]
    arrival_time: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpectEntry {
    #[serde(default)]
    cpu: u32,
    #[serde(default)]
    io: u32,
}

// ── Public data structures ────────────────────────────────────────────────────

/// One decision point of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub running_cpu: Option<TaskId>,
    pub running_io: Option<TaskId>,
    pub events: Vec<Event>,
    /// Action the step is expected to produce, if the trace asserts one.
    pub expect: Option<Action>,
}

/// A validated trace ready for replay.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace {
    pub config: PolicyConfig,
    pub steps: Vec<TraceStep>,
}

impl Trace {
    /// Parses and validates a YAML trace.
    ///
    /// # Errors
    /// Returns an error if the YAML is invalid or an event violates the
    /// payload rules (see [`TraceError`]).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: TraceFile = serde_yaml::from_str(content).context("Failed to parse trace")?;

        let config = file.config.map(PolicyConfig::from).unwrap_or_default();
        let steps = file
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| convert_step(i, step))
            .collect::<Result<Vec<_>, TraceError>>()?;

        Ok(Self { config, steps })
    }

    /// Reads, parses and validates `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a valid trace.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading trace from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open trace file: {}", path.display()))?;

        let trace = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid trace file: {}", path.display()))?;

        info!(
            steps = trace.steps.len(),
            events = trace.steps.iter().map(|s| s.events.len()).sum::<usize>(),
            io_order = %trace.config.io_order,
            "Trace loaded"
        );
        Ok(trace)
    }
}

fn convert_step(index: usize, step: StepEntry) -> Result<TraceStep, TraceError> {
    let events = step
        .events
        .into_iter()
        .enumerate()
        .map(|(i, ev)| convert_event(index, i, ev))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TraceStep {
        running_cpu: id_from_raw(step.running_cpu),
        running_io: id_from_raw(step.running_io),
        events,
        expect: step.expect.map(|e| Action::from_raw(e.cpu, e.io)),
    })
}

fn convert_event(step: usize, event: usize, entry: EventEntry) -> Result<Event, TraceError> {
    let kind = match (entry.kind, entry.task) {
        (KindEntry::Timer, None) => EventKind::Timer,
        (KindEntry::Timer, Some(_)) => return Err(TraceError::UnexpectedTask { step, event }),
        (kind, None) => {
            return Err(TraceError::MissingTask {
                step,
                event,
                kind: kind.as_str(),
            })
        }
        (KindEntry::TaskArrival, Some(t)) => {
            let incomplete = |field| TraceError::IncompleteArrival {
                step,
                event,
                task: t.id,
                field,
            };
            let priority = t.priority.ok_or_else(|| incomplete("priority"))?;
            let deadline = t.deadline.ok_or_else(|| incomplete("deadline"))?;
            EventKind::TaskArrival(Task {
                task_id: t.id,
                priority: priority.into(),
                deadline,
                arrival_time: t.arrival_time.unwrap_or(entry.time),
            })
        }
        (KindEntry::TaskFinish, Some(t)) => EventKind::TaskFinish(reference(t)),
        (KindEntry::IoRequest, Some(t)) => EventKind::IoRequest(reference(t)),
        (KindEntry::IoEnd, Some(t)) => EventKind::IoEnd(reference(t)),
    };

    Ok(Event {
        time: entry.time,
        kind,
    })
}

/// Payload for a non-arrival event; only the id is significant.
fn reference(t: TaskEntry) -> Task {
    Task {
        task_id: t.id,
        priority: t.priority.map(Priority::from).unwrap_or_default(),
        deadline: t.deadline.unwrap_or_default(),
        arrival_time: t.arrival_time.unwrap_or_default(),
    }
}

// ── Replay ────────────────────────────────────────────────────────────────────

/// Result of replaying one [`TraceStep`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub decision: Decision,
    pub expect: Option<Action>,
}

impl StepOutcome {
    /// `true` when the step had no expectation or the action matched it.
    pub fn matches_expectation(&self) -> bool {
        self.expect.map_or(true, |e| e == self.decision.action)
    }
}

/// Replay `trace` through a fresh engine built from the trace's own config.
pub fn replay(trace: &Trace) -> Vec<StepOutcome> {
    replay_with(trace, trace.config)
}

/// Replay `trace` through a fresh engine built from `config`.
pub fn replay_with(trace: &Trace, config: PolicyConfig) -> Vec<StepOutcome> {
    let mut engine = PolicyEngine::with_config(config);

    trace
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let decision = engine.decide_detailed(&step.events, step.running_cpu, step.running_io);
            let outcome = StepOutcome {
                index,
                decision,
                expect: step.expect,
            };
            if !outcome.matches_expectation() {
                warn!(
                    step = index,
                    got = %outcome.decision.action,
                    expected = ?outcome.expect,
                    "action differs from trace expectation"
                );
            }
            outcome
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IoOrder;
    use crate::scheduler::Anomaly;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const IO_ROUND_TRIP: &str = r#"
config:
  io_order: fifo
steps:
  - events:
      - { time: 0, kind: task_arrival, task: { id: 1, priority: high, deadline: 10 } }
      - { time: 0, kind: task_arrival, task: { id: 2, priority: low, deadline: 3, arrival_time: 0 } }
    expect: { cpu: 1 }
  - running_cpu: 1
    events:
      - { time: 4, kind: io_request, task: { id: 1 } }
    expect: { cpu: 2, io: 1 }
  - running_cpu: 2
    running_io: 1
    events:
      - { time: 9, kind: io_end, task: { id: 1 } }
      - { time: 9, kind: timer }
    expect: { cpu: 2, io: 0 }
"#;

    // ── Loading ───────────────────────────────────────────────────────────────

    #[test]
    fn load_full_trace() {
        let f = yaml_tempfile(IO_ROUND_TRIP);
        let trace = Trace::load_from_file(f.path()).unwrap();

        assert_eq!(trace.config.io_order, IoOrder::Fifo);
        assert_eq!(trace.steps.len(), 3);

        let first = &trace.steps[0];
        assert_eq!(first.running_cpu, None);
        assert_eq!(first.events.len(), 2);
        assert_eq!(
            first.events[0].kind,
            EventKind::TaskArrival(Task::new(1, Priority::High, 10))
        );
        assert_eq!(first.expect, Some(Action::from_raw(1, 0)));

        assert_eq!(trace.steps[2].running_io, Some(1));
        assert_eq!(trace.steps[2].events[1].kind, EventKind::Timer);
    }

    #[test]
    fn arrival_time_defaults_to_event_time() {
        let trace = Trace::from_yaml_str(
            "steps:\n  - events:\n      - { time: 7, kind: task_arrival, task: { id: 3, priority: low, deadline: 1 } }\n",
        )
        .unwrap();
        match trace.steps[0].events[0].kind {
            EventKind::TaskArrival(t) => assert_eq!(t.arrival_time, 7),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn missing_config_uses_defaults() {
        let trace = Trace::from_yaml_str("steps: []\n").unwrap();
        assert_eq!(trace.config, PolicyConfig::default());
        assert!(trace.steps.is_empty());
    }

    #[test]
    fn task_event_without_task_is_rejected() {
        let err = Trace::from_yaml_str("steps:\n  - events:\n      - { time: 0, kind: io_end }\n")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TraceError>(),
            Some(&TraceError::MissingTask {
                step: 0,
                event: 0,
                kind: "io_end"
            })
        );
    }

    #[test]
    fn timer_with_task_is_rejected() {
        let err = Trace::from_yaml_str(
            "steps:\n  - events:\n      - { time: 0, kind: timer, task: { id: 1 } }\n",
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TraceError>(),
            Some(&TraceError::UnexpectedTask { step: 0, event: 0 })
        );
    }

    #[test]
    fn arrival_without_deadline_is_rejected() {
        let err = Trace::from_yaml_str(
            "steps:\n  - {}\n  - events:\n      - { time: 0, kind: task_arrival, task: { id: 4, priority: high } }\n",
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TraceError>(),
            Some(&TraceError::IncompleteArrival {
                step: 1,
                event: 0,
                task: 4,
                field: "deadline"
            })
        );
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        assert!(
            Trace::from_yaml_str("steps:\n  - events:\n      - { time: 0, kind: preempt }\n")
                .is_err()
        );
    }

    #[test]
    fn missing_file_returns_error() {
        assert!(Trace::load_from_file(Path::new("/nonexistent/trace.yaml")).is_err());
    }

    // ── Replay ────────────────────────────────────────────────────────────────

    #[test]
    fn replay_meets_every_expectation() {
        let trace = Trace::from_yaml_str(IO_ROUND_TRIP).unwrap();
        let outcomes = replay(&trace);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(StepOutcome::matches_expectation));
        assert!(outcomes.iter().all(|o| o.decision.anomalies.is_empty()));
    }

    #[test]
    fn replay_reports_mismatched_expectation() {
        let trace = Trace::from_yaml_str(
            "steps:\n  - events:\n      - { time: 0, kind: task_arrival, task: { id: 1, priority: high, deadline: 1 } }\n    expect: { cpu: 2 }\n",
        )
        .unwrap();
        let outcomes = replay(&trace);
        assert!(!outcomes[0].matches_expectation());
        assert_eq!(outcomes[0].decision.action.cpu_task, Some(1));
    }

    #[test]
    fn replay_surfaces_anomalies() {
        let trace = Trace::from_yaml_str(
            "steps:\n  - events:\n      - { time: 0, kind: task_finish, task: { id: 5 } }\n",
        )
        .unwrap();
        let outcomes = replay(&trace);
        assert_eq!(
            outcomes[0].decision.anomalies,
            vec![Anomaly::FinishNotOnCpu { task: 5 }]
        );
    }

    #[test]
    fn replay_with_overrides_trace_config() {
        let trace = Trace::from_yaml_str(IO_ROUND_TRIP).unwrap();
        let outcomes = replay_with(&trace, PolicyConfig::default());
        // This trace never has two I/O waiters, so the order does not matter.
        assert!(outcomes.iter().all(StepOutcome::matches_expectation));
    }

    #[test]
    fn step_without_expectation_always_matches() {
        let trace = Trace::from_yaml_str("steps:\n  - events: []\n").unwrap();
        assert!(replay(&trace)[0].matches_expectation());
    }
}
