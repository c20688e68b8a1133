/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data structures shared by the policy engine and its callers.
//!
//! Three types model the three sides of one decision point:
//!
//! ```text
//! event source ──(Event + Task)──►  PolicyEngine  ──(Action)──►  execution layer
//!                  ↑ input              ↑ owns Task records          ↑ output
//!                  batched, in time     while queued / running       not stored
//! ```
//!
//! # Ownership model
//! A [`Task`] is a small `Copy` record.  The engine keeps its own copy in an
//! internal registry from `TaskArrival` until `TaskFinish`; the payload
//! attached to later events is only used for its `task_id`.

use std::cmp::Ordering;
use std::fmt;

// ── Task identity ─────────────────────────────────────────────────────────────

/// Externally assigned task identifier.
///
/// `0` is reserved: on the raw wire form (see [`Action::to_raw`] and
/// [`id_from_raw`]) it means "no task".
pub type TaskId = u32;

/// Raw value used for "no task" on the wire.
pub const NO_TASK: u32 = 0;

/// Parse a raw task id where `0` means none.
pub fn id_from_raw(raw: u32) -> Option<TaskId> {
    if raw == NO_TASK {
        None
    } else {
        Some(raw)
    }
}

// ── Priority ──────────────────────────────────────────────────────────────────

/// Two-level task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Served before every `Low` task regardless of deadline.
    High,
    #[default]
    Low,
}

impl Priority {
    /// Sort rank: lower ranks are served first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Low => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => f.write_str("high"),
            Priority::Low => f.write_str("low"),
        }
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A schedulable unit of work.
///
/// Immutable once created.  The engine never rewrites any field; it only
/// moves copies between its ready queue, I/O wait set and the two resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Task {
    /// Unique while the task is live.  Never `0`.
    pub task_id: TaskId,

    pub priority: Priority,

    /// Absolute deadline; smaller is more urgent.
    pub deadline: i64,

    /// Time the task entered the system.  Informational only: queue ties
    /// are broken by insertion order, not by this value.
    pub arrival_time: u64,
}

impl Task {
    pub fn new(task_id: TaskId, priority: Priority, deadline: i64) -> Self {
        Self {
            task_id,
            priority,
            deadline,
            arrival_time: 0,
        }
    }

    /// Builder-style setter for `arrival_time`.
    pub fn arriving_at(mut self, arrival_time: u64) -> Self {
        self.arrival_time = arrival_time;
        self
    }

    /// Compare by urgency only: priority first, then deadline.
    ///
    /// `Ordering::Less` means `self` should be served first.  Equal urgency
    /// is resolved by the queue's insertion order.
    pub fn cmp_urgency(&self, other: &Task) -> Ordering {
        self.priority
            .rank()
            .cmp(&other.priority.rank())
            .then(self.deadline.cmp(&other.deadline))
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// What happened at an [`Event`]'s timestamp.
///
/// Every variant except `Timer` carries the full [`Task`] record it refers
/// to, so the engine never needs an external id lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Periodic tick; only triggers a rescheduling pass.
    Timer,
    TaskArrival(Task),
    TaskFinish(Task),
    /// The task running on the CPU wants the I/O channel.
    IoRequest(Task),
    /// The task on the I/O channel completed its transfer.
    IoEnd(Task),
}

impl EventKind {
    /// The task this event refers to, if any.
    pub fn task(&self) -> Option<&Task> {
        match self {
            EventKind::Timer => None,
            EventKind::TaskArrival(t)
            | EventKind::TaskFinish(t)
            | EventKind::IoRequest(t)
            | EventKind::IoEnd(t) => Some(t),
        }
    }

    /// Short lowercase name used in logs and trace files.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Timer => "timer",
            EventKind::TaskArrival(_) => "task_arrival",
            EventKind::TaskFinish(_) => "task_finish",
            EventKind::IoRequest(_) => "io_request",
            EventKind::IoEnd(_) => "io_end",
        }
    }
}

/// A timestamped input to one decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn timer(time: u64) -> Self {
        Self {
            time,
            kind: EventKind::Timer,
        }
    }

    pub fn arrival(time: u64, task: Task) -> Self {
        Self {
            time,
            kind: EventKind::TaskArrival(task),
        }
    }

    pub fn finish(time: u64, task: Task) -> Self {
        Self {
            time,
            kind: EventKind::TaskFinish(task),
        }
    }

    pub fn io_request(time: u64, task: Task) -> Self {
        Self {
            time,
            kind: EventKind::IoRequest(task),
        }
    }

    pub fn io_end(time: u64, task: Task) -> Self {
        Self {
            time,
            kind: EventKind::IoEnd(task),
        }
    }
}

// ── Action (output) ───────────────────────────────────────────────────────────

/// Resource assignment decided at one decision point.
///
/// Returned by value and never retained by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Action {
    pub cpu_task: Option<TaskId>,
    pub io_task: Option<TaskId>,
}

impl Action {
    /// Convert to the raw `(cpu, io)` pair where `0` means idle.
    pub fn to_raw(self) -> (u32, u32) {
        (
            self.cpu_task.unwrap_or(NO_TASK),
            self.io_task.unwrap_or(NO_TASK),
        )
    }

    /// Parse the raw `(cpu, io)` pair.
    pub fn from_raw(cpu: u32, io: u32) -> Self {
        Self {
            cpu_task: id_from_raw(cpu),
            io_task: id_from_raw(io),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (cpu, io) = self.to_raw();
        write!(f, "cpu={} io={}", cpu, io)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Priority ──────────────────────────────────────────────────────────────

    #[test]
    fn high_priority_ranks_before_low() {
        assert!(Priority::High.rank() < Priority::Low.rank());
    }

    #[test]
    fn default_priority_is_low() {
        assert_eq!(Priority::default(), Priority::Low);
    }

    // ── Task urgency ──────────────────────────────────────────────────────────

    #[test]
    fn high_priority_beats_earlier_low_deadline() {
        let high = Task::new(1, Priority::High, 100);
        let low = Task::new(2, Priority::Low, 1);
        assert_eq!(high.cmp_urgency(&low), Ordering::Less);
        assert_eq!(low.cmp_urgency(&high), Ordering::Greater);
    }

    #[test]
    fn equal_priority_orders_by_deadline() {
        let early = Task::new(1, Priority::Low, 5);
        let late = Task::new(2, Priority::Low, 9);
        assert_eq!(early.cmp_urgency(&late), Ordering::Less);
    }

    #[test]
    fn urgency_ignores_id_and_arrival_time() {
        let a = Task::new(1, Priority::High, 5).arriving_at(10);
        let b = Task::new(2, Priority::High, 5).arriving_at(0);
        assert_eq!(a.cmp_urgency(&b), Ordering::Equal);
    }

    // ── Events ────────────────────────────────────────────────────────────────

    #[test]
    fn timer_carries_no_task() {
        assert!(Event::timer(3).kind.task().is_none());
        assert_eq!(Event::timer(3).kind.name(), "timer");
    }

    #[test]
    fn task_events_expose_their_payload() {
        let t = Task::new(7, Priority::High, 1);
        for ev in [
            Event::arrival(0, t),
            Event::finish(0, t),
            Event::io_request(0, t),
            Event::io_end(0, t),
        ] {
            assert_eq!(ev.kind.task().map(|t| t.task_id), Some(7));
        }
    }

    // ── Action ────────────────────────────────────────────────────────────────

    #[test]
    fn action_raw_form_uses_zero_for_idle() {
        let action = Action {
            cpu_task: Some(4),
            io_task: None,
        };
        assert_eq!(action.to_raw(), (4, 0));
        assert_eq!(Action::from_raw(4, 0), action);
    }

    #[test]
    fn id_from_raw_maps_zero_to_none() {
        assert_eq!(id_from_raw(0), None);
        assert_eq!(id_from_raw(12), Some(12));
    }

    #[test]
    fn action_display_is_compact() {
        assert_eq!(Action::from_raw(1, 3).to_string(), "cpu=1 io=3");
        assert_eq!(Action::default().to_string(), "cpu=0 io=0");
    }
}
