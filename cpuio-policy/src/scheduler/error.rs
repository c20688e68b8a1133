/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured anomaly and invariant types for the policy engine.
//!
//! Two enums model the two layers:
//!
//! * [`Anomaly`]: an input that disagrees with the engine's bookkeeping.
//!   Absorbed as a no-op and reported inside
//!   [`Decision`](super::Decision); never returned as an `Err`.
//! * [`InvariantViolation`]: the engine's own state is inconsistent.  Only
//!   an engine bug can produce one; see
//!   [`PolicyEngine::check_invariants`](super::PolicyEngine::check_invariants).
//!
//! Every variant carries the task id and resource involved so the caller can
//! log or count it without further parsing.

use thiserror::Error;

use super::{Resource, ResourceState};
use crate::task::TaskId;

// ── Anomalies ─────────────────────────────────────────────────────────────────

/// An event or caller hint that was inconsistent with internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Anomaly {
    /// `TaskArrival` for an id that is already queued, waiting or running.
    #[error("task {task} arrived while already live")]
    DuplicateArrival { task: TaskId },

    /// `TaskArrival` carrying id `0`, which the wire form reserves for
    /// "no task".
    #[error("task id 0 is reserved and cannot be scheduled")]
    ReservedTaskId,

    /// `TaskFinish` for a task that is not on the CPU.
    #[error("task {task} finished but is not on the CPU")]
    FinishNotOnCpu { task: TaskId },

    /// `IoRequest` for a task that is not on the CPU.
    #[error("task {task} requested I/O but is not on the CPU")]
    IoRequestNotOnCpu { task: TaskId },

    /// `IoEnd` for a task that is not on the I/O channel.
    #[error("task {task} ended I/O but is not on the I/O channel")]
    IoEndNotOnChannel { task: TaskId },

    /// An event timestamp went backwards within one batch.  The event is
    /// still applied in delivery order.
    #[error("event at t={time} delivered after event at t={previous}")]
    OutOfOrderEvent { time: u64, previous: u64 },

    /// The caller's running-task id disagrees with internal occupancy.
    #[error("caller reports task {reported} on the {resource}, engine records {recorded}")]
    HintMismatch {
        resource: Resource,
        reported: TaskId,
        recorded: ResourceState,
    },
}

// ── Invariant violations ──────────────────────────────────────────────────────

/// A broken structural invariant in engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Two adjacent ready-queue entries are in the wrong urgency order.
    #[error("ready queue out of order: task {ahead} is ahead of more urgent task {behind}")]
    ReadyQueueUnordered { ahead: TaskId, behind: TaskId },

    /// The CPU and the I/O channel are held by the same task.
    #[error("task {task} holds both the CPU and the I/O channel")]
    SharedOccupancy { task: TaskId },

    /// A task appears in more than one place (queue, wait set, resource), or
    /// twice in the same place.
    #[error("task {task} is tracked in more than one place")]
    DuplicateTask { task: TaskId },

    /// A queued, waiting or running task has no registry record.
    #[error("task {task} is held but has no registry record")]
    Unregistered { task: TaskId },

    /// A registry record that is neither queued, waiting nor running.
    #[error("task {task} is registered but held nowhere")]
    Orphaned { task: TaskId },
}
