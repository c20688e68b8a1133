/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! CPU / I/O dual-resource policy engine.
//!
//! [`PolicyEngine`] is called once per decision point with the batch of
//! [`Event`]s since the previous call.  It folds them into its ready queue,
//! I/O wait set and resource occupancy, assigns any idle resource to the most
//! eligible waiting task, and returns the resulting [`Action`].
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | State | Explicit engine value, no globals; one engine per CPU/I-O pair |
//! | Task lookup | Internal `id → Task` registry filled on arrival, erased on finish |
//! | I/O candidates | Explicit I/O wait set filled by `IoRequest` |
//! | Bad input | Absorbed as a no-op, reported as an [`Anomaly`] |
//! | Iteration order | `BTreeMap` everywhere, so equal input gives equal output |
//! | Preemption | None: an occupied resource is never reassigned |
//!
//! # Example
//! ```rust
//! use cpuio_policy::scheduler::PolicyEngine;
//! use cpuio_policy::task::{Event, Priority, Task};
//!
//! let mut engine = PolicyEngine::new();
//! let task = Task::new(1, Priority::High, 10);
//! let action = engine.decide(&[Event::arrival(0, task)], None, None);
//! assert_eq!(action.cpu_task, Some(1));
//! ```

pub mod error;
pub mod invariants;
pub mod queue;

pub use error::{Anomaly, InvariantViolation};
pub use queue::{QueueOrder, TaskQueue};

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::config::PolicyConfig;
use crate::task::{id_from_raw, Action, Event, EventKind, Task, TaskId};

// ── Resources ─────────────────────────────────────────────────────────────────

/// One of the two shared resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Cpu,
    Io,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Cpu => f.write_str("CPU"),
            Resource::Io => f.write_str("I/O channel"),
        }
    }
}

/// Occupancy of a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceState {
    #[default]
    Idle,
    Occupied(TaskId),
}

impl ResourceState {
    pub fn occupant(self) -> Option<TaskId> {
        match self {
            ResourceState::Idle => None,
            ResourceState::Occupied(id) => Some(id),
        }
    }

    pub fn is_idle(self) -> bool {
        self == ResourceState::Idle
    }

    pub fn is_held_by(self, task_id: TaskId) -> bool {
        self == ResourceState::Occupied(task_id)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Idle => f.write_str("idle"),
            ResourceState::Occupied(id) => write!(f, "task {}", id),
        }
    }
}

// ── Decision ──────────────────────────────────────────────────────────────────

/// Detailed result of one decision point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decision {
    pub action: Action,

    /// Inputs absorbed as no-ops, in the order they were encountered
    /// (hint reconciliation first, then events).
    pub anomalies: Vec<Anomaly>,
}

// ── PolicyEngine ──────────────────────────────────────────────────────────────

/// Single-owner scheduling policy state.
///
/// `decide` takes `&mut self`, so calls are serialised by construction.  The
/// engine is `Clone + PartialEq`: snapshot it to replay or compare states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEngine {
    config: PolicyConfig,

    /// Every live task, keyed by id.  `BTreeMap` for deterministic iteration.
    registry: BTreeMap<TaskId, Task>,

    /// Tasks eligible for the CPU and holding neither resource.
    ready: TaskQueue,

    /// Tasks that released the CPU with `IoRequest` and wait for the channel.
    io_wait: TaskQueue,

    cpu: ResourceState,
    io: ResourceState,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    /// Create an empty engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PolicyConfig::default())
    }

    /// Create an empty engine with an explicit configuration.
    pub fn with_config(config: PolicyConfig) -> Self {
        Self {
            config,
            registry: BTreeMap::new(),
            ready: TaskQueue::new(QueueOrder::Urgency),
            io_wait: TaskQueue::new(config.io_order.into()),
            cpu: ResourceState::Idle,
            io: ResourceState::Idle,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn cpu(&self) -> ResourceState {
        self.cpu
    }

    pub fn io(&self) -> ResourceState {
        self.io
    }

    pub fn ready_queue(&self) -> &TaskQueue {
        &self.ready
    }

    pub fn io_wait(&self) -> &TaskQueue {
        &self.io_wait
    }

    /// Registry record for a live task.
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.registry.get(&task_id)
    }

    /// Number of live tasks (queued, waiting or running).
    pub fn live_tasks(&self) -> usize {
        self.registry.len()
    }

    // ── Public entry points ───────────────────────────────────────────────────

    /// Process one decision point and return the resulting assignment.
    ///
    /// `events` must be in non-decreasing timestamp order; the engine does
    /// not sort them.  `running_cpu` / `running_io` are the caller's view of
    /// current occupancy and are reconciled against internal state, which
    /// wins on any disagreement.
    ///
    /// Never fails: inconsistent input is absorbed.  Use
    /// [`decide_detailed`](Self::decide_detailed) to see what was absorbed.
    pub fn decide(
        &mut self,
        events: &[Event],
        running_cpu: Option<TaskId>,
        running_io: Option<TaskId>,
    ) -> Action {
        self.decide_detailed(events, running_cpu, running_io).action
    }

    /// Like [`decide`](Self::decide) but with raw ids where `0` means none.
    pub fn decide_raw(&mut self, events: &[Event], running_cpu: u32, running_io: u32) -> Action {
        self.decide(events, id_from_raw(running_cpu), id_from_raw(running_io))
    }

    /// Like [`decide`](Self::decide), also returning every absorbed anomaly.
    pub fn decide_detailed(
        &mut self,
        events: &[Event],
        running_cpu: Option<TaskId>,
        running_io: Option<TaskId>,
    ) -> Decision {
        let mut anomalies = Vec::new();

        // ── Reconcile caller hints ────────────────────────────────────────────
        if let Err(a) = self.reconcile(Resource::Cpu, running_cpu) {
            anomalies.push(a);
        }
        if let Err(a) = self.reconcile(Resource::Io, running_io) {
            anomalies.push(a);
        }

        // ── Fold events ───────────────────────────────────────────────────────
        let mut latest: Option<u64> = None;
        for event in events {
            if let Some(previous) = latest {
                if event.time < previous {
                    anomalies.push(Anomaly::OutOfOrderEvent {
                        time: event.time,
                        previous,
                    });
                }
            }
            latest = Some(latest.map_or(event.time, |t| t.max(event.time)));

            if let Err(a) = self.apply(event) {
                anomalies.push(a);
            }
        }

        // ── Assign idle resources ─────────────────────────────────────────────
        self.assign();

        for anomaly in &anomalies {
            warn!(%anomaly, "absorbed inconsistent input");
        }
        if let Err(violation) = self.check_invariants() {
            error!(%violation, "policy engine invariant violated");
        }

        let action = self.action();
        info!(
            cpu = ?action.cpu_task,
            io = ?action.io_task,
            events = events.len(),
            ready = self.ready.len(),
            io_wait = self.io_wait.len(),
            anomalies = anomalies.len(),
            "decision"
        );

        Decision { action, anomalies }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    fn resource(&self, resource: Resource) -> ResourceState {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Io => self.io,
        }
    }

    fn resource_mut(&mut self, resource: Resource) -> &mut ResourceState {
        match resource {
            Resource::Cpu => &mut self.cpu,
            Resource::Io => &mut self.io,
        }
    }

    /// Check one caller hint against internal occupancy.
    ///
    /// An idle resource adopts the hinted task only if the registry knows it
    /// and it is not queued, waiting for I/O, or on the other resource.
    fn reconcile(&mut self, resource: Resource, hint: Option<TaskId>) -> Result<(), Anomaly> {
        let Some(reported) = hint else {
            return Ok(());
        };
        let recorded = self.resource(resource);
        let mismatch = Anomaly::HintMismatch {
            resource,
            reported,
            recorded,
        };

        match recorded {
            ResourceState::Occupied(id) if id == reported => Ok(()),
            ResourceState::Occupied(_) => Err(mismatch),
            ResourceState::Idle => {
                let other = match resource {
                    Resource::Cpu => self.io,
                    Resource::Io => self.cpu,
                };
                let adoptable = self.registry.contains_key(&reported)
                    && !self.ready.contains(reported)
                    && !self.io_wait.contains(reported)
                    && !other.is_held_by(reported);
                if !adoptable {
                    return Err(mismatch);
                }
                debug!(task = reported, %resource, "adopting caller-reported occupant");
                *self.resource_mut(resource) = ResourceState::Occupied(reported);
                Ok(())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event folding
    // ─────────────────────────────────────────────────────────────────────────

    fn apply(&mut self, event: &Event) -> Result<(), Anomaly> {
        debug!(
            time = event.time,
            kind = event.kind.name(),
            task = ?event.kind.task().map(|t| t.task_id),
            "event"
        );

        match event.kind {
            EventKind::Timer => Ok(()),
            EventKind::TaskArrival(task) => self.on_arrival(task),
            EventKind::TaskFinish(task) => self.on_finish(task.task_id),
            EventKind::IoRequest(task) => self.on_io_request(task.task_id),
            EventKind::IoEnd(task) => self.on_io_end(task.task_id),
        }
    }

    fn on_arrival(&mut self, task: Task) -> Result<(), Anomaly> {
        if task.task_id == 0 {
            return Err(Anomaly::ReservedTaskId);
        }
        if self.registry.contains_key(&task.task_id) {
            return Err(Anomaly::DuplicateArrival { task: task.task_id });
        }
        self.registry.insert(task.task_id, task);
        self.ready.push(task);
        Ok(())
    }

    fn on_finish(&mut self, task_id: TaskId) -> Result<(), Anomaly> {
        if !self.cpu.is_held_by(task_id) {
            return Err(Anomaly::FinishNotOnCpu { task: task_id });
        }
        self.cpu = ResourceState::Idle;
        self.registry.remove(&task_id);
        debug!(task = task_id, "task finished, CPU released");
        Ok(())
    }

    fn on_io_request(&mut self, task_id: TaskId) -> Result<(), Anomaly> {
        let task = match self.registry.get(&task_id) {
            Some(task) if self.cpu.is_held_by(task_id) => *task,
            _ => return Err(Anomaly::IoRequestNotOnCpu { task: task_id }),
        };
        self.cpu = ResourceState::Idle;
        self.io_wait.push(task);
        debug!(task = task_id, "CPU released, waiting for I/O");
        Ok(())
    }

    fn on_io_end(&mut self, task_id: TaskId) -> Result<(), Anomaly> {
        let task = match self.registry.get(&task_id) {
            Some(task) if self.io.is_held_by(task_id) => *task,
            _ => return Err(Anomaly::IoEndNotOnChannel { task: task_id }),
        };
        self.io = ResourceState::Idle;
        self.ready.push(task);
        debug!(task = task_id, "I/O complete, task re-queued");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assignment
    // ─────────────────────────────────────────────────────────────────────────

    fn assign(&mut self) {
        if self.io.is_idle() {
            if let Some(task) = self.io_wait.pop() {
                self.io = ResourceState::Occupied(task.task_id);
                debug!(task = task.task_id, "assigned to I/O channel");
            }
        }
        if self.cpu.is_idle() {
            if let Some(task) = self.ready.pop() {
                self.cpu = ResourceState::Occupied(task.task_id);
                debug!(
                    task = task.task_id,
                    priority = %task.priority,
                    deadline = task.deadline,
                    "assigned to CPU"
                );
            }
        }
    }

    fn action(&self) -> Action {
        Action {
            cpu_task: self.cpu.occupant(),
            io_task: self.io.occupant(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
