/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structural invariants of [`PolicyEngine`] state.
//!
//! Checked after every decision point.  A violation is **logged only**; the
//! action is still returned.  Inputs can never cause a violation, so one
//! always points at an engine bug.
//!
//! | Invariant | Violation |
//! |---|---|
//! | Ready queue sorted by priority, deadline | `ReadyQueueUnordered` |
//! | CPU and I/O never share a task | `SharedOccupancy` |
//! | A task is in at most one place | `DuplicateTask` |
//! | Everything held is registered | `Unregistered` |
//! | Everything registered is held | `Orphaned` |

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::{InvariantViolation, PolicyEngine};
use crate::task::TaskId;

impl PolicyEngine {
    /// Verify every structural invariant, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        check_ready_order(self)?;

        if let (Some(cpu), Some(io)) = (self.cpu.occupant(), self.io.occupant()) {
            if cpu == io {
                return Err(InvariantViolation::SharedOccupancy { task: cpu });
            }
        }

        let held = held_ids(self)?;
        for id in &held {
            if !self.registry.contains_key(id) {
                return Err(InvariantViolation::Unregistered { task: *id });
            }
        }
        for id in self.registry.keys() {
            if !held.contains(id) {
                return Err(InvariantViolation::Orphaned { task: *id });
            }
        }

        Ok(())
    }
}

fn check_ready_order(engine: &PolicyEngine) -> Result<(), InvariantViolation> {
    let tasks: Vec<_> = engine.ready.iter().collect();
    for pair in tasks.windows(2) {
        if pair[0].cmp_urgency(pair[1]) == Ordering::Greater {
            return Err(InvariantViolation::ReadyQueueUnordered {
                ahead: pair[0].task_id,
                behind: pair[1].task_id,
            });
        }
    }
    Ok(())
}

/// Every id held by a queue or resource, failing on the first repeat.
fn held_ids(engine: &PolicyEngine) -> Result<BTreeSet<TaskId>, InvariantViolation> {
    let mut seen = BTreeSet::new();
    let all = engine
        .ready
        .iter()
        .chain(engine.io_wait.iter())
        .map(|t| t.task_id)
        .chain(engine.cpu.occupant())
        .chain(engine.io.occupant());

    for id in all {
        if !seen.insert(id) {
            return Err(InvariantViolation::DuplicateTask { task: id });
        }
    }
    Ok(seen)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ResourceState;
    use crate::task::{Event, Priority, Task};

    #[test]
    fn fresh_engine_is_consistent() {
        assert_eq!(PolicyEngine::new().check_invariants(), Ok(()));
    }

    #[test]
    fn busy_engine_is_consistent() {
        let mut engine = PolicyEngine::new();
        let t1 = Task::new(1, Priority::High, 1);
        engine.decide(
            &[
                Event::arrival(0, t1),
                Event::arrival(0, Task::new(2, Priority::Low, 4)),
                Event::arrival(0, Task::new(3, Priority::High, 9)),
            ],
            None,
            None,
        );
        engine.decide(&[Event::io_request(1, t1)], Some(1), None);
        assert_eq!(engine.check_invariants(), Ok(()));
    }

    #[test]
    fn shared_occupancy_is_detected() {
        let mut engine = PolicyEngine::new();
        engine.decide(&[Event::arrival(0, Task::new(1, Priority::High, 1))], None, None);
        engine.io = ResourceState::Occupied(1);
        assert_eq!(
            engine.check_invariants(),
            Err(InvariantViolation::SharedOccupancy { task: 1 })
        );
    }

    #[test]
    fn queued_and_running_task_is_a_duplicate() {
        let mut engine = PolicyEngine::new();
        let t = Task::new(1, Priority::High, 1);
        engine.decide(&[Event::arrival(0, t)], None, None);
        engine.ready.push(t);
        assert_eq!(
            engine.check_invariants(),
            Err(InvariantViolation::DuplicateTask { task: 1 })
        );
    }

    #[test]
    fn unregistered_occupant_is_detected() {
        let mut engine = PolicyEngine::new();
        engine.cpu = ResourceState::Occupied(5);
        assert_eq!(
            engine.check_invariants(),
            Err(InvariantViolation::Unregistered { task: 5 })
        );
    }

    #[test]
    fn orphaned_registry_entry_is_detected() {
        let mut engine = PolicyEngine::new();
        engine.registry.insert(8, Task::new(8, Priority::Low, 0));
        assert_eq!(
            engine.check_invariants(),
            Err(InvariantViolation::Orphaned { task: 8 })
        );
    }
}
