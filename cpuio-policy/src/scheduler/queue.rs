/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deterministically ordered task queue.
//!
//! Used twice by the engine: once as the CPU ready queue (always
//! [`QueueOrder::Urgency`]) and once as the I/O wait set (order taken from
//! [`IoOrder`](crate::config::IoOrder)).
//!
//! Entries live in a `BTreeMap` keyed by `(rank, deadline, seq)`.  `seq` is a
//! per-queue insertion counter, so equal-urgency tasks leave in the order they
//! entered and two queues fed the same inserts always pop the same sequence.

use std::collections::BTreeMap;

use crate::config::IoOrder;
use crate::task::{Task, TaskId};

/// Pop order of a [`TaskQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    /// Priority, then deadline, then insertion order.
    Urgency,
    /// Insertion order only.
    Fifo,
}

impl From<IoOrder> for QueueOrder {
    fn from(order: IoOrder) -> Self {
        match order {
            IoOrder::PriorityDeadline => QueueOrder::Urgency,
            IoOrder::Fifo => QueueOrder::Fifo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    rank: u8,
    deadline: i64,
    seq: u64,
}

/// Multiset of tasks popped in [`QueueOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQueue {
    order: QueueOrder,
    entries: BTreeMap<QueueKey, Task>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new(order: QueueOrder) -> Self {
        Self {
            order,
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    fn key_for(&self, task: &Task) -> QueueKey {
        let seq = self.next_seq;
        match self.order {
            QueueOrder::Urgency => QueueKey {
                rank: task.priority.rank(),
                deadline: task.deadline,
                seq,
            },
            QueueOrder::Fifo => QueueKey {
                rank: 0,
                deadline: 0,
                seq,
            },
        }
    }

    /// Insert `task` behind every entry of equal or higher urgency.
    pub fn push(&mut self, task: Task) {
        let key = self.key_for(&task);
        self.next_seq += 1;
        self.entries.insert(key, task);
    }

    /// Remove and return the head of the queue.
    pub fn pop(&mut self) -> Option<Task> {
        self.entries.pop_first().map(|(_, task)| task)
    }

    pub fn peek(&self) -> Option<&Task> {
        self.entries.values().next()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.entries.values().any(|t| t.task_id == task_id)
    }

    /// Tasks in pop order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.entries.values()
    }

    /// Task ids in pop order.
    pub fn ids(&self) -> Vec<TaskId> {
        self.iter().map(|t| t.task_id).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
