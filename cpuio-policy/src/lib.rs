/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! cpuio-policy – CPU / I/O dual-resource scheduling policy
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task/           – Task, Event and Action records
//! ├── config/         – YAML policy configuration (I/O ordering)
//! ├── scheduler/      – PolicyEngine, ready queue, anomalies, invariants
//! └── trace/          – YAML event traces and replay
//! ```

pub mod config;
pub mod scheduler;
pub mod task;
pub mod trace;
