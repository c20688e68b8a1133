/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Policy configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! io_order: priority_deadline   # or: fifo
//! ```
//!
//! Every key is optional; missing keys fall back to [`PolicyConfig::default`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

// ── I/O ordering ──────────────────────────────────────────────────────────────

/// How the I/O channel picks the next task from the I/O wait set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoOrder {
    /// Same order as the CPU ready queue: priority, then deadline, then
    /// request order.
    #[default]
    PriorityDeadline,
    /// Strict request order.
    Fifo,
}

impl IoOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            IoOrder::PriorityDeadline => "priority_deadline",
            IoOrder::Fifo => "fifo",
        }
    }
}

impl fmt::Display for IoOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name an [`IoOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown I/O order '{0}' (valid: priority_deadline, fifo)")]
pub struct UnknownIoOrder(pub String);

impl FromStr for IoOrder {
    type Err = UnknownIoOrder;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "priority_deadline" => Ok(IoOrder::PriorityDeadline),
            "fifo" => Ok(IoOrder::Fifo),
            other => Err(UnknownIoOrder(other.to_string())),
        }
    }
}

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.  Kept private – callers work
/// with [`PolicyConfig`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PolicyConfigEntry {
    #[serde(default)]
    io_order: Option<IoOrder>,
}

impl From<PolicyConfigEntry> for PolicyConfig {
    fn from(entry: PolicyConfigEntry) -> Self {
        let defaults = PolicyConfig::default();
        Self {
            io_order: entry.io_order.unwrap_or(defaults.io_order),
        }
    }
}

// ── Public configuration ──────────────────────────────────────────────────────

/// Tunables for a [`PolicyEngine`](crate::scheduler::PolicyEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyConfig {
    /// Ordering of the I/O wait set.
    pub io_order: IoOrder,
}

impl PolicyConfig {
    /// Parses a YAML document.
    ///
    /// # Errors
    /// Returns an error if the YAML is structurally invalid or names an
    /// unknown key or I/O order.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes to `()` rather than a map.
        if content.trim().is_empty() {
            debug!("Empty policy configuration, using defaults");
            return Ok(Self::default());
        }
        let entry: PolicyConfigEntry =
            serde_yaml::from_str(content).context("Failed to parse policy configuration")?;
        Ok(entry.into())
    }

    /// Reads and parses `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its YAML is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading policy configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?;

        info!(io_order = %config.io_order, "Policy configuration loaded");
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
