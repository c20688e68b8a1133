/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use cpuio_policy::config::{IoOrder, PolicyConfig};
use cpuio_policy::trace::{self, Trace};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Replay an event trace through the CPU / I/O scheduling policy.
///
/// Example:
///   cpuio-policy --trace traces/io_round_trip.yaml --io-order fifo
#[derive(Debug, Parser)]
#[command(
    name = "cpuio-policy",
    about = "CPU / I/O dual-resource scheduling policy – trace replay",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML event trace.
    #[arg(short = 't', long = "trace")]
    trace: PathBuf,

    /// Path to a YAML policy configuration; replaces the trace's `config`.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// I/O wait-set ordering (priority_deadline | fifo); overrides any file.
    #[arg(short = 'o', long = "io-order")]
    io_order: Option<IoOrder>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        trace    = %cli.trace.display(),
        config   = ?cli.config,
        io_order = ?cli.io_order,
        "Configuration"
    );

    // ── Load trace ────────────────────────────────────────────────────────────
    let trace = match Trace::load_from_file(&cli.trace) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load trace: {:#}", e);
            process::exit(1);
        }
    };

    // ── Resolve policy configuration ──────────────────────────────────────────
    let mut config = trace.config;
    if let Some(path) = &cli.config {
        config = match PolicyConfig::load_from_file(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load policy configuration: {:#}", e);
                process::exit(1);
            }
        };
    }
    if let Some(order) = cli.io_order {
        config.io_order = order;
    }

    // ── Replay ────────────────────────────────────────────────────────────────
    let outcomes = trace::replay_with(&trace, config);

    let mut failed = 0usize;
    for outcome in &outcomes {
        info!(
            step = outcome.index,
            action = %outcome.decision.action,
            anomalies = outcome.decision.anomalies.len(),
            "step"
        );
        if !outcome.matches_expectation() {
            failed += 1;
        }
    }

    info!(
        steps = outcomes.len(),
        anomalies = outcomes.iter().map(|o| o.decision.anomalies.len()).sum::<usize>(),
        failed_expectations = failed,
        "Replay complete"
    );

    if failed > 0 {
        warn!("{} step(s) did not match their expected action", failed);
        process::exit(1);
    }
}
