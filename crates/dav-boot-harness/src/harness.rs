//! The boot → type → check scenario.
//!
//! A run is a straight line through [`Phase`]s:
//!
//! ```text
//! Launching -> AwaitBoot -> InjectInput -> AwaitResponse -> Pass
//!                  |                            |
//!                  +-----------> Fail <---------+
//! ```
//!
//! Marker timeouts end the run with [`Outcome::Fail`]. Launch and monitor write failures are
//! returned as [`HarnessError`]. Either way the emulator is killed before `run` returns.

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::injector::KeyInjector;
use crate::launcher::Emulator;
use crate::watcher::LogWatcher;

/// How much of the debug log to include in a failure report.
const LOG_TAIL_BYTES: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Launching,
    AwaitBoot,
    InjectInput,
    AwaitResponse,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Launching => "launch",
            Self::AwaitBoot => "boot",
            Self::InjectInput => "input",
            Self::AwaitResponse => "response",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail {
        phase: Phase,
        marker: String,
        timeout: Duration,
    },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    pub emulator_pid: u32,
    pub command_line: Vec<String>,
    /// Exit status collected after the emulator was killed.
    pub emulator_status: Option<ExitStatus>,
    /// End of the debug log, captured on failure.
    pub log_tail: Option<String>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Outcome::Pass => 0,
            Outcome::Fail { .. } => 1,
        }
    }

    /// Human-readable summary of the run, including diagnostics on failure.
    pub fn summary(&self) -> String {
        match &self.outcome {
            Outcome::Pass => "Test Passed: guest command produced the expected output.".to_string(),
            Outcome::Fail {
                phase,
                marker,
                timeout,
            } => {
                let mut msg = format!(
                    "ERROR: {phase} phase timed out after {timeout:?} waiting for {marker:?} in the debug log"
                );
                msg.push_str(&format!("\nemulator: {}", self.command_line.join(" ")));
                match self.log_tail.as_deref() {
                    Some(tail) if !tail.is_empty() => {
                        msg.push_str(&format!("\ndebug log (tail):\n{tail}"))
                    }
                    Some(_) => msg.push_str("\ndebug log is empty"),
                    None => msg.push_str("\ndebug log was never created"),
                }
                msg
            }
        }
    }
}

/// Runs the scenario described by `cfg`.
pub fn run(cfg: &HarnessConfig) -> Result<RunReport, HarnessError> {
    println!("==> Starting {} against {}", cfg.emulator.display(), cfg.image.display());
    enter(Phase::Launching);
    let mut emulator = Emulator::launch(cfg)?;
    let watcher = LogWatcher::new(&cfg.log_path, cfg.poll_interval);

    let outcome = drive(cfg, &mut emulator, &watcher)?;

    let log_tail = match outcome {
        Outcome::Pass => None,
        Outcome::Fail { .. } => watcher.snapshot_tail(LOG_TAIL_BYTES),
    };
    let emulator_status = match emulator.terminate() {
        Ok(status) => Some(status),
        Err(err) => {
            warn!(pid = emulator.pid(), %err, "failed to reap emulator");
            None
        }
    };

    let report = RunReport {
        outcome,
        emulator_pid: emulator.pid(),
        command_line: emulator.command_line().to_vec(),
        emulator_status,
        log_tail,
    };
    println!("{}", report.summary());
    Ok(report)
}

fn drive(
    cfg: &HarnessConfig,
    emulator: &mut Emulator,
    watcher: &LogWatcher,
) -> Result<Outcome, HarnessError> {
    enter(Phase::AwaitBoot);
    println!("Waiting for boot prompt {:?}...", cfg.boot_marker);
    let boot = watcher.wait_for(&cfg.boot_marker, cfg.boot_timeout);
    if !boot.is_found() {
        return Ok(fail(Phase::AwaitBoot, &cfg.boot_marker, cfg.boot_timeout));
    }
    info!(elapsed = ?boot.elapsed, "guest booted");
    println!("Boot successful.");

    enter(Phase::InjectInput);
    println!("Sending {} keys via the emulator monitor...", cfg.keys.len());
    let monitor = emulator.control().ok_or_else(|| {
        HarnessError::Inject(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "emulator monitor stdin is closed",
        ))
    })?;
    KeyInjector::new(monitor, cfg.key_interval)
        .send(&cfg.keys)
        .map_err(HarnessError::Inject)?;

    enter(Phase::AwaitResponse);
    println!("Waiting for command output {:?}...", cfg.response_marker);
    let response = watcher.wait_for(&cfg.response_marker, cfg.response_timeout);
    if !response.is_found() {
        return Ok(fail(
            Phase::AwaitResponse,
            &cfg.response_marker,
            cfg.response_timeout,
        ));
    }
    info!(elapsed = ?response.elapsed, "command output seen");
    Ok(Outcome::Pass)
}

fn enter(phase: Phase) {
    debug!(%phase, "entering phase");
}

fn fail(phase: Phase, marker: &str, timeout: Duration) -> Outcome {
    warn!(%phase, marker, ?timeout, "marker not found");
    Outcome::Fail {
        phase,
        marker: marker.to_string(),
        timeout,
    }
}
