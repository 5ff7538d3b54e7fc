#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dav_boot_harness::config::{
    DEFAULT_BOOT_MARKER, DEFAULT_IMAGE, DEFAULT_LOG, DEFAULT_RESPONSE_MARKER,
};
use dav_boot_harness::{HarnessConfig, KeySequence};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    about = "Boot a DavOS image under QEMU, type a shell command and check its output",
    long_about = "Boot a DavOS image under QEMU, type a shell command and check its output.\n\n\
        With no arguments this boots build/dav-go-os.iso, waits for the DavOS prompt on the \
        debugcon log, types `help` through the QEMU monitor and expects `Commands:` back. \
        Exits 0 on success and 1 on any failure. Set DAV_QEMU to use a different emulator."
)]
struct Args {
    /// Bootable ISO image, attached as a CD-ROM.
    #[arg(long, default_value = DEFAULT_IMAGE)]
    image: PathBuf,

    /// File receiving the guest's debugcon output (deleted before each run).
    #[arg(long, default_value = DEFAULT_LOG)]
    log: PathBuf,

    /// Emulator binary. Defaults to $DAV_QEMU or qemu-system-i386.
    #[arg(long)]
    emulator: Option<PathBuf>,

    /// Text that signals the guest shell is ready.
    #[arg(long, default_value = DEFAULT_BOOT_MARKER)]
    boot_marker: String,

    /// Text expected after the command has run.
    #[arg(long, default_value = DEFAULT_RESPONSE_MARKER)]
    response_marker: String,

    /// Shell command typed into the guest (Enter is appended).
    #[arg(long, default_value = "help")]
    command: String,

    #[arg(long, default_value_t = 10_000)]
    boot_timeout_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    response_timeout_ms: u64,

    /// Interval between debug log polls.
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Pause after each key press.
    #[arg(long, default_value_t = 100)]
    key_delay_ms: u64,

    /// Extra arguments passed to the emulator.
    #[arg(last = true)]
    extra: Vec<String>,
}

impl Args {
    fn into_config(self) -> Result<HarnessConfig> {
        let command = self.command;
        let cfg = HarnessConfig {
            image: self.image,
            log_path: self.log,
            emulator: self
                .emulator
                .unwrap_or_else(HarnessConfig::emulator_from_env),
            extra_args: self.extra,
            boot_marker: self.boot_marker,
            boot_timeout: Duration::from_millis(self.boot_timeout_ms),
            keys: KeySequence::default(),
            response_marker: self.response_marker,
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            key_interval: Duration::from_millis(self.key_delay_ms),
        };
        cfg.with_command(&command)
            .with_context(|| format!("cannot type command {command:?}"))
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cfg = Args::parse().into_config()?;
    let report = dav_boot_harness::run(&cfg).context("boot check aborted")?;
    Ok(if report.outcome.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
