//! Emulator process launch and ownership.

use std::io;
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// A running emulator, killed and reaped when dropped.
///
/// [`Emulator::terminate`] may be called explicitly to collect the exit status; the process is
/// only ever killed once per handle.
pub struct Emulator {
    child: Child,
    command_line: Vec<String>,
    status: Option<ExitStatus>,
}

impl Emulator {
    /// Clears the stale debug log and starts the emulator against `cfg.image`.
    ///
    /// The guest's debugcon port goes to `cfg.log_path`, the QEMU monitor is bound to the
    /// child's stdio, and no display is opened. On Unix the child gets its own process group so
    /// terminal signals aimed at the harness don't reach it.
    pub fn launch(cfg: &HarnessConfig) -> Result<Self, HarnessError> {
        remove_stale_log(&cfg.log_path)?;

        if !cfg.image.is_file() {
            return Err(HarnessError::MissingImage(cfg.image.clone()));
        }

        let args = emulator_args(cfg);
        let program = cfg.emulator.display().to_string();
        let mut command_line = Vec::with_capacity(1 + args.len());
        command_line.push(program.clone());
        command_line.extend(args.iter().cloned());

        let mut cmd = Command::new(&cfg.emulator);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = spawn_with_retry(&mut cmd).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => HarnessError::EmulatorNotFound(program.clone()),
            _ => HarnessError::Launch {
                program: program.clone(),
                source,
            },
        })?;

        info!(pid = child.id(), cmdline = %command_line.join(" "), "emulator started");

        Ok(Self {
            child,
            command_line,
            status: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Program and arguments the emulator was started with.
    pub fn command_line(&self) -> &[String] {
        &self.command_line
    }

    /// The monitor's input stream. `None` once the emulator has been terminated.
    pub fn control(&mut self) -> Option<&mut ChildStdin> {
        self.child.stdin.as_mut()
    }

    pub fn stdout(&mut self) -> Option<&mut ChildStdout> {
        self.child.stdout.as_mut()
    }

    pub fn stderr(&mut self) -> Option<&mut ChildStderr> {
        self.child.stderr.as_mut()
    }

    pub fn is_running(&mut self) -> bool {
        self.status.is_none() && matches!(self.child.try_wait(), Ok(None))
    }

    /// Kills the emulator (if it is still alive) and reaps it.
    pub fn terminate(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        if self.child.try_wait()?.is_none() {
            match self.child.kill() {
                Ok(()) => {}
                // Exited between `try_wait` and `kill`.
                Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
                Err(err) => return Err(err),
            }
        }
        let status = self.child.wait()?;
        debug!(pid = self.child.id(), %status, "emulator terminated");
        self.status = Some(status);
        Ok(status)
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        if self.status.is_none() {
            if let Err(err) = self.terminate() {
                warn!(pid = self.child.id(), %err, "failed to terminate emulator");
            }
        }
    }
}

fn spawn_with_retry(cmd: &mut Command) -> io::Result<Child> {
    let mut attempts = 0u32;
    loop {
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            Err(err) => {
                // A freshly written emulator wrapper script can briefly fail with `ETXTBUSY`
                // ("Text file busy") while another thread still holds it open for writing.
                #[cfg(unix)]
                let should_retry = err.raw_os_error() == Some(26);
                #[cfg(not(unix))]
                let should_retry = false;

                if should_retry && attempts < 3 {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(10 * attempts as u64));
                    continue;
                }
                return Err(err);
            }
        }
    }
}

fn remove_stale_log(path: &Path) -> Result<(), HarnessError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale debug log");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(HarnessError::StaleLog {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn emulator_args(cfg: &HarnessConfig) -> Vec<String> {
    let mut args = vec![
        "-cdrom".to_string(),
        cfg.image.display().to_string(),
        "-debugcon".to_string(),
        format!("file:{}", cfg.log_path.display()),
        "-monitor".to_string(),
        "stdio".to_string(),
        "-display".to_string(),
        "none".to_string(),
        "-nographic".to_string(),
    ];
    args.extend(cfg.extra_args.iter().cloned());
    args
}
