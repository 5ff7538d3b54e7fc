#![allow(dead_code)]

//! A stand-in for `qemu-system-i386` that honours just enough of the command line for the boot
//! harness: it finds the `-debugcon file:<path>` argument, plays a DavOS guest by appending to
//! that file, and treats stdin as the QEMU monitor, accumulating `sendkey` commands into a line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dav_boot_harness::HarnessConfig;
use tempfile::TempDir;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guest {
    /// Prints the prompt and answers `help`.
    Healthy,
    /// Never writes to the debug log.
    NeverBoots,
    /// Boots, but ignores all keyboard input.
    IgnoresInput,
    /// Closes the monitor, prints the prompt and exits.
    ExitsAfterBoot,
}

pub struct FakeQemu {
    dir: TempDir,
    script: PathBuf,
}

impl FakeQemu {
    pub fn new(guest: Guest) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("dav-fake-qemu-")
            .tempdir()
            .context("create temp dir for fake QEMU")?;
        let script = dir.path().join("qemu-system-i386");
        write_executable(&script, &render_script(guest, dir.path()))?;
        fs::write(dir.path().join("dav-go-os.iso"), b"").context("write fake ISO")?;
        Ok(Self { dir, script })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("qemu.log")
    }

    /// Harness config pointed at this fake, with short timeouts.
    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            image: self.dir.path().join("dav-go-os.iso"),
            log_path: self.log_path(),
            emulator: self.script.clone(),
            boot_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(25),
            key_interval: Duration::from_millis(5),
            ..HarnessConfig::default()
        }
    }

    /// Monitor commands received so far, one per line.
    pub fn monitor_commands(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("monitor.txt"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Pid the fake recorded for itself on startup.
    pub fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(self.dir.path().join("pid.txt"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

/// Everything in the script is a shell builtin so the fake never forks; killing it leaves nothing
/// behind holding the pipes.
fn render_script(guest: Guest, dir: &Path) -> String {
    let boot = match guest {
        Guest::NeverBoots => ":",
        Guest::Healthy | Guest::IgnoresInput => r#"printf 'DavOS v0.1\n> ' >> "$log""#,
        // The monitor is closed before the prompt appears, so every `sendkey` hits EPIPE.
        Guest::ExitsAfterBoot => r#"exec 0<&-; printf 'DavOS v0.1\n> ' >> "$log"; exit 0"#,
    };
    let respond = match guest {
        Guest::Healthy => {
            r#"if [ "$line" = "help" ]; then printf 'help\nCommands: help, clear, echo, ticks, mem\n> ' >> "$log"; fi"#
        }
        Guest::NeverBoots | Guest::IgnoresInput | Guest::ExitsAfterBoot => ":",
    };

    format!(
        r#"#!/bin/sh
state="{dir}"
echo $$ > "$state/pid.txt"
log=""
while [ $# -gt 0 ]; do
    case "$1" in
        -debugcon) shift; log="${{1#file:}}" ;;
    esac
    shift
done
{boot}
line=""
while IFS= read -r cmd; do
    echo "$cmd" >> "$state/monitor.txt"
    case "$cmd" in
        "sendkey ret") {respond}; line="" ;;
        "sendkey spc") line="$line " ;;
        "sendkey "*) line="$line${{cmd#sendkey }}" ;;
    esac
done
"#,
        dir = dir.display(),
    )
}

fn write_executable(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {}", path.display()))?;
    }
    Ok(())
}

/// Whether `pid` still names a process (including an unreaped zombie).
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    // SAFETY: signal 0 performs only the existence/permission check.
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}
