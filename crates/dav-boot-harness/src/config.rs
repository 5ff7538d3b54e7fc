use std::path::PathBuf;
use std::time::Duration;

use crate::error::HarnessError;
use crate::keys::KeySequence;

pub const DEFAULT_IMAGE: &str = "build/dav-go-os.iso";
pub const DEFAULT_LOG: &str = "qemu.log";
pub const DEFAULT_EMULATOR: &str = "qemu-system-i386";
pub const DEFAULT_BOOT_MARKER: &str = "DavOS";
pub const DEFAULT_RESPONSE_MARKER: &str = "Commands:";

/// Environment variable overriding the emulator binary.
pub const EMULATOR_ENV: &str = "DAV_QEMU";

/// Everything one harness run needs.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Bootable ISO, attached as a CD-ROM.
    pub image: PathBuf,
    /// File the guest's debugcon output is written to. Deleted before launch.
    pub log_path: PathBuf,
    /// Emulator program, resolved via `PATH` when it has no separator.
    pub emulator: PathBuf,
    /// Extra arguments appended after the fixed emulator arguments.
    pub extra_args: Vec<String>,
    /// Text expected in the log once the shell prompt is up.
    pub boot_marker: String,
    pub boot_timeout: Duration,
    /// Keys typed into the guest once booted.
    pub keys: KeySequence,
    /// Text expected in the log once the typed command has run.
    pub response_marker: String,
    pub response_timeout: Duration,
    /// Delay between log polls.
    pub poll_interval: Duration,
    /// Delay after each `sendkey` command.
    pub key_interval: Duration,
}

impl HarnessConfig {
    /// Default emulator, honoring `DAV_QEMU` when set and non-empty.
    pub fn emulator_from_env() -> PathBuf {
        match std::env::var_os(EMULATOR_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_EMULATOR),
        }
    }

    /// Replaces the typed keys with `line` followed by Enter.
    pub fn with_command(mut self, line: &str) -> Result<Self, HarnessError> {
        self.keys = KeySequence::for_command(line)?;
        Ok(self)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from(DEFAULT_IMAGE),
            log_path: PathBuf::from(DEFAULT_LOG),
            emulator: Self::emulator_from_env(),
            extra_args: Vec::new(),
            boot_marker: DEFAULT_BOOT_MARKER.to_string(),
            boot_timeout: Duration::from_secs(10),
            keys: KeySequence::default(),
            response_marker: DEFAULT_RESPONSE_MARKER.to_string(),
            response_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            key_interval: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyError;

    #[test]
    fn defaults_describe_help_scenario() {
        let cfg = HarnessConfig::default();
        assert_eq!(cfg.image, PathBuf::from("build/dav-go-os.iso"));
        assert_eq!(cfg.log_path, PathBuf::from("qemu.log"));
        assert_eq!(cfg.boot_marker, "DavOS");
        assert_eq!(cfg.response_marker, "Commands:");
        assert_eq!(cfg.boot_timeout, Duration::from_secs(10));
        assert_eq!(cfg.response_timeout, Duration::from_secs(5));
        assert!(cfg.poll_interval < Duration::from_secs(1));
        assert_eq!(cfg.keys, KeySequence::default());
        assert!(cfg.extra_args.is_empty());
    }

    #[test]
    fn with_command_replaces_keys() {
        let cfg = HarnessConfig::default().with_command("echo hi").unwrap();
        assert_eq!(cfg.keys, KeySequence::for_command("echo hi").unwrap());
    }

    #[test]
    fn with_command_rejects_untypeable_text() {
        let err = HarnessConfig::default().with_command("héllo").unwrap_err();
        assert!(
            matches!(err, HarnessError::Key(KeyError::Unsupported('é'))),
            "{err}"
        );
    }
}
