use std::io;
use std::path::PathBuf;

use crate::keys::KeyError;

/// Fatal harness errors.
///
/// Marker timeouts are not errors; they are reported through [`crate::Outcome::Fail`].
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("boot image not found: {}", .0.display())]
    MissingImage(PathBuf),
    #[error("failed to remove stale debug log {}: {source}", path.display())]
    StaleLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing required command: {0} (install QEMU or set DAV_QEMU=...)")]
    EmulatorNotFound(String),
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write to emulator monitor: {0}")]
    Inject(#[source] io::Error),
    #[error("invalid key sequence: {0}")]
    Key(#[from] KeyError),
}
