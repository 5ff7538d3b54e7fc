#![forbid(unsafe_code)]

//! Boot-verification harness for DavOS images.
//!
//! The harness boots an image under QEMU, watches the guest's debugcon log for a boot marker,
//! types a shell command through the QEMU monitor (`sendkey`), then waits for the command's
//! output marker. The emulator process is always killed before [`run`] returns.

pub mod config;
pub mod error;
pub mod harness;
pub mod injector;
pub mod keys;
pub mod launcher;
pub mod watcher;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use harness::{run, Outcome, Phase, RunReport};
pub use injector::KeyInjector;
pub use keys::{Key, KeyError, KeySequence};
pub use launcher::Emulator;
pub use watcher::{LogWatcher, WaitOutcome};
