use std::io::{self, Write};
use std::time::Duration;

use tracing::trace;

use crate::keys::KeySequence;

/// Types keys into the guest through the QEMU monitor.
///
/// Each key becomes one `sendkey <id>` monitor command, flushed on its own and followed by a
/// short pause so the guest's keyboard handler keeps up. Nothing is read back; whether the keys
/// arrived is judged later from the debug log.
pub struct KeyInjector<W: Write> {
    monitor: W,
    key_interval: Duration,
}

impl<W: Write> KeyInjector<W> {
    pub fn new(monitor: W, key_interval: Duration) -> Self {
        Self {
            monitor,
            key_interval,
        }
    }

    pub fn send(&mut self, keys: &KeySequence) -> io::Result<()> {
        for key in keys {
            trace!(%key, "sendkey");
            writeln!(self.monitor, "sendkey {key}")?;
            self.monitor.flush()?;
            if !self.key_interval.is_zero() {
                std::thread::sleep(self.key_interval);
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.monitor
    }
}
