// Ports - Interface definitions (contracts)

use crate::domain::command::ControlCommand;
use crate::error::PlayerResult;

/// Write side of a running player.
///
/// The facade drives the player exclusively through this seam, so its
/// bookkeeping can be exercised against a recording implementation without
/// spawning a process.
pub trait PlayerControl: Send {
    /// Deliver one control byte; `false` means the player did not get it
    fn write(&mut self, command: ControlCommand) -> bool;

    /// Quit, then force the process down if needed. Idempotent.
    fn terminate(&mut self) -> PlayerResult<()>;

    /// Whether the process is still running
    fn is_alive(&mut self) -> bool;
}

impl<T: PlayerControl + ?Sized> PlayerControl for Box<T> {
    fn write(&mut self, command: ControlCommand) -> bool {
        (**self).write(command)
    }

    fn terminate(&mut self) -> PlayerResult<()> {
        (**self).terminate()
    }

    fn is_alive(&mut self) -> bool {
        (**self).is_alive()
    }
}
