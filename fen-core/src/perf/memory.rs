//! Memory locking: keep the bus and hot buffers off the swap path.

use std::io;

/// Best-effort `mlockall(MCL_CURRENT | MCL_FUTURE)`. Needs privileges or a
/// generous memlock rlimit; callers log and continue on failure.
pub fn lock_memory() -> io::Result<()> {
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
