//! The one-byte synchronisation pipe barrier (spec.md §4.3).
//!
//! A single anonymous, `O_CLOEXEC` pipe. The transfer of one byte across it
//! is the signal — its value is never inspected. Close-on-exec on both ends
//! means neither fd leaks into the target program once it's `exec`'d.
//!
//! Built directly on `libc::pipe2`/`read`/`write`/`close` rather than
//! `nix`'s fd wrappers: this crate's `nix` dependency is pinned for its
//! `ptrace`/`wait`/`fork` surface, and raw fd plumbing for a single barrier
//! byte is exactly the kind of small, self-contained syscall wrapper
//! `examples/defcon201-bandsocks/sand/src/nolibc.rs` reaches for directly
//! rather than through a wrapper crate.

use std::os::unix::io::RawFd;

use crate::errors::LauncherError;

/// The write half, held by the child/tracer.
pub struct BarrierWriter(RawFd);

/// The read half, held by the parent/tracee-to-be.
pub struct BarrierReader(RawFd);

/// Creates the barrier pipe. Both ends are `O_CLOEXEC`; the caller is
/// responsible for closing the end it doesn't use after `fork()` (spec.md
/// §4.3: "opposing ends are closed immediately after fork").
pub fn create() -> Result<(BarrierReader, BarrierWriter), LauncherError> {
    let mut fds: [RawFd; 2] = [-1, -1];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(LauncherError::Pipe(nix::Error::last()));
    }
    Ok((BarrierReader(fds[0]), BarrierWriter(fds[1])))
}

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

impl BarrierReader {
    /// Blocks until the writer sends the barrier byte. A short read (the
    /// writer closed its end without writing) means the child failed
    /// before completing the handshake (spec.md §4.3); the caller must
    /// abort before loading any filter.
    pub fn wait(self) -> Result<(), LauncherError> {
        let mut buf = [0u8; 1];
        let n = unsafe { libc::read(self.0, buf.as_mut_ptr() as *mut libc::c_void, 1) };
        close_fd(self.0);
        if n < 0 {
            return Err(LauncherError::Pipe(nix::Error::last()));
        }
        if n == 0 {
            return Err(LauncherError::TracerHandshakeFailed);
        }
        Ok(())
    }

    pub fn close_unused(self) {
        close_fd(self.0);
    }
}

impl BarrierWriter {
    /// Sends the one barrier byte. Called only after the child has
    /// completed `ATTACH`, the initial stop, and `SETOPTIONS` on the
    /// parent (spec.md §4.3).
    pub fn release(self) -> Result<(), LauncherError> {
        let byte = [0u8; 1];
        let n = unsafe { libc::write(self.0, byte.as_ptr() as *const libc::c_void, 1) };
        close_fd(self.0);
        if n < 0 {
            return Err(LauncherError::Pipe(nix::Error::last()));
        }
        Ok(())
    }

    pub fn close_unused(self) {
        close_fd(self.0);
    }
}
