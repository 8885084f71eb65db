//! Error taxonomy for the sandbox launcher (spec.md §7).
//!
//! One variant per row of the taxonomy table: configuration errors (bad
//! policy), environment errors (`unsetenv`), kernel/capability errors
//! (ptrace, seccomp), and the parent's abnormal-race detection (short read
//! on the barrier pipe). Every variant's `Display` is the single
//! human-readable line spec.md requires on stderr.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("usage: {0} PROG [ARGS]")]
    Usage(String),

    #[error("unknown syscall name: {0}")]
    UnknownSyscall(String),

    #[error("syscall name exceeds {max} bytes: {name:?}")]
    SyscallNameTooLong { name: String, max: usize },

    #[error("failed to load the seccomp filter: {0}")]
    FilterLoad(SeccompBackendError),

    #[error("failed to unset {0}: {1}")]
    UnsetEnv(&'static str, std::io::Error),

    #[error("failed to fork: {0}")]
    Fork(nix::Error),

    #[error("failed to create synchronisation pipe: {0}")]
    Pipe(nix::Error),

    #[error("failed to {operation}: {source}")]
    Ptrace {
        operation: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("failed to wait for the tracee: {0}")]
    Wait(nix::Error),

    #[error("failed to set no_new_privs: {0}")]
    NoNewPrivs(std::io::Error),

    #[error("child exited before completing the ptrace handshake")]
    TracerHandshakeFailed,

    #[error("failed to execute {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: nix::Error,
    },
}

/// Wraps `seccompiler`'s `BackendError`, which isn't `std::error::Error`
/// friendly enough to attach directly (it doesn't impl `Send + Sync` on
/// older releases), so we stringify it once at the boundary.
#[derive(Debug)]
pub struct SeccompBackendError(pub String);

impl fmt::Display for SeccompBackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SeccompBackendError {}

impl SeccompBackendError {
    pub fn from_display(e: impl fmt::Display) -> Self {
        SeccompBackendError(e.to_string())
    }
}
