//! Raw kernel constants that neither `libc` nor `nix` expose.
//!
//! `nix::sys::ptrace::Options` does not model `PTRACE_O_SUSPEND_SECCOMP`
//! (it's a less common option, gated behind `CONFIG_CHECKPOINT_RESTORE` on
//! some kernels), and `PR_SET_PTRACER` is Yama-LSM-specific and was never a
//! `libc` constant at all. Both are well-documented, stable values from
//! `linux/ptrace.h` and `linux/prctl.h`, so we declare them here rather than
//! pull in a third crate for two integers.

use libc::{c_int, c_ulong};

/// Stop the tracee right before `execve()` returns into the new image.
pub const PTRACE_O_TRACEEXEC: c_int = 0x0000_0010;

/// Kill the tracee if the tracer exits without detaching first.
pub const PTRACE_O_EXITKILL: c_int = 0x0010_0000;

/// While set by a `CAP_SYS_ADMIN` tracer, seccomp enforcement is suspended
/// in the tracee even though a filter may already be loaded.
pub const PTRACE_O_SUSPEND_SECCOMP: c_int = 0x0020_0000;

/// `status >> 8` of a ptrace-stop caused by `PTRACE_EVENT_EXEC`.
pub const PTRACE_EVENT_EXEC: c_int = 4;

/// `prctl(2)`: nominate a process that may `PTRACE_ATTACH` to us regardless
/// of the Yama LSM's default "only real parents may trace" policy.
pub const PR_SET_PTRACER: c_int = 0x5961_6d61;

/// Sentinel for `PR_SET_PTRACER` meaning "any process may trace me."
#[allow(dead_code)]
pub const PR_SET_PTRACER_ANY: c_ulong = c_ulong::MAX;
