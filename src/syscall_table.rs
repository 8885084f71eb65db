//! Syscall name → number resolution.
//!
//! `seccompiler` (our compiled-BPF backend, spec.md §1) compiles filters
//! from syscall *numbers*; it doesn't resolve names the way libseccomp's
//! `seccomp_syscall_resolve_name` does. Rather than hand-maintain a table of
//! `libc::SYS_*` constants (necessarily incomplete, and silently stale as
//! new syscalls like `clone3`/`openat2`/`pidfd_open` land), this module
//! defers resolution to the real `libseccomp` crate, the way
//! `examples/menchan-Rub-NexusShell/src/seccomp.rs` resolves syscall names
//! via `ScmpSyscall::from_name_in_arch` before handing a number to its own
//! filter builder.
//!
//! An unresolved name is not a bug in this table to silently patch around —
//! per spec.md §3, it is a fatal configuration error, exactly as an unknown
//! name would be to libseccomp.

use libseccomp::{ScmpArch, ScmpSyscall};

/// Resolves a syscall name to its kernel number for the current target
/// architecture, or `None` if the name is unknown to libseccomp.
pub fn resolve(name: &str) -> Option<i64> {
    ScmpSyscall::from_name_in_arch(name, ScmpArch::native())
        .ok()
        .map(|syscall| i32::from(syscall) as i64)
}
