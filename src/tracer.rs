//! The ptrace choreographer (spec.md §4.4): the state machine run by the
//! child/tracer process. The parent/tracee's role in it is passive — it
//! only ever executes syscalls the tracer has arranged to have observed or
//! suspended.
//!
//! Grounded on spec.md §4.4 directly and on the ptrace call sequence in
//! `examples/original_source/sandboxify.c`, with tracer and tracee roles
//! inverted per spec.md §2 (here the *child* attaches to its own real
//! *parent*, relying on the Linux-documented behavior that a ptrace tracer
//! may `waitpid()` on a tracee's ptrace-stops even when it is not that
//! tracee's real parent).

use nix::sys::ptrace;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;

use crate::abi;
use crate::errors::LauncherError;
use crate::sync_pipe::BarrierWriter;
use crate::wait_status::{classify, TraceeEvent};

/// Runs the full tracer choreography against `tracee` (the real parent of
/// this process), releasing `barrier` once the tracee is safe to proceed
/// into `prctl(NO_NEW_PRIVS) → setup_seccomp_filter() → execvp()`.
///
/// Returns once the tracee either reaches the exec-stop and is detached
/// (the normal, successful path) or exits/is signalled before getting
/// there (the tracer's job is done either way — spec.md §4.4 step 5).
pub fn run(tracee: Pid, barrier: BarrierWriter) -> Result<(), LauncherError> {
    unsafe {
        // If the tracee dies before we detach, the kernel kills us too —
        // we'd otherwise be a dangling tracer with no one to supervise.
        libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
    }

    attach(tracee)?;
    wait_for_initial_stop(tracee)?;
    set_options(
        tracee,
        abi::PTRACE_O_TRACEEXEC | abi::PTRACE_O_SUSPEND_SECCOMP | abi::PTRACE_O_EXITKILL,
    )?;

    // The initial stop left the tracee suspended; it must be resumed before
    // the barrier is released or the tracee blocks forever on a process
    // that's still ptrace-stopped (sandboxify.c's first loop iteration
    // reuses the pre-loop status to issue this same PTRACE_CONT).
    ptrace::cont(tracee, None).map_err(|source| LauncherError::Ptrace {
        operation: "resume the parent process after the initial stop",
        source,
    })?;

    // From here on, any failure is either harmless (EXITKILL already
    // cleared, tracee already detached) or fatal to the tracee via
    // EXITKILL — we don't need to close the pipe specially on error paths
    // below, `BarrierWriter::release`/`close_unused` always closes the fd.
    barrier.release()?;

    wait_for_exec_stop(tracee)?;

    // Clearing SUSPEND_SECCOMP here is what activates the filter the
    // tracee loaded while it was suspended; dropping EXITKILL means we may
    // now exit without taking the tracee down with us.
    set_options(tracee, abi::PTRACE_O_TRACEEXEC)?;
    detach(tracee)?;

    Ok(())
}

fn attach(tracee: Pid) -> Result<(), LauncherError> {
    ptrace::attach(tracee).map_err(|source| LauncherError::Ptrace {
        operation: "attach to the parent process",
        source,
    })
}

fn wait_for_initial_stop(tracee: Pid) -> Result<(), LauncherError> {
    let status = waitpid(tracee, None).map_err(LauncherError::Wait)?;
    match classify(tracee, status) {
        TraceeEvent::StoppedOther | TraceeEvent::StoppedExec => Ok(()),
        TraceeEvent::Exited(code) => {
            tracing::warn!(code, "parent exited before the initial ptrace stop");
            Err(LauncherError::TracerHandshakeFailed)
        }
        TraceeEvent::Signalled(sig) => {
            tracing::warn!(?sig, "parent was signalled before the initial ptrace stop");
            Err(LauncherError::TracerHandshakeFailed)
        }
    }
}

fn set_options(tracee: Pid, options: libc::c_int) -> Result<(), LauncherError> {
    let rc = unsafe {
        libc::ptrace(
            libc::PTRACE_SETOPTIONS,
            tracee.as_raw(),
            std::ptr::null_mut::<libc::c_void>(),
            options as *mut libc::c_void,
        )
    };
    if rc == -1 {
        return Err(LauncherError::Ptrace {
            operation: "set ptrace options on the parent process",
            source: nix::Error::last(),
        });
    }
    Ok(())
}

fn detach(tracee: Pid) -> Result<(), LauncherError> {
    ptrace::detach(tracee, None).map_err(|source| LauncherError::Ptrace {
        operation: "detach from the parent process",
        source,
    })
}

/// Loops on `waitpid(tracee)` until either the tracee reaches the
/// exec-event stop (spec.md §4.4 step 5) or terminates beforehand.
fn wait_for_exec_stop(tracee: Pid) -> Result<(), LauncherError> {
    loop {
        let status = waitpid(tracee, None).map_err(LauncherError::Wait)?;
        match classify(tracee, status) {
            TraceeEvent::StoppedExec => return Ok(()),
            TraceeEvent::StoppedOther => {
                ptrace::cont(tracee, None).map_err(|source| LauncherError::Ptrace {
                    operation: "resume the parent process",
                    source,
                })?;
            }
            TraceeEvent::Exited(code) => {
                tracing::info!(code, "parent exited before reaching the target program");
                return Ok(());
            }
            TraceeEvent::Signalled(sig) => {
                tracing::info!(?sig, "parent was signalled before reaching the target program");
                return Ok(());
            }
        }
    }
}
