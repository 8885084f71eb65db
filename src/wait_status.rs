//! Wait-status decoding (spec.md §9: "Provide a small helper that
//! destructures a wait status ... rather than duplicating bit-shifts").
//!
//! `nix::sys::wait::WaitStatus` already does the bit-shift decoding for us;
//! this module re-projects it into the domain vocabulary spec.md §3 uses
//! for the child/tracer's view of the parent/tracee
//! (`Attaching → StoppedInitial → Running → StoppedExec → Detached`, plus
//! the terminal `Exited`/`Signalled` states), so the choreographer in
//! `tracer.rs` matches on intent rather than raw `WaitStatus` variants and
//! PTRACE_EVENT numbers.

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::abi::PTRACE_EVENT_EXEC;

/// A single `waitpid()` outcome, classified for the tracer's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceeEvent {
    /// The tracee stopped for a reason we don't specifically care about
    /// (e.g. a group-stop, or a signal-delivery-stop); the tracer should
    /// `PTRACE_CONT` and keep waiting.
    StoppedOther,
    /// The tracee is paused immediately before `execve()` returns into the
    /// target's entry point — the commit point (spec.md §4.4 step 5).
    StoppedExec,
    /// The tracee exited normally.
    Exited(i32),
    /// The tracee was terminated by a signal.
    Signalled(nix::sys::signal::Signal),
}

/// Classifies a `waitpid()` result for `pid`, matching the shape spec.md
/// §3's wait-status machine expects. Panics if `status` reports a pid other
/// than `pid`, since the choreographer only ever waits on one specific pid.
pub fn classify(pid: Pid, status: WaitStatus) -> TraceeEvent {
    match status {
        WaitStatus::Exited(got, code) => {
            debug_assert_eq!(got, pid);
            TraceeEvent::Exited(code)
        }
        WaitStatus::Signaled(got, sig, _core_dumped) => {
            debug_assert_eq!(got, pid);
            TraceeEvent::Signalled(sig)
        }
        WaitStatus::PtraceEvent(got, _sig, event) => {
            debug_assert_eq!(got, pid);
            if event == PTRACE_EVENT_EXEC {
                TraceeEvent::StoppedExec
            } else {
                TraceeEvent::StoppedOther
            }
        }
        WaitStatus::Stopped(got, _sig) => {
            debug_assert_eq!(got, pid);
            TraceeEvent::StoppedOther
        }
        _ => TraceeEvent::StoppedOther,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    fn pid() -> Pid {
        Pid::from_raw(1234)
    }

    #[test]
    fn exec_event_is_recognised() {
        let status = WaitStatus::PtraceEvent(pid(), Signal::SIGTRAP, PTRACE_EVENT_EXEC);
        assert_eq!(classify(pid(), status), TraceeEvent::StoppedExec);
    }

    #[test]
    fn other_ptrace_events_are_stopped_other() {
        let status = WaitStatus::PtraceEvent(pid(), Signal::SIGTRAP, PTRACE_EVENT_EXEC + 1);
        assert_eq!(classify(pid(), status), TraceeEvent::StoppedOther);
    }

    #[test]
    fn plain_stop_is_stopped_other() {
        let status = WaitStatus::Stopped(pid(), Signal::SIGSTOP);
        assert_eq!(classify(pid(), status), TraceeEvent::StoppedOther);
    }

    #[test]
    fn exited_is_terminal() {
        let status = WaitStatus::Exited(pid(), 0);
        assert_eq!(classify(pid(), status), TraceeEvent::Exited(0));
    }

    #[test]
    fn signalled_is_terminal() {
        let status = WaitStatus::Signaled(pid(), Signal::SIGKILL, false);
        assert_eq!(
            classify(pid(), status),
            TraceeEvent::Signalled(Signal::SIGKILL)
        );
    }
}
