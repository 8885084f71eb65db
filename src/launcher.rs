//! Top-level orchestration (spec.md §2 and §6): validates arguments, parses
//! the policy, forks the tracer, and drives each side of the choreography.
//!
//! Grounded on `examples/original_source/sandboxify.c`'s `main()` for the
//! overall sequence of operations, reordered so the *original* process
//! (the one the shell invoked) stays the "Parent (target)" and the newly
//! forked process becomes the "Child (installer/tracer)" (spec.md §2).

use std::ffi::CString;

use nix::unistd::{execvp, fork, getppid, ForkResult, Pid};

use crate::errors::LauncherError;
use crate::policy::{self, Policy};
use crate::seccomp;
use crate::sync_pipe;
use crate::tracer;

/// Runs the launcher: `args` is `argv` exactly as received (including
/// `argv[0]`). Returns `Ok(())` only when this process is the tracer and
/// it completed its choreography and exited cleanly; the process that
/// becomes the target never returns from this function on success, because
/// `execvp` replaces its image.
pub fn run(args: &[String]) -> Result<(), LauncherError> {
    let prog_name = basename(args.first().map(String::as_str).unwrap_or("sandbox"));
    let target_args = &args[1..];

    if target_args.is_empty() {
        return Err(LauncherError::Usage(prog_name));
    }

    let policy = Policy::from_env(&policy::ProcessEnv)?;
    let (reader, writer) = sync_pipe::create()?;

    match unsafe { fork() }.map_err(LauncherError::Fork)? {
        ForkResult::Child => {
            // This process is spec.md's "Child (installer/tracer)": it
            // never execs anything and always exits through this path.
            reader.close_unused();
            let parent = getppid();
            let outcome = tracer::run(parent, writer);
            match outcome {
                Ok(()) => std::process::exit(0),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        ForkResult::Parent { child } => {
            writer.close_unused();
            run_as_tracee(child, policy, reader, target_args)
        }
    }
}

/// This process's role is spec.md's "Parent (target)": it nominates the
/// tracer via Yama's `PR_SET_PTRACER`, waits for the barrier, installs the
/// filter, strips the policy environment variables, and `execvp`s into the
/// target — never returning on success.
fn run_as_tracee(
    tracer_pid: Pid,
    policy: Policy,
    barrier: sync_pipe::BarrierReader,
    target_args: &[String],
) -> Result<(), LauncherError> {
    nominate_ptracer(tracer_pid);

    // Must not move prctl(NO_NEW_PRIVS) before this read: it has to happen
    // after SUSPEND_SECCOMP is in effect, so failures during
    // privilege-lowering are diagnosable rather than silently filtered
    // (spec.md §9 "Subtle ordering requirement").
    barrier.wait()?;

    set_no_new_privs()?;

    if !policy.is_disabled() {
        seccomp::build_and_load(&policy)?;
    }

    policy::clear_env_vars()?;

    exec_target(target_args)
}

/// Mitigates the Yama LSM's default "only real parents may trace" policy
/// so the child can `PTRACE_ATTACH` to us even though it is our real
/// *child*, not the other way around (spec.md §4.4 step 1). `EINVAL` means
/// Yama isn't loaded at all and is tolerated; anything else would be fatal
/// in the original design, but since this call only ever *relaxes* a
/// restriction we might not even be subject to, we log and continue rather
/// than abort the whole launch over it.
fn nominate_ptracer(tracer_pid: Pid) {
    let rc = unsafe {
        libc::prctl(
            crate::abi::PR_SET_PTRACER,
            tracer_pid.as_raw() as libc::c_ulong,
            0,
            0,
            0,
        )
    };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINVAL) {
            tracing::debug!("PR_SET_PTRACER returned EINVAL; Yama LSM not present");
        } else {
            tracing::warn!(%err, "PR_SET_PTRACER failed; ptrace attach may be rejected by Yama");
        }
    }
}

fn set_no_new_privs() -> Result<(), LauncherError> {
    let rc = unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) };
    if rc != 0 {
        return Err(LauncherError::NoNewPrivs(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn exec_target(target_args: &[String]) -> Result<(), LauncherError> {
    let program = target_args[0].clone();
    let cstr_args: Vec<CString> = target_args
        .iter()
        .map(|a| CString::new(a.as_str()).expect("argument contains interior NUL"))
        .collect();

    let err = execvp(&cstr_args[0], &cstr_args).expect_err("execvp only returns on failure");
    Err(LauncherError::Exec {
        program,
        source: err,
    })
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}
