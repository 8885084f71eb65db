//! Sandbox launcher CLI entry point.
//!
//! ```bash
//! SECCOMP_SYSCALL_ALLOW=read:write:exit_group:brk sandbox /bin/echo hi
//! ```
//!
//! All of the actual work happens in [`seccomp_sandbox::launcher::run`]; this
//! binary only wires up logging and turns a returned [`LauncherError`] into a
//! process exit code, the way `examples/malcolmxsc-neurovisor/src/main.rs`
//! turns its own top-level errors into a non-zero exit rather than panicking.

use seccomp_sandbox::errors::LauncherError;
use seccomp_sandbox::launcher;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if let Err(err) = launcher::run(&args) {
        eprintln!("{err}");
        std::process::exit(exit_code(&err));
    }
}

/// Usage errors get the conventional `2`; everything else is a plain `1`
/// (spec.md §7 doesn't distinguish further on the wire, only in the message).
fn exit_code(err: &LauncherError) -> i32 {
    match err {
        LauncherError::Usage(_) => 2,
        _ => 1,
    }
}
