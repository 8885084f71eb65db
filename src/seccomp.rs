//! Filter builder (spec.md §4.2) and the scoped seccomp context spec.md §9
//! asks for in place of the original's manual `seccomp_release` on every
//! exit path.
//!
//! Grounded on `examples/malcolmxsc-neurovisor/src/security/seccomp.rs`'s
//! `FirecrackerSeccomp`, which already wraps `seccompiler` the same way
//! (build a rule set, compile to `BpfProgram`, `apply_filter`); this module
//! generalizes it from a fixed Firecracker allow-list to an arbitrary
//! allow/deny policy, and gives it a `Drop` impl so the context is released
//! on every exit path — including early returns and panics — without a
//! manual `release()` call at each one.

use seccompiler::{BpfProgram, SeccompAction, SeccompFilter, SeccompRule, TargetArch};
use std::collections::BTreeMap;
use std::convert::TryInto;

use crate::errors::{LauncherError, SeccompBackendError};
use crate::policy::{Mode, Policy, ViolationAction};
use crate::syscall_table;

/// An owned, scoped seccomp filter-in-progress: a default action plus
/// accumulated per-syscall rules, released (logged) on every exit path via
/// `Drop` rather than a fallible manual call (spec.md §9 "Scoped seccomp
/// context").
///
/// Resolved syscall numbers are kept in an ordered `Vec`, duplicates and
/// all, mirroring spec.md §4.1's "order of names is preserved; duplicates
/// are accepted and each becomes an independent rule (the BPF library
/// deduplicates)" — the dedup itself happens only once we fold this list
/// into the `BTreeMap` `seccompiler::SeccompFilter` actually wants, at
/// `load()` time. Each per-syscall entry is an *empty* rule vector, which
/// is `seccompiler`'s idiom for "match this syscall unconditionally" (no
/// argument filters) — see `examples/malcolmxsc-neurovisor/src/security/
/// seccomp.rs`'s `build()`.
pub struct SeccompContext {
    default_action: SeccompAction,
    syscall_action: SeccompAction,
    resolved: Vec<(String, i64)>,
    loaded: bool,
}

impl SeccompContext {
    pub fn new(default_action: SeccompAction, syscall_action: SeccompAction) -> Self {
        SeccompContext {
            default_action,
            syscall_action,
            resolved: Vec::new(),
            loaded: false,
        }
    }

    /// Resolves `name` and adds an exact-match rule for it with no
    /// argument filters (spec.md §4.2 step 3), logging one line naming the
    /// syscall (step 4).
    pub fn add_rule(&mut self, name: &str) -> Result<(), LauncherError> {
        let nr = syscall_table::resolve(name)
            .ok_or_else(|| LauncherError::UnknownSyscall(name.to_string()))?;
        self.resolved.push((name.to_string(), nr));
        eprintln!("adding {name} to the process seccomp filter");
        tracing::debug!(syscall = name, nr, "seccomp rule added");
        Ok(())
    }

    /// Compiles the accumulated rules to BPF and loads them into the
    /// current process (spec.md §4.2 step 5).
    pub fn load(&mut self) -> Result<(), LauncherError> {
        let arch: TargetArch = std::env::consts::ARCH
            .try_into()
            .map_err(|e: seccompiler::BackendError| {
                LauncherError::FilterLoad(SeccompBackendError::from_display(e))
            })?;

        let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
        for (_, nr) in &self.resolved {
            rules.entry(*nr).or_insert_with(Vec::new);
        }

        let filter = SeccompFilter::new(
            rules,
            self.default_action.clone(),
            self.syscall_action.clone(),
            arch,
        )
        .map_err(|e| LauncherError::FilterLoad(SeccompBackendError::from_display(e)))?;

        let bpf_prog: BpfProgram = filter
            .try_into()
            .map_err(|e: seccompiler::BackendError| {
                LauncherError::FilterLoad(SeccompBackendError::from_display(e))
            })?;

        seccompiler::apply_filter(&bpf_prog)
            .map_err(|e| LauncherError::FilterLoad(SeccompBackendError::from_display(e)))?;

        self.loaded = true;
        Ok(())
    }
}

impl Drop for SeccompContext {
    fn drop(&mut self) {
        tracing::trace!(
            loaded = self.loaded,
            rules = self.resolved.len(),
            "releasing seccomp context"
        );
    }
}

/// Builds and loads a seccomp filter for a non-disabled policy (spec.md
/// §4.2). Returns `Ok(())` once the filter is live in the current process;
/// any error means no partial filter was installed (the context is
/// dropped, and `seccompiler` never partially applies a filter — it's
/// build-then-apply, not incremental).
pub fn build_and_load(policy: &Policy) -> Result<(), LauncherError> {
    debug_assert!(!policy.is_disabled(), "caller must skip disabled policies");

    let (default_action, syscall_action) = match policy.mode {
        Mode::AllowList => (
            violation_to_action(policy.violation_action),
            SeccompAction::Allow,
        ),
        Mode::DenyList => (
            SeccompAction::Allow,
            violation_to_action(policy.violation_action),
        ),
        Mode::Disabled => unreachable!(),
    };

    let mut ctx = SeccompContext::new(default_action, syscall_action);
    for name in &policy.syscalls {
        ctx.add_rule(name)?;
    }
    ctx.load()
}

fn violation_to_action(action: ViolationAction) -> SeccompAction {
    match action {
        ViolationAction::KillProcess => SeccompAction::KillProcess,
        ViolationAction::LogOnly => SeccompAction::Log,
    }
}
