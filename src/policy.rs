//! Policy parser (spec.md §4.1).
//!
//! `Policy::from_env` is a pure function of an [`EnvSource`] snapshot, never
//! of live process state directly — spec.md §9's "Environment as
//! read-through config" design note. Real process environment is only ever
//! touched by [`ProcessEnv`] (reading) and [`clear_env_vars`] (the later,
//! explicit removal step), so the parsing logic itself is trivially
//! testable against a fake `EnvSource`.

use crate::errors::LauncherError;

/// Maximum length, in bytes, of a single syscall name (mirrors
/// `SYSCALL_NAME_MAX_LEN` in `examples/original_source/sandbox.c`, which
/// reserves 128 bytes for a name up to 127 bytes plus a NUL terminator).
pub const MAX_SYSCALL_NAME_LEN: usize = 127;

pub const VAR_DEFAULT_ACTION: &str = "SECCOMP_DEFAULT_ACTION";
pub const VAR_SYSCALL_ALLOW: &str = "SECCOMP_SYSCALL_ALLOW";
pub const VAR_SYSCALL_DENY: &str = "SECCOMP_SYSCALL_DENY";

const POLICY_VARS: [&str; 3] = [VAR_DEFAULT_ACTION, VAR_SYSCALL_ALLOW, VAR_SYSCALL_DENY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    AllowList,
    DenyList,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationAction {
    KillProcess,
    LogOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub mode: Mode,
    pub syscalls: Vec<String>,
    pub violation_action: ViolationAction,
}

/// A source of environment variables, abstracted so the parser can be
/// exercised without mutating real process environment.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads directly from this process's real environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Policy {
    /// Parses the three policy environment variables into a `Policy`
    /// (spec.md §4.1 table). Does not touch the real environment beyond
    /// what `env` chooses to expose, and never mutates it.
    pub fn from_env(env: &impl EnvSource) -> Result<Policy, LauncherError> {
        let violation_action = match env.get(VAR_DEFAULT_ACTION) {
            Some(v) if v.starts_with("log") => ViolationAction::LogOnly,
            _ => ViolationAction::KillProcess,
        };

        let (mode, raw_list) = if let Some(list) = env.get(VAR_SYSCALL_ALLOW) {
            (Mode::AllowList, Some(list))
        } else if let Some(list) = env.get(VAR_SYSCALL_DENY) {
            (Mode::DenyList, Some(list))
        } else {
            (Mode::Disabled, None)
        };

        let syscalls = match raw_list {
            Some(list) => parse_syscall_list(&list)?,
            None => Vec::new(),
        };

        Ok(Policy {
            mode,
            syscalls,
            violation_action,
        })
    }

    pub fn is_disabled(&self) -> bool {
        self.mode == Mode::Disabled
    }
}

/// Splits a colon-separated syscall list, silently skipping empty fields
/// (leading/trailing/doubled `:`), preserving order and duplicates
/// (spec.md §4.1 "Parsing of the syscall list").
fn parse_syscall_list(list: &str) -> Result<Vec<String>, LauncherError> {
    let mut names = Vec::new();
    for field in list.split(':') {
        if field.is_empty() {
            continue;
        }
        if field.len() > MAX_SYSCALL_NAME_LEN {
            return Err(LauncherError::SyscallNameTooLong {
                name: field.to_string(),
                max: MAX_SYSCALL_NAME_LEN,
            });
        }
        names.push(field.to_string());
    }
    Ok(names)
}

/// Removes the three policy variables from the real process environment
/// (spec.md §4.1: "must be removed ... before the target program runs").
/// `std::env::remove_var` on modern Rust cannot itself report failure the
/// way POSIX `unsetenv(3)` can, but we keep the per-variable error shape
/// from `examples/original_source/sandbox.c` so a future, more defensive
/// implementation (e.g. calling `libc::unsetenv` directly and checking its
/// return value) can slot in without changing the call site.
pub fn clear_env_vars() -> Result<(), LauncherError> {
    for var in POLICY_VARS {
        unsafe {
            let cstr = std::ffi::CString::new(var).expect("env var name has no interior NUL");
            if libc::unsetenv(cstr.as_ptr()) != 0 {
                return Err(LauncherError::UnsetEnv(var, std::io::Error::last_os_error()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeEnv(HashMap<String, String>);

    impl EnvSource for FakeEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    fn fake(pairs: &[(&str, &str)]) -> FakeEnv {
        FakeEnv(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn disabled_when_neither_list_set() {
        let policy = Policy::from_env(&fake(&[])).unwrap();
        assert_eq!(policy.mode, Mode::Disabled);
        assert!(policy.syscalls.is_empty());
        assert!(policy.is_disabled());
    }

    #[test]
    fn allow_list_wins_over_deny_list() {
        let policy = Policy::from_env(&fake(&[
            (VAR_SYSCALL_ALLOW, "read"),
            (VAR_SYSCALL_DENY, "read"),
        ]))
        .unwrap();
        assert_eq!(policy.mode, Mode::AllowList);
        assert_eq!(policy.syscalls, vec!["read".to_string()]);
    }

    #[test]
    fn deny_list_used_only_without_allow_list() {
        let policy = Policy::from_env(&fake(&[(VAR_SYSCALL_DENY, "write")])).unwrap();
        assert_eq!(policy.mode, Mode::DenyList);
        assert_eq!(policy.syscalls, vec!["write".to_string()]);
    }

    #[test]
    fn empty_fields_are_skipped_and_order_preserved() {
        let policy = Policy::from_env(&fake(&[(VAR_SYSCALL_ALLOW, "a::b:")])).unwrap();
        assert_eq!(
            policy.syscalls,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn duplicates_are_preserved_as_independent_entries() {
        let policy = Policy::from_env(&fake(&[(VAR_SYSCALL_ALLOW, "read:read")])).unwrap();
        assert_eq!(
            policy.syscalls,
            vec!["read".to_string(), "read".to_string()]
        );
    }

    #[test]
    fn empty_allow_list_yields_zero_rules_but_allow_mode() {
        let policy = Policy::from_env(&fake(&[(VAR_SYSCALL_ALLOW, "")])).unwrap();
        assert_eq!(policy.mode, Mode::AllowList);
        assert!(policy.syscalls.is_empty());

        let policy = Policy::from_env(&fake(&[(VAR_SYSCALL_ALLOW, ":")])).unwrap();
        assert_eq!(policy.mode, Mode::AllowList);
        assert!(policy.syscalls.is_empty());
    }

    #[test]
    fn over_length_name_is_fatal() {
        let long_name = "a".repeat(MAX_SYSCALL_NAME_LEN + 1);
        let err = Policy::from_env(&fake(&[(VAR_SYSCALL_ALLOW, &long_name)])).unwrap_err();
        assert!(matches!(err, LauncherError::SyscallNameTooLong { .. }));
    }

    #[test]
    fn max_length_name_is_accepted() {
        let name = "a".repeat(MAX_SYSCALL_NAME_LEN);
        let policy = Policy::from_env(&fake(&[(VAR_SYSCALL_ALLOW, &name)])).unwrap();
        assert_eq!(policy.syscalls.len(), 1);
        assert_eq!(policy.syscalls[0].len(), MAX_SYSCALL_NAME_LEN);
    }

    #[test]
    fn default_action_prefix_match_is_loose() {
        let policy = Policy::from_env(&fake(&[(VAR_DEFAULT_ACTION, "log_and_kill")])).unwrap();
        assert_eq!(policy.violation_action, ViolationAction::LogOnly);
    }

    #[test]
    fn default_action_nonsense_value_is_kill() {
        let policy = Policy::from_env(&fake(&[(VAR_DEFAULT_ACTION, "banana")])).unwrap();
        assert_eq!(policy.violation_action, ViolationAction::KillProcess);
    }

    #[test]
    fn default_action_absent_is_kill() {
        let policy = Policy::from_env(&fake(&[])).unwrap();
        assert_eq!(policy.violation_action, ViolationAction::KillProcess);
    }
}
