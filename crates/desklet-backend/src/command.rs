//! Backend command specification and process construction.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::BackendError;
use crate::host::HostIdentity;

// =============================================================================
// COMMAND SPEC
// =============================================================================

/// Fully resolved command line for one backend process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendCommand {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl BackendCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build a `tokio` command with all three standard streams piped.
    ///
    /// Unless `inherit_env` is set, the inherited environment is reduced to
    /// [`ALLOWED_ENV_VARS`] before the spec's own variables are applied.
    pub fn to_command(&self, inherit_env: bool) -> Result<Command, BackendError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| BackendError::start("backend command is empty"))?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        if !inherit_env {
            cmd.env_clear();
            for key in ALLOWED_ENV_VARS {
                if let Ok(val) = std::env::var(key) {
                    cmd.env(key, val);
                }
            }
        }
        cmd.envs(&self.env);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        Ok(cmd)
    }
}

// =============================================================================
// ENVIRONMENT SANITIZATION
// =============================================================================

/// Environment variables a backend inherits from the host.
///
/// Everything else (API keys, tokens, session secrets) stays behind.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "HOME",
    "USER",
    "LOGNAME",
    "PATH",
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "TZ",
    "DISPLAY",
    "WAYLAND_DISPLAY",
    "XDG_RUNTIME_DIR",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "XDG_CACHE_HOME",
    "DBUS_SESSION_BUS_ADDRESS",
    "TMPDIR",
];

// =============================================================================
// RESOLUTION SEAM
// =============================================================================

/// Resolves the command for a host at start time.
///
/// Resolution is a suspension point of `ensure_started`; it usually means a
/// descriptor lookup. Return [`ErrorCode::NoBackend`](crate::ErrorCode) when
/// the widget declares no backend.
#[async_trait]
pub trait CommandSource: Send + Sync {
    async fn resolve(&self, identity: &HostIdentity) -> Result<BackendCommand, BackendError>;
}

/// A fixed command, for hosts whose command is known up front.
#[async_trait]
impl CommandSource for BackendCommand {
    async fn resolve(&self, _identity: &HostIdentity) -> Result<BackendCommand, BackendError> {
        Ok(self.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn builder_collects_parts() {
        let cmd = BackendCommand::new(["node", "main.js"])
            .with_cwd("/opt/w")
            .with_env("A", "1");
        assert_eq!(cmd.argv, vec!["node", "main.js"]);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/opt/w")));
        assert_eq!(cmd.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn empty_argv_is_a_start_error() {
        let err = BackendCommand::default().to_command(false).unwrap_err();
        assert_eq!(err.code, ErrorCode::BackendStart);
    }

    #[test]
    fn allowed_env_vars_contains_essentials() {
        assert!(ALLOWED_ENV_VARS.contains(&"HOME"));
        assert!(ALLOWED_ENV_VARS.contains(&"PATH"));
    }

    #[test]
    fn allowed_env_vars_excludes_secrets() {
        for var in ALLOWED_ENV_VARS {
            let lower = var.to_lowercase();
            for needle in ["key", "secret", "token", "password"] {
                assert!(
                    !lower.contains(needle),
                    "ALLOWED_ENV_VARS should not contain '{var}'"
                );
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sanitized_env_drops_unlisted_vars() {
        let cmd = BackendCommand::new(["/bin/sh", "-c", "echo \"[$DESKLET_TEST_SECRET][$MINE]\""])
            .with_env("MINE", "yes");
        std::env::set_var("DESKLET_TEST_SECRET", "leak");
        let out = cmd.to_command(false).unwrap().output().await.unwrap();
        let text = String::from_utf8_lossy(&out.stdout);
        assert_eq!(text.trim(), "[][yes]");
    }

    #[tokio::test]
    async fn fixed_command_resolves_to_itself() {
        let cmd = BackendCommand::new(["true"]);
        let identity = HostIdentity::new("i-1".into(), "w");
        assert_eq!(cmd.resolve(&identity).await.unwrap(), cmd);
    }
}
