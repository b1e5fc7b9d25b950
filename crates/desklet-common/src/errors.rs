use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("config watch error: {0}")]
    WatchError(String),
}

/// Failures while reading, writing, or migrating the persisted instance table.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state read error: {0}")]
    Read(String),

    #[error("state parse error: {0}")]
    Parse(String),

    #[error("state write error: {0}")]
    Write(String),

    #[error("state migration error: {0}")]
    Migration(String),
}

/// Failures while resolving a widget descriptor.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("widget not found: {0}")]
    NotFound(String),

    #[error("invalid manifest for {widget_id}: {reason}")]
    InvalidManifest { widget_id: String, reason: String },

    #[error("registry io error: {0}")]
    Io(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeskletError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("backend.kill_grace_ms out of range".into());
        assert_eq!(
            err.to_string(),
            "config validation error: backend.kill_grace_ms out of range"
        );
    }

    #[test]
    fn state_error_display() {
        let err = StateError::Parse("expected object".into());
        assert_eq!(err.to_string(), "state parse error: expected object");

        let err = StateError::Migration("v1 -> v2: instances is not an array".into());
        assert!(err.to_string().starts_with("state migration error"));
    }

    #[test]
    fn registry_error_display() {
        let err = RegistryError::NotFound("clock".into());
        assert_eq!(err.to_string(), "widget not found: clock");

        let err = RegistryError::InvalidManifest {
            widget_id: "clock".into(),
            reason: "empty backend command".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid manifest for clock: empty backend command"
        );
    }

    #[test]
    fn desklet_error_from_variants() {
        let err: DeskletError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, DeskletError::Config(_)));
        assert!(err.to_string().contains("bad toml"));

        let err: DeskletError = StateError::Write("disk full".into()).into();
        assert!(matches!(err, DeskletError::State(_)));

        let err: DeskletError = RegistryError::NotFound("x".into()).into();
        assert!(matches!(err, DeskletError::Registry(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: DeskletError = io_err.into();
        assert!(matches!(err, DeskletError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn desklet_error_other_variants() {
        let err = DeskletError::Backend("spawn failed".into());
        assert_eq!(err.to_string(), "backend error: spawn failed");

        let err = DeskletError::Layout("no surfaces".into());
        assert_eq!(err.to_string(), "layout error: no surfaces");

        let err = DeskletError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
