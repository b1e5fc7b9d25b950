//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Desklet Configuration
# Only override what you want to change -- missing fields use defaults.

[paths]
# widget_dirs = ["~/.local/share/desklet/widgets"]
# state_file = "~/.local/share/desklet/state.json"

[backend]
# shutdown_grace_ms = 500    # 0-60000, wait after "shutdown" before SIGTERM
# kill_grace_ms = 1500       # 0-60000, wait after SIGTERM before SIGKILL
# inherit_env = false        # pass the whole environment to widget backends

[consent]
# policy = "ask"             # ask | allow | deny

[state]
# save_debounce_ms = 300     # 0-10000
# watch = true               # reload when the state file changes on disk

[host]
# theme = "dark"
# reduced_motion = false
# direction = "ltr"          # ltr | rtl
# locale = "en-US"

[logging]
# level = "info"             # trace | debug | info | warn | error
"##
    .to_string()
}
