//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the configuration as a commented TOML template. Used both to
    /// seed a fresh config file and to show the effective configuration.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# labelscan configuration
# Precedence: environment variables > this file > built-in defaults

# Base URL of the analysis service.
# Env override: LABELSCAN_API_URL
api_url = "{api_url}"

# Require a stored credential before submitting an analysis.
# When false, anonymous analysis is allowed.
# Env override: LABELSCAN_REQUIRE_AUTH
require_auth = {require_auth}

# Timeout for a single analyze/login exchange, in seconds.
# Env override: LABELSCAN_TIMEOUT_SECS
request_timeout_secs = {timeout}

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "{level}"
# Also write logs to rotating files
file_enabled = {file_enabled}
file_dir = "{file_dir}"
# Rotation: "hourly", "daily", "never"
file_rotation = "{file_rotation}"
file_prefix = "{file_prefix}"
"#,
            api_url = self.api_url,
            require_auth = self.require_auth,
            timeout = self.request_timeout_secs,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            file_rotation = self.logging.file_rotation.as_str(),
            file_prefix = self.logging.file_prefix,
        )
    }
}
