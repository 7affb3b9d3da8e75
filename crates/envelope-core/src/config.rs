//! Configuration snapshot for Envelope
//!
//! The snapshot is resolved once at startup and shared read-only by every
//! in-flight request (usually behind an `Arc`). Nothing in the request path
//! performs I/O to obtain configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_core::{ConfigSnapshot, Environment};
//!
//! let config = ConfigSnapshot::for_environment(Environment::current()).validated()?;
//! assert_eq!(config.keys.success, "success");
//! ```

use crate::formatter::{ResponseKind, GENERIC_ERROR_MESSAGE};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Error raised when a configuration value is malformed.
///
/// Configuration errors are fatal at startup and never surface mid-request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An envelope key name is empty.
    #[error("envelope key `{0}` must not be empty")]
    EmptyKey(&'static str),

    /// Two envelope slots share the same key name.
    #[error("envelope keys `{first}` and `{second}` both map to `{name}`")]
    DuplicateKey {
        first: &'static str,
        second: &'static str,
        name: String,
    },

    /// The request ID prefix contains whitespace.
    #[error("request id prefix `{0}` must not contain whitespace")]
    InvalidPrefix(String),

    /// An exclude pattern is empty or cannot be compiled.
    #[error("invalid exclude pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Environment variables could not be deserialized.
    #[cfg(feature = "config")]
    #[error("invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}

/// Environment profile of the running application.
///
/// Detected from the `ENVELOPE_ENV` environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Verbose error detail is exposed.
    Development,
    /// Error detail is masked.
    Production,
    /// Custom environment name for specialized deployments.
    Custom(String),
}

impl Environment {
    /// Detect the current environment from `ENVELOPE_ENV`.
    ///
    /// - `Production` for "production" or "prod"
    /// - `Development` for "development", "dev", or when unset
    /// - `Custom(name)` for any other value
    pub fn current() -> Self {
        match std::env::var("ENVELOPE_ENV").as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            Ok("development") | Ok("dev") => Self::Development,
            Ok(other) => Self::Custom(other.to_string()),
            Err(_) => Self::Development,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Get the environment name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Whether internal error detail (kind, origin, trace) should be rendered.
    pub fn show_error_details(&self) -> bool {
        !self.is_production()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key names used for the top-level envelope slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyNames {
    pub success: String,
    pub message: String,
    pub data: String,
    pub errors: String,
    pub meta: String,
}

impl KeyNames {
    fn slots(&self) -> [(&'static str, &str); 5] {
        [
            ("success", &self.success),
            ("message", &self.message),
            ("data", &self.data),
            ("errors", &self.errors),
            ("meta", &self.meta),
        ]
    }
}

impl Default for KeyNames {
    fn default() -> Self {
        Self {
            success: "success".to_string(),
            message: "message".to_string(),
            data: "data".to_string(),
            errors: "errors".to_string(),
            meta: "meta".to_string(),
        }
    }
}

/// Debug settings gating the exposure of internal error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Render kind, origin and stack trace for raised errors.
    pub show_trace: bool,
    /// Replace data-store error messages with a fixed message.
    pub hide_sql_errors: bool,
    /// Maximum number of stack frames rendered. The cap only applies when > 0.
    pub max_trace_frames: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_trace: false,
            hide_sql_errors: true,
            max_trace_frames: 10,
        }
    }
}

/// Middleware switches and excluded routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    pub enabled: bool,
    /// Install the envelope layer on the global layer stack.
    pub global: bool,
    /// Glob patterns (`*` wildcard) of request paths left unformatted.
    pub exclude: Vec<String>,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global: true,
            exclude: Vec::new(),
        }
    }
}

/// Names of registered formatter implementations overriding the built-ins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterOverrides {
    pub success: Option<String>,
    pub error: Option<String>,
    pub validation: Option<String>,
    pub exception: Option<String>,
}

impl FormatterOverrides {
    /// Registered name configured for `kind`, if any.
    pub fn get(&self, kind: ResponseKind) -> Option<&str> {
        match kind {
            ResponseKind::Success => self.success.as_deref(),
            ResponseKind::Error => self.error.as_deref(),
            ResponseKind::Validation => self.validation.as_deref(),
            ResponseKind::Exception => self.exception.as_deref(),
        }
    }
}

/// Read-only view of every setting the envelope pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub keys: KeyNames,
    pub request_id_prefix: String,
    /// Message used by success envelopes when none is given.
    pub default_message: String,
    pub debug: DebugConfig,
    /// Fixed messages by error kind identifier. Applied in every environment.
    pub exception_messages: HashMap<String, String>,
    /// Messages by HTTP status code.
    pub status_messages: BTreeMap<u16, String>,
    pub middleware: MiddlewareConfig,
    pub formatters: FormatterOverrides,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            keys: KeyNames::default(),
            request_id_prefix: "LH-".to_string(),
            default_message: "Success".to_string(),
            debug: DebugConfig::default(),
            exception_messages: HashMap::new(),
            status_messages: default_status_messages(),
            middleware: MiddlewareConfig::default(),
            formatters: FormatterOverrides::default(),
        }
    }
}

fn default_status_messages() -> BTreeMap<u16, String> {
    [400u16, 401, 403, 404, 405, 409, 422, 429, 500, 503]
        .into_iter()
        .filter_map(|code| {
            let reason = StatusCode::from_u16(code).ok()?.canonical_reason()?;
            Some((code, reason.to_string()))
        })
        .collect()
}

impl ConfigSnapshot {
    /// Defaults tuned for `env`: stack traces are shown everywhere except production.
    pub fn for_environment(env: Environment) -> Self {
        let mut config = Self::default();
        config.debug.show_trace = env.show_error_details();
        config
    }

    /// Parse a (possibly partial) JSON document; missing sections keep their defaults.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validated()
    }

    /// Validate and return self.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Check the invariants every other component assumes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let slots = self.keys.slots();
        for (index, (slot, name)) in slots.iter().enumerate() {
            if name.is_empty() {
                return Err(ConfigError::EmptyKey(*slot));
            }
            if let Some((other, _)) = slots[..index].iter().find(|(_, n)| n == name) {
                return Err(ConfigError::DuplicateKey {
                    first: *other,
                    second: *slot,
                    name: name.to_string(),
                });
            }
        }

        if self.request_id_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPrefix(self.request_id_prefix.clone()));
        }

        if let Some(pattern) = self
            .middleware
            .exclude
            .iter()
            .find(|p| p.trim().is_empty())
        {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: "pattern is empty".to_string(),
            });
        }

        Ok(())
    }

    /// Configured message for `status`, if any.
    pub fn status_message(&self, status: StatusCode) -> Option<&str> {
        self.status_messages
            .get(&status.as_u16())
            .map(String::as_str)
    }

    /// Configured message for `status`, falling back to the generic error message.
    pub fn status_message_or_default(&self, status: StatusCode) -> &str {
        self.status_message(status).unwrap_or(GENERIC_ERROR_MESSAGE)
    }

    /// Fixed message configured for an error kind identifier.
    pub fn exception_message(&self, kind_id: &str) -> Option<&str> {
        self.exception_messages.get(kind_id).map(String::as_str)
    }
}

#[cfg(feature = "config")]
mod env {
    use super::{ConfigError, ConfigSnapshot, Environment};
    use serde::Deserialize;

    /// Flat `ENVELOPE_*` variables overlaid on the environment defaults.
    #[derive(Debug, Default, Deserialize)]
    struct EnvOverrides {
        show_trace: Option<bool>,
        hide_sql_errors: Option<bool>,
        max_trace_frames: Option<u32>,
        request_id_prefix: Option<String>,
        default_message: Option<String>,
        middleware_enabled: Option<bool>,
    }

    impl ConfigSnapshot {
        /// Load `.env`, detect the environment, then overlay `ENVELOPE_*` variables.
        ///
        /// Existing process variables take precedence over `.env` values.
        pub fn from_env() -> Result<Self, ConfigError> {
            let _ = dotenvy::dotenv();
            let overrides: EnvOverrides = envy::prefixed("ENVELOPE_").from_env()?;
            Self::for_environment(Environment::current())
                .with_overrides(overrides)
                .validated()
        }

        fn with_overrides(mut self, overrides: EnvOverrides) -> Self {
            if let Some(show_trace) = overrides.show_trace {
                self.debug.show_trace = show_trace;
            }
            if let Some(hide) = overrides.hide_sql_errors {
                self.debug.hide_sql_errors = hide;
            }
            if let Some(frames) = overrides.max_trace_frames {
                self.debug.max_trace_frames = frames;
            }
            if let Some(prefix) = overrides.request_id_prefix {
                self.request_id_prefix = prefix;
            }
            if let Some(message) = overrides.default_message {
                self.default_message = message;
            }
            if let Some(enabled) = overrides.middleware_enabled {
                self.middleware.enabled = enabled;
            }
            self
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConfigSnapshot::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_id_prefix, "LH-");
        assert_eq!(config.keys.meta, "meta");
        assert!(!config.debug.show_trace);
        assert!(config.debug.hide_sql_errors);
        assert_eq!(config.status_message(StatusCode::NOT_FOUND), Some("Not Found"));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut config = ConfigSnapshot::default();
        config.keys.errors = "data".to_string();

        match config.validate() {
            Err(ConfigError::DuplicateKey { first, second, name }) => {
                assert_eq!(first, "data");
                assert_eq!(second, "errors");
                assert_eq!(name, "data");
            }
            other => panic!("expected duplicate key error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut config = ConfigSnapshot::default();
        config.keys.message = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyKey("message"))));
    }

    #[test]
    fn test_empty_exclude_pattern_rejected() {
        let mut config = ConfigSnapshot::default();
        config.middleware.exclude = vec!["api/*".to_string(), "  ".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_partial_json_document() {
        let config = ConfigSnapshot::from_json_str(
            r#"{
                "keys": { "success": "ok", "data": "payload" },
                "debug": { "show_trace": true, "max_trace_frames": 0 },
                "status_messages": { "404": "Nothing here" },
                "middleware": { "exclude": ["api/webhooks/*"] },
                "formatters": { "success": "camel" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.keys.success, "ok");
        assert_eq!(config.keys.data, "payload");
        assert_eq!(config.keys.meta, "meta");
        assert!(config.debug.show_trace);
        assert!(config.debug.hide_sql_errors);
        assert_eq!(config.debug.max_trace_frames, 0);
        assert_eq!(config.status_message(StatusCode::NOT_FOUND), Some("Nothing here"));
        assert_eq!(config.status_message(StatusCode::FORBIDDEN), None);
        assert_eq!(config.middleware.exclude, vec!["api/webhooks/*"]);
        assert!(config.middleware.enabled);
        assert_eq!(config.formatters.get(ResponseKind::Success), Some("camel"));
        assert_eq!(config.formatters.get(ResponseKind::Error), None);
    }

    #[test]
    fn test_malformed_json_document() {
        let result = ConfigSnapshot::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_status_message_fallback() {
        let config = ConfigSnapshot::default();
        assert_eq!(
            config.status_message_or_default(StatusCode::IM_A_TEAPOT),
            GENERIC_ERROR_MESSAGE
        );
    }

    #[test]
    #[serial]
    fn test_environment_detection() {
        std::env::set_var("ENVELOPE_ENV", "prod");
        assert!(Environment::current().is_production());
        assert!(!ConfigSnapshot::for_environment(Environment::current()).debug.show_trace);

        std::env::set_var("ENVELOPE_ENV", "staging");
        assert_eq!(Environment::current(), Environment::Custom("staging".to_string()));
        assert!(Environment::current().show_error_details());

        std::env::remove_var("ENVELOPE_ENV");
        assert!(Environment::current().is_development());
        assert!(ConfigSnapshot::for_environment(Environment::current()).debug.show_trace);
    }
}
