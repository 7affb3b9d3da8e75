//! Per-request identifier generation
//!
//! One [`RequestIdState`] exists per request lifecycle. The first read
//! generates `prefix + YYYYMMDDHHMMSS + "-" + 8 uppercase hex digits`; later
//! reads return the cached value until [`RequestIdState::reset`] is called.

use chrono::Utc;

/// Lazily generated request identifier owned by a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdState {
    prefix: String,
    current: Option<String>,
}

impl RequestIdState {
    /// Create an uninitialized state using `prefix` for generated IDs.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            current: None,
        }
    }

    /// Return the current ID, generating it on first access.
    pub fn get(&mut self) -> &str {
        let prefix = &self.prefix;
        self.current.get_or_insert_with(|| generate(prefix)).as_str()
    }

    /// Return the current ID without generating one.
    pub fn peek(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Overwrite the ID regardless of prior state.
    pub fn set(&mut self, id: impl Into<String>) {
        self.current = Some(id.into());
    }

    /// Return to the uninitialized state.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Whether an ID has been generated or set.
    pub fn is_generated(&self) -> bool {
        self.current.is_some()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Generate a fresh identifier. Not cryptographically significant.
pub fn generate(prefix: &str) -> String {
    format!(
        "{}{}-{:08X}",
        prefix,
        Utc::now().format("%Y%m%d%H%M%S"),
        rand::random::<u32>()
    )
}

/// Request extension carrying the identifier assigned when the request entered
/// the envelope layer.
///
/// Handlers read it to build envelopes that share the request's ID:
///
/// ```rust,ignore
/// let id = req.extensions().get::<RequestId>().map(RequestId::as_str);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
