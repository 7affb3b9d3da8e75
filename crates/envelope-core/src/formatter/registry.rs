use super::{
    ErrorFormatter, ExceptionFormatter, ResponseFormatter, ResponseKind, SuccessFormatter,
    ValidationFormatter,
};
use crate::config::ConfigSnapshot;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The formatter in effect for each [`ResponseKind`].
///
/// Resolved once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct FormatterRegistry {
    success: Arc<dyn ResponseFormatter>,
    error: Arc<dyn ResponseFormatter>,
    validation: Arc<dyn ResponseFormatter>,
    exception: Arc<dyn ResponseFormatter>,
}

impl FormatterRegistry {
    /// Registry holding only the built-in formatters.
    pub fn builtin() -> Self {
        Self {
            success: Arc::new(SuccessFormatter),
            error: Arc::new(ErrorFormatter),
            validation: Arc::new(ValidationFormatter),
            exception: Arc::new(ExceptionFormatter),
        }
    }

    pub fn builder() -> FormatterRegistryBuilder {
        FormatterRegistryBuilder::default()
    }

    pub fn get(&self, kind: ResponseKind) -> &Arc<dyn ResponseFormatter> {
        match kind {
            ResponseKind::Success => &self.success,
            ResponseKind::Error => &self.error,
            ResponseKind::Validation => &self.validation,
            ResponseKind::Exception => &self.exception,
        }
    }

    pub fn success(&self) -> &dyn ResponseFormatter {
        self.success.as_ref()
    }

    pub fn error(&self) -> &dyn ResponseFormatter {
        self.error.as_ref()
    }

    pub fn validation(&self) -> &dyn ResponseFormatter {
        self.validation.as_ref()
    }

    pub fn exception(&self) -> &dyn ResponseFormatter {
        self.exception.as_ref()
    }

    fn slot_mut(&mut self, kind: ResponseKind) -> &mut Arc<dyn ResponseFormatter> {
        match kind {
            ResponseKind::Success => &mut self.success,
            ResponseKind::Error => &mut self.error,
            ResponseKind::Validation => &mut self.validation,
            ResponseKind::Exception => &mut self.exception,
        }
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("success", &self.success.kind())
            .field("error", &self.error.kind())
            .field("validation", &self.validation.kind())
            .field("exception", &self.exception.kind())
            .finish()
    }
}

/// Named formatter implementations available to configuration.
#[derive(Default)]
pub struct FormatterRegistryBuilder {
    named: HashMap<String, Arc<dyn ResponseFormatter>>,
}

impl FormatterRegistryBuilder {
    /// Make `formatter` selectable under `name`.
    pub fn register(mut self, name: impl Into<String>, formatter: impl ResponseFormatter) -> Self {
        self.named.insert(name.into(), Arc::new(formatter));
        self
    }

    /// Resolve `config.formatters` against the registered names.
    ///
    /// Unknown names and formatters of the wrong kind are skipped with a
    /// warning; the built-in stays in effect for that kind.
    pub fn build(self, config: &ConfigSnapshot) -> FormatterRegistry {
        let mut registry = FormatterRegistry::builtin();

        for kind in ResponseKind::ALL {
            let Some(name) = config.formatters.get(kind) else {
                continue;
            };

            match self.named.get(name) {
                Some(formatter) if formatter.kind() == kind => {
                    tracing::debug!(kind = %kind, formatter = %name, "Using custom formatter");
                    *registry.slot_mut(kind) = formatter.clone();
                }
                Some(formatter) => {
                    warn!(
                        kind = %kind,
                        formatter = %name,
                        actual = %formatter.kind(),
                        "Formatter renders a different kind, using built-in"
                    );
                }
                None => {
                    warn!(kind = %kind, formatter = %name, "Unknown formatter, using built-in");
                }
            }
        }

        registry
    }
}
