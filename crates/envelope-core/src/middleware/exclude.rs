//! Route exclusion patterns
//!
//! Patterns are globs where `*` matches any run of characters, `/`
//! included. Matching is anchored and case-sensitive; a leading `/` is
//! ignored on both sides.

use crate::config::ConfigError;
use regex::Regex;

/// Compiled exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExcludedRoutes {
    patterns: Vec<(String, Regex)>,
}

impl ExcludedRoutes {
    pub fn compile<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                glob_to_regex(pattern).map(|regex| (pattern.to_owned(), regex))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The first pattern matching `path`.
    pub fn matching(&self, path: &str) -> Option<&str> {
        let path = path.trim_start_matches('/');
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(path))
            .map(|(pattern, _)| pattern.as_str())
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matching(path).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern {
            pattern: String::new(),
            reason: "pattern is empty".to_string(),
        });
    }

    // "/" alone leaves an empty body and matches only the root path
    let body = pattern
        .trim_start_matches('/')
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).map_err(|err| invalid(pattern, err))
}

fn invalid(pattern: &str, err: regex::Error) -> ConfigError {
    ConfigError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wildcard_spans_segments() {
        let routes = ExcludedRoutes::compile(["api/webhooks/*"]).unwrap();
        assert!(routes.matches("api/webhooks/stripe"));
        assert!(routes.matches("/api/webhooks/stripe/events"));
        assert!(!routes.matches("api/webhook"));
        assert!(!routes.matches("v2/api/webhooks/stripe"));
    }

    #[test]
    fn test_anchored_and_case_sensitive() {
        let routes = ExcludedRoutes::compile(["/health"]).unwrap();
        assert!(routes.matches("/health"));
        assert!(routes.matches("health"));
        assert!(!routes.matches("/healthz"));
        assert!(!routes.matches("/Health"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let routes = ExcludedRoutes::compile(["files/report.pdf"]).unwrap();
        assert!(routes.matches("files/report.pdf"));
        assert!(!routes.matches("files/reportXpdf"));
    }

    #[test]
    fn test_matching_reports_first_pattern() {
        let routes = ExcludedRoutes::compile(["admin/*", "*"]).unwrap();
        assert_eq!(routes.matching("admin/users"), Some("admin/*"));
        assert_eq!(routes.matching("public"), Some("*"));
    }

    #[test]
    fn test_root_pattern() {
        let routes = ExcludedRoutes::compile(["/"]).unwrap();
        assert!(routes.matches("/"));
        assert!(!routes.matches("/api"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let err = ExcludedRoutes::compile([""]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_literal_pattern_matches_itself(path in "[a-z0-9._/-]{1,30}") {
            prop_assume!(!path.trim_start_matches('/').is_empty());
            let routes = ExcludedRoutes::compile([path.as_str()]).unwrap();
            prop_assert!(routes.matches(&path));
        }

        #[test]
        fn prop_prefix_wildcard_matches_extensions(
            prefix in "[a-z]{1,10}/",
            rest in "[a-z0-9/]{0,20}",
        ) {
            let routes = ExcludedRoutes::compile([format!("{}*", prefix)]).unwrap();
            let path = format!("{}{}", prefix, rest);
            prop_assert!(routes.matches(&path));
        }
    }
}
