//! # Variable Rules Module
//!
//! Rules constrain what a template variable may capture. A template like
//! `/users/:id(int)` only matches when the `id` segment passes the `int`
//! rule; otherwise matching continues and ultimately reports not-found.
//!
//! ## Built-in rules
//!
//! | Slug           | Parameters   | Passes when the value...                         |
//! |----------------|--------------|--------------------------------------------------|
//! | `alpha`        | none         | is non-empty and entirely alphabetic             |
//! | `alphanumeric` | none         | is non-empty and entirely alphanumeric           |
//! | `int`          | none         | parses as an `i64`                               |
//! | `numeric`      | none         | parses as an `f64`                               |
//! | `between`      | `min, max`   | parses as an `f64` within `[min, max]` inclusive |
//! | `in`           | `v1, v2, ..` | equals one of the listed values                  |
//! | `regex`        | `pattern`    | matches the anchored-as-written pattern          |
//! | `uuidv4`       | none         | is a version-4 UUID (case-insensitive)           |
//!
//! Empty values fail every built-in rule.
//!
//! ## Custom rules
//!
//! Register a factory under a slug before compiling:
//!
//! ```rust
//! use routrie::rules::{Rule, RuleRegistry};
//!
//! #[derive(Debug)]
//! struct Even;
//!
//! impl Rule for Even {
//!     fn passes(&self, value: &str) -> bool {
//!         value.parse::<i64>().map(|v| v % 2 == 0).unwrap_or(false)
//!     }
//! }
//!
//! let mut registry = RuleRegistry::with_builtin_rules();
//! registry.register("even", |_params| Ok(Box::new(Even)));
//! assert!(registry.contains("even"));
//! ```
//!
//! Rule factories run at compile time, once per use of the slug in a
//! route template; `passes` runs on the match hot path and must not
//! allocate or block.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// A compiled validation rule for one template variable.
///
/// Implementations are instantiated by a [`RuleRegistry`] factory during
/// trie compilation and shared by the matcher across requests.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Returns `true` when `value` is acceptable for the variable.
    fn passes(&self, value: &str) -> bool;
}

/// Error creating a rule from a slug and parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// No factory is registered under the slug
    UnknownRule { slug: String },
    /// The factory rejected the parameter list
    InvalidParameters { slug: String, reason: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::UnknownRule { slug } => {
                write!(
                    f,
                    "unknown rule `{slug}`; rules must be registered before routes are compiled"
                )
            }
            RuleError::InvalidParameters { slug, reason } => {
                write!(f, "invalid parameters for rule `{slug}`: {reason}")
            }
        }
    }
}

impl std::error::Error for RuleError {}

type RuleFactory = Box<dyn Fn(&[String]) -> Result<Box<dyn Rule>, RuleError> + Send + Sync>;

/// Maps rule slugs to factories that build [`Rule`] instances.
///
/// The registry used to compile a trie must also be the one handed to
/// the matcher, or rules referenced by cached tries may be missing.
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// Creates an empty registry with no rules at all.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry preloaded with the built-in rules.
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.register("alpha", |params| {
            expect_no_parameters("alpha", params)?;
            Ok(Box::new(AlphaRule))
        });
        registry.register("alphanumeric", |params| {
            expect_no_parameters("alphanumeric", params)?;
            Ok(Box::new(AlphanumericRule))
        });
        registry.register("int", |params| {
            expect_no_parameters("int", params)?;
            Ok(Box::new(IntegerRule))
        });
        registry.register("numeric", |params| {
            expect_no_parameters("numeric", params)?;
            Ok(Box::new(NumericRule))
        });
        registry.register("between", |params| {
            BetweenRule::from_parameters(params).map(|rule| Box::new(rule) as Box<dyn Rule>)
        });
        registry.register("in", |params| {
            InRule::from_parameters(params).map(|rule| Box::new(rule) as Box<dyn Rule>)
        });
        registry.register("regex", |params| {
            RegexRule::from_parameters(params).map(|rule| Box::new(rule) as Box<dyn Rule>)
        });
        registry.register("uuidv4", |params| {
            expect_no_parameters("uuidv4", params)?;
            Ok(Box::new(UuidV4Rule))
        });
        registry
    }

    /// Registers `factory` under `slug`, replacing any previous factory.
    pub fn register<F>(&mut self, slug: &str, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn Rule>, RuleError> + Send + Sync + 'static,
    {
        self.factories.insert(slug.to_string(), Box::new(factory));
    }

    /// Builds a rule instance from a slug and its parameters.
    pub fn create(&self, slug: &str, params: &[String]) -> Result<Box<dyn Rule>, RuleError> {
        let factory = self.factories.get(slug).ok_or_else(|| RuleError::UnknownRule {
            slug: slug.to_string(),
        })?;
        factory(params)
    }

    /// Returns `true` when a factory is registered under `slug`.
    pub fn contains(&self, slug: &str) -> bool {
        self.factories.contains_key(slug)
    }

    /// Registered slugs, sorted for stable output.
    pub fn slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        slugs.sort_unstable();
        slugs
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("slugs", &self.slugs())
            .finish()
    }
}

fn expect_no_parameters(slug: &str, params: &[String]) -> Result<(), RuleError> {
    if params.is_empty() {
        Ok(())
    } else {
        Err(RuleError::InvalidParameters {
            slug: slug.to_string(),
            reason: format!("expected no parameters, got {}", params.len()),
        })
    }
}

/// Non-empty and entirely alphabetic
#[derive(Debug, Clone, Copy)]
pub struct AlphaRule;

impl Rule for AlphaRule {
    fn passes(&self, value: &str) -> bool {
        !value.is_empty() && value.chars().all(char::is_alphabetic)
    }
}

/// Non-empty and entirely alphanumeric
#[derive(Debug, Clone, Copy)]
pub struct AlphanumericRule;

impl Rule for AlphanumericRule {
    fn passes(&self, value: &str) -> bool {
        !value.is_empty() && value.chars().all(char::is_alphanumeric)
    }
}

/// Parses as an `i64`, sign allowed
#[derive(Debug, Clone, Copy)]
pub struct IntegerRule;

impl Rule for IntegerRule {
    fn passes(&self, value: &str) -> bool {
        value.parse::<i64>().is_ok()
    }
}

/// Parses as an `f64`
#[derive(Debug, Clone, Copy)]
pub struct NumericRule;

impl Rule for NumericRule {
    fn passes(&self, value: &str) -> bool {
        value.parse::<f64>().is_ok()
    }
}

/// Numeric value within an inclusive range
#[derive(Debug, Clone, Copy)]
pub struct BetweenRule {
    min: f64,
    max: f64,
}

impl BetweenRule {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn from_parameters(params: &[String]) -> Result<Self, RuleError> {
        let [min, max] = params else {
            return Err(RuleError::InvalidParameters {
                slug: "between".to_string(),
                reason: format!("expected 2 parameters (min, max), got {}", params.len()),
            });
        };
        let parse = |raw: &str| {
            raw.parse::<f64>().map_err(|_| RuleError::InvalidParameters {
                slug: "between".to_string(),
                reason: format!("`{raw}` is not numeric"),
            })
        };
        Ok(Self::new(parse(min)?, parse(max)?))
    }
}

impl Rule for BetweenRule {
    fn passes(&self, value: &str) -> bool {
        value
            .parse::<f64>()
            .map(|v| v >= self.min && v <= self.max)
            .unwrap_or(false)
    }
}

/// Equals one of a fixed set of values
#[derive(Debug, Clone)]
pub struct InRule {
    values: Vec<String>,
}

impl InRule {
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn from_parameters(params: &[String]) -> Result<Self, RuleError> {
        if params.is_empty() {
            return Err(RuleError::InvalidParameters {
                slug: "in".to_string(),
                reason: "expected at least one value".to_string(),
            });
        }
        Ok(Self::new(params.iter().cloned()))
    }
}

impl Rule for InRule {
    fn passes(&self, value: &str) -> bool {
        !value.is_empty() && self.values.iter().any(|candidate| candidate == value)
    }
}

/// Matches a caller-supplied regular expression
#[derive(Debug, Clone)]
pub struct RegexRule {
    pattern: Regex,
}

impl RegexRule {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let pattern = Regex::new(pattern).map_err(|e| RuleError::InvalidParameters {
            slug: "regex".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    fn from_parameters(params: &[String]) -> Result<Self, RuleError> {
        let [pattern] = params else {
            return Err(RuleError::InvalidParameters {
                slug: "regex".to_string(),
                reason: format!("expected 1 parameter (pattern), got {}", params.len()),
            });
        };
        Self::new(pattern)
    }
}

impl Rule for RegexRule {
    fn passes(&self, value: &str) -> bool {
        !value.is_empty() && self.pattern.is_match(value)
    }
}

static UUID_V4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("uuid v4 pattern is valid")
});

/// Version-4 UUID, case-insensitive
#[derive(Debug, Clone, Copy)]
pub struct UuidV4Rule;

impl Rule for UuidV4Rule {
    fn passes(&self, value: &str) -> bool {
        UUID_V4.is_match(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_accepts_letters_only() {
        let rule = AlphaRule;
        assert!(rule.passes("abc"));
        assert!(rule.passes("Ünïcode"));
        assert!(!rule.passes("abc1"));
        assert!(!rule.passes(""));
    }

    #[test]
    fn test_alphanumeric_accepts_letters_and_digits() {
        let rule = AlphanumericRule;
        assert!(rule.passes("abc123"));
        assert!(!rule.passes("abc-123"));
        assert!(!rule.passes(""));
    }

    #[test]
    fn test_int_requires_a_whole_number() {
        let rule = IntegerRule;
        assert!(rule.passes("42"));
        assert!(rule.passes("-7"));
        assert!(!rule.passes("4.2"));
        assert!(!rule.passes("abc"));
        assert!(!rule.passes(""));
    }

    #[test]
    fn test_numeric_accepts_floats() {
        let rule = NumericRule;
        assert!(rule.passes("42"));
        assert!(rule.passes("-3.25"));
        assert!(!rule.passes("12px"));
    }

    #[test]
    fn test_between_is_inclusive() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry
            .create("between", &["1".to_string(), "12".to_string()])
            .unwrap();
        assert!(rule.passes("1"));
        assert!(rule.passes("12"));
        assert!(rule.passes("6.5"));
        assert!(!rule.passes("0"));
        assert!(!rule.passes("13"));
        assert!(!rule.passes("abc"));
    }

    #[test]
    fn test_between_rejects_bad_parameters() {
        let registry = RuleRegistry::with_builtin_rules();
        let err = registry.create("between", &["1".to_string()]).unwrap_err();
        assert!(matches!(err, RuleError::InvalidParameters { .. }));
        let err = registry
            .create("between", &["low".to_string(), "12".to_string()])
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidParameters { .. }));
    }

    #[test]
    fn test_in_matches_listed_values_exactly() {
        let rule = InRule::new(["asc", "desc"]);
        assert!(rule.passes("asc"));
        assert!(rule.passes("desc"));
        assert!(!rule.passes("ASC"));
        assert!(!rule.passes("up"));
    }

    #[test]
    fn test_regex_delegates_to_the_pattern() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry
            .create("regex", &[r"^v\d+$".to_string()])
            .unwrap();
        assert!(rule.passes("v1"));
        assert!(rule.passes("v42"));
        assert!(!rule.passes("1"));
    }

    #[test]
    fn test_regex_rejects_invalid_patterns_at_creation() {
        let err = RegexRule::new("[").unwrap_err();
        assert!(matches!(err, RuleError::InvalidParameters { .. }));
    }

    #[test]
    fn test_uuidv4_checks_version_and_variant() {
        let rule = UuidV4Rule;
        assert!(rule.passes("6ba7b811-9dad-41d1-80b4-00c04fd430c8"));
        assert!(rule.passes("6BA7B811-9DAD-41D1-80B4-00C04FD430C8"));
        // version nibble is 1, not 4
        assert!(!rule.passes("6ba7b811-9dad-11d1-80b4-00c04fd430c8"));
        // variant nibble out of range
        assert!(!rule.passes("6ba7b811-9dad-41d1-c0b4-00c04fd430c8"));
        // a stray extra character in any group fails
        assert!(!rule.passes("6ba7b811-9dad-41d1-80b4f-00c04fd430c8"));
        assert!(!rule.passes("not-a-uuid"));
    }

    #[test]
    fn test_registry_built_uuidv4_accepts_canonical_uuids() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry.create("uuidv4", &[]).unwrap();
        assert!(
            rule.passes("9f1d6a2e-30e4-4c8b-a0cd-6f52e6b4a9d1"),
            "canonical 36-char v4 UUID must pass"
        );
        assert!(!rule.passes("9f1d6a2e-30e4-4c8b-a0cd-6f52e6b4a9d12"));
    }

    #[test]
    fn test_unknown_slug_is_an_error() {
        let registry = RuleRegistry::with_builtin_rules();
        let err = registry.create("nope", &[]).unwrap_err();
        assert_eq!(
            err,
            RuleError::UnknownRule {
                slug: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_custom_rules_can_be_registered() {
        let mut registry = RuleRegistry::new();
        assert!(!registry.contains("alpha"));

        #[derive(Debug)]
        struct Lowercase;
        impl Rule for Lowercase {
            fn passes(&self, value: &str) -> bool {
                !value.is_empty() && value.chars().all(char::is_lowercase)
            }
        }
        registry.register("lowercase", |_params| Ok(Box::new(Lowercase)));
        let rule = registry.create("lowercase", &[]).unwrap();
        assert!(rule.passes("abc"));
        assert!(!rule.passes("Abc"));
    }

    #[test]
    fn test_builtin_slugs_are_stable() {
        let registry = RuleRegistry::with_builtin_rules();
        assert_eq!(
            registry.slugs(),
            vec![
                "alpha",
                "alphanumeric",
                "between",
                "in",
                "int",
                "numeric",
                "regex",
                "uuidv4"
            ]
        );
    }
}
