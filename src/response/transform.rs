//! Named text transformations
//!
//! A binding names its transformation as `KIND(pattern)`. The kind selects a
//! [`TransformationProvider`] from the [`TransformRegistry`]; the pattern is
//! handed to that provider with the text to rewrite.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, error, warn};

use crate::core::{Error, Result};

/// A parsed `kind(pattern)` transformation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformSpec {
    pub kind: String,
    pub pattern: String,
}

impl TransformSpec {
    pub fn new(kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        TransformSpec {
            kind: kind.into(),
            pattern: pattern.into(),
        }
    }
}

impl FromStr for TransformSpec {
    type Err = Error;

    /// Parses `kind(pattern)`; the kind ends at the first `(` and the pattern
    /// runs to the final `)`
    fn from_str(s: &str) -> Result<Self> {
        s.strip_suffix(')')
            .and_then(|inner| inner.split_once('('))
            .map(|(kind, pattern)| TransformSpec::new(kind, pattern))
            .ok_or_else(|| {
                Error::config_parse(format!(
                    "given transformation function '{}' does not follow the expected pattern '<function>(<pattern>)'",
                    s
                ))
            })
    }
}

impl fmt::Display for TransformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.pattern)
    }
}

/// Rewrites text according to a provider specific pattern
pub trait TransformationProvider: Send + Sync {
    fn transform(&self, pattern: &str, input: &str) -> Result<String>;
}

/// Providers available for lookup by kind
#[derive(Default)]
pub struct TransformRegistry {
    providers: RwLock<HashMap<String, Arc<dyn TransformationProvider>>>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers = self.providers.read();
        let mut kinds: Vec<&String> = providers.keys().collect();
        kinds.sort();
        f.debug_struct("TransformRegistry").field("kinds", &kinds).finish()
    }
}

impl TransformRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `REGEX` and `MAP` providers
    pub fn with_builtin(map_dir: impl Into<PathBuf>) -> Self {
        let registry = Self::new();
        registry.register("REGEX", Arc::new(RegexTransformation));
        registry.register("MAP", Arc::new(MapTransformation::new(map_dir)));
        registry
    }

    /// Registers or replaces the provider for `kind`
    pub fn register(&self, kind: impl Into<String>, provider: Arc<dyn TransformationProvider>) {
        self.providers.write().insert(kind.into(), provider);
    }

    /// Removes the provider for `kind`
    pub fn unregister(&self, kind: &str) -> bool {
        self.providers.write().remove(kind).is_some()
    }

    /// Looks up the provider for `kind`
    pub fn lookup(&self, kind: &str) -> Option<Arc<dyn TransformationProvider>> {
        self.providers.read().get(kind).cloned()
    }

    /// Applies a transformation, never failing
    ///
    /// An unknown kind passes the text through with a warning; a failing
    /// provider yields the untransformed text and logs the failure.
    pub fn apply(&self, spec: &TransformSpec, input: &str) -> String {
        let transformed = match self.lookup(&spec.kind) {
            Some(provider) => match provider.transform(&spec.pattern, input) {
                Ok(output) => output,
                Err(e) => {
                    error!(
                        "transformation throws exception [transformation={}, response={}]: {}",
                        spec, input, e
                    );
                    input.to_string()
                }
            },
            None => {
                warn!(
                    "couldn't transform response because transformation service of type '{}' is unavailable",
                    spec.kind
                );
                input.to_string()
            }
        };

        debug!("transformed response is '{}'", transformed);
        transformed
    }
}

/// `REGEX(pattern)`: extracts the first capture group of the first match
///
/// Without a capture group the whole match is returned; when nothing matches
/// the input comes back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexTransformation;

impl TransformationProvider for RegexTransformation {
    fn transform(&self, pattern: &str, input: &str) -> Result<String> {
        let re = Regex::new(pattern).map_err(|e| {
            Error::transform(format!("Invalid regular expression '{}': {}", pattern, e))
        })?;

        Ok(match re.captures(input) {
            Some(caps) => caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            None => input.to_string(),
        })
    }
}

/// `MAP(file)`: looks the trimmed input up in a `key=value` file
#[derive(Debug, Clone)]
pub struct MapTransformation {
    dir: PathBuf,
}

impl MapTransformation {
    /// Creates a provider resolving map files below `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        MapTransformation { dir: dir.into() }
    }

    fn load(&self, file: &str) -> Result<HashMap<String, String>> {
        let path = self.dir.join(file);
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::transform(format!("Can not read map file {}: {}", path.display(), e))
        })?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect())
    }
}

impl TransformationProvider for MapTransformation {
    fn transform(&self, pattern: &str, input: &str) -> Result<String> {
        let key = input.trim();
        self.load(pattern)?
            .remove(key)
            .ok_or_else(|| Error::transform(format!("No mapping for '{}' in {}", key, pattern)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Failing;

    impl TransformationProvider for Failing {
        fn transform(&self, _pattern: &str, _input: &str) -> Result<String> {
            Err(Error::transform("boom"))
        }
    }

    #[test]
    fn test_parse_spec() {
        let spec: TransformSpec = "MAP(foo.map)".parse().unwrap();
        assert_eq!(spec.kind, "MAP");
        assert_eq!(spec.pattern, "foo.map");
        assert_eq!(spec.to_string(), "MAP(foo.map)");
    }

    #[test]
    fn test_parse_spec_keeps_nested_parentheses() {
        let spec: TransformSpec = r"REGEX(.*\((\d+)\))".parse().unwrap();
        assert_eq!(spec.kind, "REGEX");
        assert_eq!(spec.pattern, r".*\((\d+)\)");
    }

    #[test]
    fn test_parse_spec_rejects_malformed() {
        for bad in ["badstring", "MAP(foo.map", "MAP(foo.map) trailing"] {
            let err = bad.parse::<TransformSpec>().unwrap_err();
            assert!(matches!(err, Error::ConfigParse(_)), "{}", bad);
        }
    }

    #[test]
    fn test_unregistered_kind_passes_through() {
        let registry = TransformRegistry::new();
        let text = "  42 \r\n";
        assert_eq!(registry.apply(&TransformSpec::new("MAP", "x.map"), text), text);
    }

    #[test]
    fn test_failing_provider_falls_back() {
        let registry = TransformRegistry::new();
        registry.register("FAIL", Arc::new(Failing));
        assert_eq!(registry.apply(&TransformSpec::new("FAIL", ""), "raw"), "raw");
        assert!(registry.unregister("FAIL"));
        assert!(registry.lookup("FAIL").is_none());
    }

    #[test]
    fn test_regex_transformation() {
        let regex = RegexTransformation;
        assert_eq!(regex.transform(r"TEMP=(\d+)", "TEMP=21;HUM=40").unwrap(), "21");
        assert_eq!(regex.transform(r"\d+", "lvl 75").unwrap(), "75");
        assert_eq!(regex.transform(r"x(\d)", "nothing").unwrap(), "nothing");
        assert!(regex.transform("(", "x").is_err());
    }

    #[test]
    fn test_map_transformation() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("switch.map")).unwrap();
        writeln!(file, "# reply codes").unwrap();
        writeln!(file, "1=ON").unwrap();
        writeln!(file, "0 = OFF").unwrap();

        let registry = TransformRegistry::with_builtin(dir.path());
        let spec: TransformSpec = "MAP(switch.map)".parse().unwrap();
        assert_eq!(registry.apply(&spec, "1\r\n"), "ON");
        assert_eq!(registry.apply(&spec, "0"), "OFF");
        // unmapped value falls back to the raw text
        assert_eq!(registry.apply(&spec, "7"), "7");

        let missing: TransformSpec = "MAP(none.map)".parse().unwrap();
        assert_eq!(registry.apply(&missing, "1"), "1");
    }
}
