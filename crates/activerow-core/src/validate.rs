//! Runtime validation helpers.
//!
//! Pattern constraints on textual fields are regex-based. Compiled patterns
//! are cached for the lifetime of the process so validation on every write
//! does not recompile.

use std::sync::OnceLock;

use regex::Regex;

/// Thread-safe cache of compiled regex patterns.
struct RegexCache {
    cache: std::sync::RwLock<std::collections::HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        // Fast path: check if already cached
        {
            let cache = self.cache.read().unwrap();
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        // Slow path: compile and cache
        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

/// Global regex cache singleton.
fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Compile a pattern through the cache, reporting compilation failures.
///
/// The entity builder calls this once per declared pattern so that a broken
/// pattern surfaces at declaration time, not on the first write.
pub fn compile_pattern(pattern: &str) -> Result<(), String> {
    regex_cache()
        .get_or_compile(pattern)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Check if a string matches a regex pattern.
///
/// Patterns reaching this function have already been vetted by
/// [`compile_pattern`]; an invalid pattern here is logged and treated as a
/// non-match rather than a panic.
#[must_use]
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(pattern = pattern, error = %e, "Invalid regex pattern");
            false
        }
    }
}
