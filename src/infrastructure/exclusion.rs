//! Ant-style exclusion patterns over artifact paths.

use std::path::Path;

use globset::{Glob, GlobBuilder, GlobMatcher};

use crate::error::PatternError;

/// A compiled list of exclusion patterns.
///
/// A path is excluded only when *every* pattern matches it. With a single
/// pattern that is the usual behavior; with several it narrows instead of widens.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<String>,
    matchers: Vec<GlobMatcher>,
}

impl ExclusionSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = ExclusionSet::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.trim().is_empty() {
                continue;
            }
            set.matchers.push(compile(pattern)?.compile_matcher());
            set.patterns.push(pattern.to_string());
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when the set is non-empty and each pattern matches `path`.
    pub fn matches_all(&self, path: &Path) -> bool {
        !self.matchers.is_empty() && self.matchers.iter().all(|m| m.is_match(path))
    }
}

// `*` and `?` stop at `/`, `**` crosses directories.
fn compile(pattern: &str) -> Result<Glob, PatternError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_excludes_nothing() {
        let set = ExclusionSet::new(Vec::<String>::new()).unwrap();
        assert!(set.is_empty());
        assert!(!set.matches_all(Path::new("/out/com/acme/A.class")));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let set = ExclusionSet::new(["/out/*/A.class"]).unwrap();
        assert!(set.matches_all(Path::new("/out/com/A.class")));
        assert!(!set.matches_all(Path::new("/out/com/acme/A.class")));
    }

    #[test]
    fn test_double_star_spans_segments() {
        let set = ExclusionSet::new(["**/dto/**"]).unwrap();
        assert!(set.matches_all(Path::new("/out/com/acme/dto/UserDto.class")));
        assert!(!set.matches_all(Path::new("/out/com/acme/web/UserController.class")));
    }

    #[test]
    fn test_every_pattern_must_match() {
        let set = ExclusionSet::new(["**/dto/**", "**/*Test.class"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(!set.matches_all(Path::new("/out/com/acme/dto/UserDto.class")));
        assert!(set.matches_all(Path::new("/out/com/acme/dto/UserDtoTest.class")));
    }

    #[test]
    fn test_blank_patterns_ignored_and_bad_patterns_rejected() {
        assert!(ExclusionSet::new(["", "  "]).unwrap().is_empty());
        let err = ExclusionSet::new(["**/[dto"]).unwrap_err();
        assert_eq!(err.pattern, "**/[dto");
    }
}
