use regex::Regex;

use crate::error::PathError;
use crate::path::SmbPath;

/// C9: matches a path against a `glob:` or `regex:` pattern. No prefix
/// defaults to `regex:`.
pub struct PathMatcher {
    regex: Regex,
}

impl PathMatcher {
    pub fn new(pattern: &str) -> Result<Self, PathError> {
        let source = if let Some(glob) = pattern.strip_prefix("glob:") {
            glob_to_regex(glob)
        } else if let Some(re) = pattern.strip_prefix("regex:") {
            re.to_string()
        } else {
            pattern.to_string()
        };
        let anchored = format!("^(?:{source})$");
        let regex = Regex::new(&anchored)
            .map_err(|e| PathError::InvalidArgument(format!("invalid pattern {pattern:?}: {e}")))?;
        Ok(Self { regex })
    }

    /// Full match against `path`, normalized first (§4.2) the way the
    /// directory-stream filter and registry lookups normalize before
    /// comparing.
    pub fn matches(&self, path: &SmbPath) -> bool {
        self.regex.is_match(&path.normalize().to_string())
    }
}

/// Translate a glob pattern into the body of a regex (unanchored, no `^$`).
///
/// `*` -> `.*`, `?` -> `.`, regex metacharacters are escaped, `\` escapes the
/// following character, and `{a,b,c}` becomes `(a|b|c)` with `,` acting as
/// alternation only inside a brace group.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    let mut in_braces = false;
    let mut escaping = false;

    while let Some(c) = chars.next() {
        if escaping {
            out.push_str(&regex::escape(&c.to_string()));
            escaping = false;
            continue;
        }
        match c {
            '\\' => escaping = true,
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '{' => {
                in_braces = true;
                out.push('(');
            }
            '}' => {
                in_braces = false;
                out.push(')');
            }
            ',' if in_braces => out.push('|'),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '@' | '%' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::path::FileSystemIdentity;

    struct FakeFs;

    impl FileSystemIdentity for FakeFs {
        fn authority(&self) -> &str {
            "host"
        }
    }

    fn p(s: &str) -> SmbPath {
        let identity: Arc<dyn FileSystemIdentity + Send + Sync> = Arc::new(FakeFs);
        SmbPath::parse(identity, s).unwrap()
    }

    mod glob_tests {
        use super::*;

        #[test]
        fn star_matches_any_run() {
            let m = PathMatcher::new("glob:/a/*.txt").unwrap();
            assert!(m.matches(&p("/a/report.txt")));
            assert!(!m.matches(&p("/a/b/report.txt")));
        }

        #[test]
        fn question_mark_matches_single_char() {
            let m = PathMatcher::new("glob:/a/?.txt").unwrap();
            assert!(m.matches(&p("/a/x.txt")));
            assert!(!m.matches(&p("/a/xy.txt")));
        }

        #[test]
        fn braces_are_alternation() {
            let m = PathMatcher::new("glob:/a/*.{jpg,png}").unwrap();
            assert!(m.matches(&p("/a/photo.jpg")));
            assert!(m.matches(&p("/a/photo.png")));
            assert!(!m.matches(&p("/a/photo.gif")));
        }

        #[test]
        fn comma_outside_braces_is_literal() {
            let m = PathMatcher::new("glob:/a,b").unwrap();
            assert!(m.matches(&p("/a,b")));
        }

        #[test]
        fn dot_is_escaped_literal() {
            let m = PathMatcher::new("glob:/a.txt").unwrap();
            assert!(m.matches(&p("/a.txt")));
            assert!(!m.matches(&p("/aXtxt")));
        }

        #[test]
        fn backslash_escapes_next_char() {
            let m = PathMatcher::new("glob:/a\\*b").unwrap();
            assert!(m.matches(&p("/a*b")));
            assert!(!m.matches(&p("/aXb")));
        }

        #[test]
        fn matches_against_normalized_path() {
            let m = PathMatcher::new("glob:/a/b.txt").unwrap();
            assert!(m.matches(&p("/a/./b.txt")));
            assert!(m.matches(&p("/x/../a/b.txt")));
        }
    }

    mod regex_tests {
        use super::*;

        #[test]
        fn defaults_to_regex_without_prefix() {
            let m = PathMatcher::new("/a/[0-9]+").unwrap();
            assert!(m.matches(&p("/a/123")));
        }

        #[test]
        fn explicit_regex_prefix() {
            let m = PathMatcher::new("regex:/a/.*").unwrap();
            assert!(m.matches(&p("/a/anything")));
        }

        #[test]
        fn invalid_regex_errors() {
            assert!(PathMatcher::new("regex:(").is_err());
        }
    }
}
