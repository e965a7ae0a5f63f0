use std::path::Path;

use super::structures::ArchiveEntry;

/// Selects entries by path.
///
/// A pattern containing `*` or `?` is glob-matched against the full
/// archive path; any other pattern must equal either the full path or its
/// file name. An empty filter selects everything.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    patterns: Vec<String>,
}

impl EntryFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, entry: &ArchiveEntry) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let path = entry.relative_path.as_str();
        let file_name = Path::new(path).file_name().and_then(|name| name.to_str());
        self.patterns.iter().any(|pattern| {
            if pattern.contains(['*', '?']) {
                glob_match(pattern, path)
            } else {
                path == pattern || file_name == Some(pattern.as_str())
            }
        })
    }
}

/// Matches `text` against a pattern where `*` spans any run of characters
/// (including `/`) and `?` exactly one.
///
/// Only the most recent `*` is ever retried, which keeps the walk linear in
/// the common case and quadratic at worst.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Pattern position after the last `*`, and the text position it resumes at.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p + 1, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((after_star, resume)) => {
                    p = after_star;
                    t = resume + 1;
                    star = Some((after_star, resume + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
