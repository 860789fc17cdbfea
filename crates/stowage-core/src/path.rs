//! Root-relative path prefixing shared by all backends.

const SEPARATOR: char = '/';

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixer {
    prefix: String,
}

impl PathPrefixer {
    pub fn new(prefix: &str) -> Self {
        let mut trimmed = prefix.trim_end_matches(is_separator).to_string();
        if !trimmed.is_empty() || prefix == "/" {
            trimmed.push(SEPARATOR);
        }
        Self { prefix: trimmed }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn prefix_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches(is_separator))
    }

    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }

    pub fn strip_directory_prefix<'a>(&self, path: &'a str) -> &'a str {
        self.strip_prefix(path).trim_end_matches(is_separator)
    }

    /// Prefixed path that always ends with a separator (unless empty).
    pub fn prefix_directory_path(&self, path: &str) -> String {
        let prefixed = self.prefix_path(path.trim_end_matches(is_separator));
        if prefixed.is_empty() || prefixed.ends_with(SEPARATOR) {
            prefixed
        } else {
            format!("{}{}", prefixed, SEPARATOR)
        }
    }
}
