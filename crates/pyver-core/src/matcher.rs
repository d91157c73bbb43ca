//! Filename and path matching for extraction rules.
//!
//! A [`MatchCondition`] gates whether a rule is considered for a file. Only the
//! filename glob and the path regex take part in [`matches`]; the content
//! pre-filter and the size cap need the file bytes and are checked later, when
//! the rule is applied.

use regex::Regex;

/// The filename/path/content/size predicate of a rule.
///
/// Immutable once built. Compiled regexes are shared by reference when the
/// condition is cloned.
#[derive(Debug, Clone, Default)]
pub struct MatchCondition {
    file_pattern: String,
    file_regex: Option<Regex>,
    path_pattern: Option<Regex>,
    required_content: Option<Regex>,
    max_file_size: usize,
}

impl MatchCondition {
    pub(crate) fn new(
        file_pattern: String,
        path_pattern: Option<Regex>,
        required_content: Option<Regex>,
        max_file_size: usize,
    ) -> Result<Self, regex::Error> {
        let file_regex = if file_pattern.is_empty() {
            None
        } else {
            Some(compile_glob(&file_pattern)?)
        };
        Ok(Self {
            file_pattern,
            file_regex,
            path_pattern,
            required_content,
            max_file_size,
        })
    }

    /// Glob matched against the bare filename (empty = no constraint).
    pub fn file_pattern(&self) -> &str {
        &self.file_pattern
    }

    /// Regex matched against the full file path.
    pub fn path_pattern(&self) -> Option<&Regex> {
        self.path_pattern.as_ref()
    }

    /// Regex the raw content must match before the extractor runs.
    pub fn required_content(&self) -> Option<&Regex> {
        self.required_content.as_ref()
    }

    /// Content size cap in bytes, if any.
    pub fn max_file_size(&self) -> Option<usize> {
        (self.max_file_size > 0).then_some(self.max_file_size)
    }

    /// Whether either the filename glob or the path regex is set.
    pub fn has_location_filter(&self) -> bool {
        !self.file_pattern.is_empty() || self.path_pattern.is_some()
    }

    /// Whether the content passes the `required_content` pre-filter.
    ///
    /// Content that is not valid UTF-8 is matched lossily.
    pub fn content_qualifies(&self, content: &[u8]) -> bool {
        match &self.required_content {
            Some(re) => re.is_match(&String::from_utf8_lossy(content)),
            None => true,
        }
    }
}

impl PartialEq for MatchCondition {
    fn eq(&self, other: &Self) -> bool {
        fn pattern(re: &Option<Regex>) -> Option<&str> {
            re.as_ref().map(Regex::as_str)
        }

        self.file_pattern == other.file_pattern
            && pattern(&self.path_pattern) == pattern(&other.path_pattern)
            && pattern(&self.required_content) == pattern(&other.required_content)
            && self.max_file_size == other.max_file_size
    }
}

/// Translate a glob into an anchored regex source string.
///
/// `*` matches any run of characters, `?` exactly one; everything else is
/// literal.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

/// Compile a glob into a full-filename regex.
pub fn compile_glob(glob: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?s){}", glob_to_regex(glob)))
}

/// Test a filename against a glob without keeping the compiled pattern.
pub fn glob_matches(glob: &str, filename: &str) -> bool {
    compile_glob(glob).is_ok_and(|re| re.is_match(filename))
}

/// Check the filename glob and path regex of a condition.
///
/// An absent filter is vacuously satisfied. Enablement is the rule's
/// concern, not the condition's.
pub fn matches(condition: &MatchCondition, filename: &str, filepath: &str) -> bool {
    if let Some(re) = &condition.file_regex
        && !re.is_match(filename)
    {
        return false;
    }
    if let Some(re) = &condition.path_pattern
        && !re.is_match(filepath)
    {
        return false;
    }
    true
}
