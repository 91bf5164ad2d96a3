use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use regex::{Captures, Regex, RegexBuilder};
use tracing::warn;

use crate::Record;

const MARK_OPEN: &str = "<mark>";
const MARK_CLOSE: &str = "</mark>";

/// A compiled search pattern that can be compared and hashed.
///
/// Equality covers both the pattern source and the case mode, since the
/// latter is a builder flag that `Regex::as_str` does not reflect.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    case_sensitive: bool,
}

impl Hash for CompiledPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.regex.as_str().hash(state);
        self.case_sensitive.hash(state);
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str() && self.case_sensitive == other.case_sensitive
    }
}

impl Eq for CompiledPattern {}

impl Deref for CompiledPattern {
    type Target = Regex;

    fn deref(&self) -> &Self::Target {
        &self.regex
    }
}

/// Outcome of compiling a user-supplied search pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    /// The pattern was blank; nothing is filtered or highlighted.
    NoFilter,
    /// A usable pattern.
    Pattern(CompiledPattern),
    /// The pattern failed to compile; behaves like `NoFilter`.
    Invalid,
}

impl Matcher {
    /// The compiled pattern, if there is one to apply.
    pub fn pattern(&self) -> Option<&CompiledPattern> {
        match self {
            Matcher::Pattern(p) => Some(p),
            Matcher::NoFilter | Matcher::Invalid => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Matcher::Invalid)
    }
}

/// Compile a search pattern, case-insensitive unless requested otherwise.
pub fn compile_regex(pattern: &str, case_sensitive: bool) -> Matcher {
    if pattern.trim().is_empty() {
        return Matcher::NoFilter;
    }
    match RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(regex) => Matcher::Pattern(CompiledPattern {
            regex,
            case_sensitive,
        }),
        Err(err) => {
            warn!(pattern, %err, "search pattern does not compile");
            Matcher::Invalid
        }
    }
}

/// Keep the records whose description or category matches.
///
/// Without a usable pattern every record is kept.
pub fn filter_records<'a, R>(records: &'a [R], matcher: &Matcher) -> Vec<&'a Record>
where
    R: AsRef<Record>,
{
    let records = records.iter().map(|r| r.as_ref());
    match matcher.pattern() {
        None => records.collect(),
        Some(re) => records
            .filter(|r| re.is_match(&r.description) || re.is_match(&r.category))
            .collect(),
    }
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape `text` and wrap every non-empty match in `<mark>` tags.
///
/// Matching runs over the escaped text, so record content can never
/// produce markup of its own.
pub fn highlight(text: &str, matcher: &Matcher) -> String {
    let escaped = escape_html(text);
    match matcher.pattern() {
        None => escaped.into_owned(),
        Some(re) => re
            .replace_all(&escaped, |caps: &Captures| {
                let m = &caps[0];
                if m.is_empty() {
                    String::new()
                } else {
                    format!("{MARK_OPEN}{m}{MARK_CLOSE}")
                }
            })
            .into_owned(),
    }
}
