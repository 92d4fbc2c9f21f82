//! Query term parsing and validation
//!
//! Terms are `field:value` strings. A value (or field) containing `*` or `?`
//! is a wildcard term; `*` matches any run of characters and `?` matches at
//! most one. Every other regex metacharacter is matched literally.

use regex::Regex;

use crate::search::error::{SearchError, SearchResult};

/// Term that matches every document in a collection
pub const MATCH_ALL: &str = "*:*";

/// Range bound meaning "unbounded on this side"
pub const UNBOUNDED: &str = "*";

/// Whether a string contains a wildcard character
pub fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

/// Translate a wildcard pattern into an (unanchored) regex
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push_str(".?"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out
}

/// A parsed `Search` term
#[derive(Debug, Clone)]
pub enum SearchTerm {
    /// The literal `*:*`
    All,
    /// Exact `field:value` membership
    Exact(String),
    /// Pattern match over a field's values
    Wildcard(WildcardTerm),
}

impl SearchTerm {
    pub fn parse(term: &str) -> SearchResult<Self> {
        let term = term.trim();
        if term == MATCH_ALL {
            return Ok(SearchTerm::All);
        }

        let (field, value) = term.split_once(':').ok_or_else(|| {
            SearchError::InvalidQuery(format!("term {:?} is not of the form field:value", term))
        })?;
        if field.is_empty() {
            return Err(SearchError::InvalidQuery(format!(
                "term {:?} has an empty field",
                term
            )));
        }

        if !has_wildcard(term) {
            return Ok(SearchTerm::Exact(term.to_string()));
        }

        let wildcard = if has_wildcard(field) {
            WildcardTerm {
                field: None,
                pattern: anchored(&wildcard_to_regex(term))?,
            }
        } else {
            WildcardTerm {
                field: Some(field.to_string()),
                pattern: anchored(&wildcard_to_regex(value))?,
            }
        };
        Ok(SearchTerm::Wildcard(wildcard))
    }

    /// Label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SearchTerm::All => "all",
            SearchTerm::Exact(_) => "exact",
            SearchTerm::Wildcard(_) => "wildcard",
        }
    }
}

/// Wildcard term compiled to an anchored regex
#[derive(Debug, Clone)]
pub struct WildcardTerm {
    /// Literal field to enumerate; `None` when the field itself is a pattern
    /// and the regex applies to the whole `field:value` key
    field: Option<String>,
    pattern: Regex,
}

impl WildcardTerm {
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }
}

/// Lexicographic range over one field's values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    field: String,
    start: Option<String>,
    end: Option<String>,
    inclusive: bool,
}

impl RangeQuery {
    /// Build a range; `*` for a bound leaves that side open
    pub fn new(
        field: impl Into<String>,
        start: &str,
        end: &str,
        inclusive: bool,
    ) -> SearchResult<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(SearchError::InvalidQuery(
                "range query needs a field".to_string(),
            ));
        }

        let start = bound(start);
        let end = bound(end);
        if start.is_none() && end.is_none() {
            return Err(SearchError::InvalidQuery(format!(
                "range on {} cannot have both bounds set to {}",
                field, UNBOUNDED
            )));
        }

        Ok(Self {
            field,
            start,
            end,
            inclusive,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    /// Byte-wise string comparison against both bounds
    pub fn contains(&self, value: &str) -> bool {
        let above = match &self.start {
            None => true,
            Some(start) if self.inclusive => value >= start.as_str(),
            Some(start) => value > start.as_str(),
        };
        let below = match &self.end {
            None => true,
            Some(end) if self.inclusive => value <= end.as_str(),
            Some(end) => value < end.as_str(),
        };
        above && below
    }
}

/// Full-text term compiled against the newline-joined document text
#[derive(Debug, Clone)]
pub struct TextQuery {
    pattern: Regex,
}

impl TextQuery {
    pub fn parse(term: &str) -> SearchResult<Self> {
        let term = term.trim();
        if term.is_empty() {
            return Err(SearchError::InvalidQuery(
                "text search term is empty".to_string(),
            ));
        }
        if term.starts_with(['*', '?']) {
            return Err(SearchError::InvalidQuery(format!(
                "text search term {:?} cannot begin with a wildcard",
                term
            )));
        }

        let pattern = Regex::new(&format!("(?m):{}$", wildcard_to_regex(term)))?;
        Ok(Self { pattern })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

fn anchored(pattern: &str) -> SearchResult<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

fn bound(value: &str) -> Option<String> {
    (value != UNBOUNDED).then(|| value.to_string())
}
