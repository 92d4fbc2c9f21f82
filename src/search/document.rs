//! Searchable state of one indexed object

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::search::codec::DocumentCodec;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{RangeQuery, SearchTerm, TextQuery, WildcardTerm};
use crate::search::trie::Trie;

/// Compressed trie plus compressed raw text of one entity's attributes
///
/// Both blobs come from the same flattened snapshot. A document is never
/// edited in place; re-indexing builds a new one and replaces it whole.
/// Nothing is cached between queries, every call decompresses afresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    trie: Vec<u8>,
    text: Vec<u8>,
}

impl Document {
    /// Build a document from a flattened attribute set
    ///
    /// A panic while building the trie is caught and reported as a
    /// `BuildFailed` error for this document only.
    pub fn build(id: &str, flattened: &[String], codec: &DocumentCodec) -> SearchResult<Self> {
        let trie = panic::catch_unwind(AssertUnwindSafe(|| Trie::build(flattened)))
            .map_err(|cause| SearchError::BuildFailed {
                id: id.to_string(),
                reason: panic_message("trie construction", cause.as_ref()),
            })?
            .map_err(|e| build_failed(id, e))?;

        let trie = codec.pack(&trie).map_err(|e| build_failed(id, e))?;
        let text = codec
            .pack(flattened.join("\n").as_str())
            .map_err(|e| build_failed(id, e))?;

        Ok(Self { trie, text })
    }

    /// Evaluate a parsed search term
    pub fn examine(&self, term: &SearchTerm, codec: &DocumentCodec) -> SearchResult<bool> {
        match term {
            SearchTerm::All => Ok(true),
            SearchTerm::Exact(term) => self.exact(term, codec),
            SearchTerm::Wildcard(term) => self.wildcard(term, codec),
        }
    }

    /// Exact `field:value` membership
    pub fn exact(&self, term: &str, codec: &DocumentCodec) -> SearchResult<bool> {
        Ok(self.trie(codec)?.accepts(term))
    }

    /// True when any stored value of the term's field matches its pattern
    pub fn wildcard(&self, term: &WildcardTerm, codec: &DocumentCodec) -> SearchResult<bool> {
        let trie = self.trie(codec)?;

        let matched = match term.field() {
            Some(field) => trie
                .has_prefix(&field_prefix(field))
                .map(|node| node.child_keys().iter().any(|value| term.is_match(value)))
                .unwrap_or(false),
            None => trie.keys().iter().any(|key| term.is_match(key)),
        };
        Ok(matched)
    }

    /// True when any stored value of the range's field lies within it
    pub fn range(&self, range: &RangeQuery, codec: &DocumentCodec) -> SearchResult<bool> {
        let trie = self.trie(codec)?;

        let matched = trie
            .has_prefix(&field_prefix(range.field()))
            .map(|node| node.child_keys().iter().any(|value| range.contains(value)))
            .unwrap_or(false);
        Ok(matched)
    }

    /// Match against the newline-joined attribute text
    pub fn text_search(&self, query: &TextQuery, codec: &DocumentCodec) -> SearchResult<bool> {
        let text: String = codec.unpack(&self.text)?;
        Ok(query.is_match(&text))
    }

    /// Compressed size of both blobs in bytes
    pub fn compressed_size(&self) -> usize {
        self.trie.len() + self.text.len()
    }

    fn trie(&self, codec: &DocumentCodec) -> SearchResult<Trie> {
        codec.unpack(&self.trie)
    }
}

fn field_prefix(field: &str) -> String {
    format!("{}:", field)
}

fn build_failed(id: &str, err: SearchError) -> SearchError {
    SearchError::BuildFailed {
        id: id.to_string(),
        reason: err.to_string(),
    }
}

/// Describe a caught panic raised while running `stage`
pub(crate) fn panic_message(stage: &str, cause: &(dyn Any + Send)) -> String {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        format!("{} panicked: {}", stage, msg)
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        format!("{} panicked: {}", stage, msg)
    } else {
        format!("{} panicked", stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn sample(codec: &DocumentCodec) -> Document {
        Document::build(
            "foo",
            &lines(&["name:foo", "platform:ubuntu", "tags:prod", "tags:web", "size:05"]),
            codec,
        )
        .unwrap()
    }

    #[test]
    fn test_exact() {
        let codec = DocumentCodec::default();
        let doc = sample(&codec);

        assert!(doc.exact("platform:ubuntu", &codec).unwrap());
        assert!(!doc.exact("platform:centos", &codec).unwrap());
        assert!(!doc.exact("platform:", &codec).unwrap());
    }

    #[test]
    fn test_wildcard_superset_of_exact() {
        let codec = DocumentCodec::default();
        let doc = sample(&codec);

        for term in ["tags:w*", "tags:*", "tags:we?", "plat*:ubuntu", "*:foo"] {
            let parsed = SearchTerm::parse(term).unwrap();
            assert!(doc.examine(&parsed, &codec).unwrap(), "{} should match", term);
        }

        for term in ["tags:x*", "kernel:*", "*:centos"] {
            let parsed = SearchTerm::parse(term).unwrap();
            assert!(!doc.examine(&parsed, &codec).unwrap(), "{} should not match", term);
        }
    }

    #[test]
    fn test_range() {
        let codec = DocumentCodec::default();
        let doc = sample(&codec);

        let range = RangeQuery::new("size", "01", "05", true).unwrap();
        assert!(doc.range(&range, &codec).unwrap());

        let range = RangeQuery::new("size", "01", "05", false).unwrap();
        assert!(!doc.range(&range, &codec).unwrap());

        let range = RangeQuery::new("weight", "*", "99", true).unwrap();
        assert!(!doc.range(&range, &codec).unwrap());
    }

    #[test]
    fn test_text_search() {
        let codec = DocumentCodec::default();
        let doc = sample(&codec);

        assert!(doc.text_search(&TextQuery::parse("ubu*").unwrap(), &codec).unwrap());
        assert!(doc.text_search(&TextQuery::parse("prod").unwrap(), &codec).unwrap());
        assert!(!doc.text_search(&TextQuery::parse("centos").unwrap(), &codec).unwrap());
    }

    #[test]
    fn test_empty_document() {
        let codec = DocumentCodec::default();
        let doc = Document::build("empty", &[], &codec).unwrap();

        assert!(!doc.exact("name:foo", &codec).unwrap());
        assert!(doc.examine(&SearchTerm::All, &codec).unwrap());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let codec = DocumentCodec::default();
        let doc = Document {
            trie: vec![1, 2, 3],
            text: vec![4, 5, 6],
        };

        assert!(doc.exact("name:foo", &codec).is_err());
        assert!(doc
            .text_search(&TextQuery::parse("foo").unwrap(), &codec)
            .is_err());
    }

    #[test]
    fn test_panic_message() {
        let cause: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(
            panic_message("trie construction", cause.as_ref()),
            "trie construction panicked: boom"
        );

        let cause: Box<dyn Any + Send> = Box::new(12u32);
        assert_eq!(
            panic_message("attribute flattening", cause.as_ref()),
            "attribute flattening panicked"
        );
    }
}
