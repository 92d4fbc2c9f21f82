//! Compact radix trie over the flattened `field:value` strings of one document
//!
//! The trie is built once and never mutated afterwards. Edges carry whole
//! string fragments rather than single characters, and fragments are only
//! ever split on UTF-8 character boundaries so that every suffix handed back
//! by [`TrieNode::child_keys`] is a valid `String`.

use serde::{Deserialize, Serialize};

use crate::search::error::{SearchError, SearchResult};

const ROOT: usize = 0;

/// Immutable prefix tree supporting membership and prefix enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trie {
    nodes: Vec<Node>,
    len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Node {
    terminal: bool,
    /// Sorted by label; no two labels start with the same character
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Edge {
    label: String,
    target: u32,
}

impl Edge {
    fn first_char(&self) -> Option<char> {
        self.label.chars().next()
    }
}

/// A position inside the trie reached by consuming a prefix
///
/// The prefix may end part-way along an edge; `pending` holds the rest of
/// that edge's label, which is prepended to every key below this position.
#[derive(Debug, Clone, Copy)]
pub struct TrieNode<'a> {
    trie: &'a Trie,
    node: usize,
    pending: &'a str,
}

impl Trie {
    /// Create a trie holding no keys
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node::default()],
            len: 0,
        }
    }

    /// Build a trie from a finite set of keys
    ///
    /// Duplicate keys are stored once. Input order does not matter, though
    /// callers normally pass the sorted output of the flattener.
    pub fn build<I, S>(keys: I) -> SearchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Self::empty();
        for key in keys {
            trie.insert(key.as_ref())?;
        }
        Ok(trie)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes, including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Exact membership test
    pub fn accepts(&self, key: &str) -> bool {
        self.has_prefix(key)
            .map(|node| node.is_terminal())
            .unwrap_or(false)
    }

    /// Descend along `prefix`, returning the position reached if every
    /// character of the prefix could be consumed
    pub fn has_prefix(&self, prefix: &str) -> Option<TrieNode<'_>> {
        self.nodes.get(ROOT)?;

        let mut node = ROOT;
        let mut rest = prefix;
        loop {
            let Some(first) = rest.chars().next() else {
                return Some(TrieNode {
                    trie: self,
                    node,
                    pending: "",
                });
            };

            let pos = self.find_edge(node, first).ok()?;
            let edge = &self.nodes[node].edges[pos];

            if let Some(after) = rest.strip_prefix(edge.label.as_str()) {
                node = edge.target as usize;
                rest = after;
            } else if let Some(pending) = edge.label.strip_prefix(rest) {
                return Some(TrieNode {
                    trie: self,
                    node: edge.target as usize,
                    pending,
                });
            } else {
                return None;
            }
        }
    }

    /// Every key in the trie, in lexicographic order
    pub fn keys(&self) -> Vec<String> {
        self.has_prefix("")
            .map(|root| root.child_keys())
            .unwrap_or_default()
    }

    fn insert(&mut self, key: &str) -> SearchResult<()> {
        let mut node = ROOT;
        let mut rest = key;

        loop {
            let Some(first) = rest.chars().next() else {
                if !self.nodes[node].terminal {
                    self.nodes[node].terminal = true;
                    self.len += 1;
                }
                return Ok(());
            };

            match self.find_edge(node, first) {
                Err(pos) => {
                    let leaf = self.push_node(Node {
                        terminal: true,
                        edges: Vec::new(),
                    })?;
                    self.nodes[node].edges.insert(
                        pos,
                        Edge {
                            label: rest.to_string(),
                            target: leaf,
                        },
                    );
                    self.len += 1;
                    return Ok(());
                }
                Ok(pos) => {
                    let edge = &self.nodes[node].edges[pos];
                    let common = common_prefix_len(&edge.label, rest);

                    if common == edge.label.len() {
                        node = edge.target as usize;
                        rest = &rest[common..];
                        continue;
                    }

                    // Split the edge where the new key diverges
                    let tail = Edge {
                        label: edge.label[common..].to_string(),
                        target: edge.target,
                    };
                    let mid = self.push_node(Node {
                        terminal: false,
                        edges: vec![tail],
                    })?;

                    let edge = &mut self.nodes[node].edges[pos];
                    edge.label.truncate(common);
                    edge.target = mid;

                    node = mid as usize;
                    rest = &rest[common..];
                }
            }
        }
    }

    fn push_node(&mut self, node: Node) -> SearchResult<u32> {
        let id = u32::try_from(self.nodes.len()).map_err(|_| {
            SearchError::InvalidDocument(format!(
                "trie exceeds {} nodes",
                u32::MAX
            ))
        })?;
        self.nodes.push(node);
        Ok(id)
    }

    fn find_edge(&self, node: usize, first: char) -> Result<usize, usize> {
        self.nodes[node]
            .edges
            .binary_search_by(|edge| edge.first_char().cmp(&Some(first)))
    }

    fn collect(&self, node: usize, buf: &mut String, out: &mut Vec<String>) {
        let Some(current) = self.nodes.get(node) else {
            return;
        };

        if current.terminal {
            out.push(buf.clone());
        }

        for edge in &current.edges {
            let mark = buf.len();
            buf.push_str(&edge.label);
            self.collect(edge.target as usize, buf, out);
            buf.truncate(mark);
        }
    }
}

impl<'a> TrieNode<'a> {
    /// Whether the consumed prefix is itself a key
    pub fn is_terminal(&self) -> bool {
        self.pending.is_empty()
            && self
                .trie
                .nodes
                .get(self.node)
                .map(|node| node.terminal)
                .unwrap_or(false)
    }

    /// Suffixes of every key below this position, in lexicographic order
    ///
    /// An empty string is included when the consumed prefix is a key.
    pub fn child_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        let mut buf = String::from(self.pending);
        self.trie.collect(self.node, &mut buf, &mut keys);
        keys
    }
}

/// Length in bytes of the longest common prefix, on a char boundary
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, ca), cb)| ca == cb)
        .last()
        .map(|((idx, c), _)| idx + c.len_utf8())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trie {
        Trie::build([
            "name:foo",
            "platform:ubuntu",
            "platform_version:22.04",
            "tags:prod",
            "tags:web",
        ])
        .unwrap()
    }

    #[test]
    fn test_accepts_exact_keys_only() {
        let trie = sample();

        assert_eq!(trie.len(), 5);
        assert!(trie.accepts("platform:ubuntu"));
        assert!(trie.accepts("tags:web"));
        assert!(!trie.accepts("platform:ubunt"));
        assert!(!trie.accepts("platform:ubuntu1"));
        assert!(!trie.accepts("tags:"));
        assert!(!trie.accepts(""));
    }

    #[test]
    fn test_has_prefix_child_keys() {
        let trie = sample();

        let node = trie.has_prefix("tags:").unwrap();
        assert_eq!(node.child_keys(), vec!["prod", "web"]);

        let node = trie.has_prefix("platform").unwrap();
        assert_eq!(node.child_keys(), vec![":ubuntu", "_version:22.04"]);

        assert!(trie.has_prefix("kernel:").is_none());
    }

    #[test]
    fn test_prefix_ending_mid_edge() {
        let trie = sample();

        let node = trie.has_prefix("platform:ub").unwrap();
        assert!(!node.is_terminal());
        assert_eq!(node.child_keys(), vec!["untu"]);
    }

    #[test]
    fn test_key_that_is_prefix_of_another() {
        let trie = Trie::build(["role:web", "role:web_server", "role:"]).unwrap();

        assert!(trie.accepts("role:web"));
        assert!(trie.accepts("role:web_server"));
        assert!(trie.accepts("role:"));

        let node = trie.has_prefix("role:").unwrap();
        assert!(node.is_terminal());
        assert_eq!(node.child_keys(), vec!["", "web", "web_server"]);
    }

    #[test]
    fn test_duplicate_keys_counted_once() {
        let trie = Trie::build(["a:1", "a:1", "a:2"]).unwrap();
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.keys(), vec!["a:1", "a:2"]);
    }

    #[test]
    fn test_multibyte_characters_split_on_boundaries() {
        // 'é' and 'è' share their first UTF-8 byte
        let trie = Trie::build(["city:café", "city:cafè", "city:caf"]).unwrap();

        assert!(trie.accepts("city:café"));
        assert!(trie.accepts("city:cafè"));
        assert!(trie.accepts("city:caf"));
        assert!(!trie.accepts("city:cafe"));

        let node = trie.has_prefix("city:caf").unwrap();
        assert_eq!(node.child_keys(), vec!["", "è", "é"]);
    }

    #[test]
    fn test_shared_prefixes_share_nodes() {
        // root, the `platform:` branch point and three leaves
        let trie = Trie::build(["platform:ubuntu", "platform:centos", "name:foo"]).unwrap();
        assert_eq!(trie.node_count(), 5);

        let trie = Trie::build(["platform:ubuntu", "platform:ubuntu"]).unwrap();
        assert_eq!(trie.node_count(), 2);
    }

    #[test]
    fn test_empty_trie() {
        let trie = Trie::empty();
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
        assert!(!trie.accepts("a:b"));
        assert!(trie.keys().is_empty());
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("abc", "abd"), 2);
        assert_eq!(common_prefix_len("abc", "xyz"), 0);
        assert_eq!(common_prefix_len("é", "è"), 0);
        assert_eq!(common_prefix_len("aé", "aé!"), 3);
    }
}
