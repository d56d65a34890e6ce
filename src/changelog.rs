//! Field changelogs and their per-version expansion
//!
//! A [`Changelog`] records, for every version at which the configuration
//! format changed, which fields were deprecated or introduced. Linting needs
//! the inverse view: given a version, which fields should raise a warning?
//! [`Changelog::expand`] precomputes that view as one [`FieldTree`] per
//! version:
//!
//! - a field deprecated at `V` is flagged in every version `>= V`
//! - a field introduced at `V` is flagged in every version `< V`
//!
//! Field paths are dot separated (`pipelines.*.processors`); a `*` segment
//! matches any key or sequence index at that level.

use std::collections::BTreeMap;

use semver::Version;
use serde::Serialize;

use crate::error::{ConfigError, Result};
use crate::version::parse_version;

/// Path segment matching any key or index
pub const WILDCARD: &str = "*";

/// Separator between field path segments
pub const SEPARATOR: char = '.';

/// Lifecycle event recorded for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Deprecated,
    Introduced,
}

/// A single field change introduced in a specific version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Dotted path of the changed field, may contain `*` segments
    pub field: String,
    pub kind: ChangeKind,
    /// Message reported when a document uses the field outside its valid range
    pub message: String,
}

impl Change {
    pub fn deprecated(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ChangeKind::Deprecated,
            message: message.into(),
        }
    }

    pub fn introduced(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ChangeKind::Introduced,
            message: message.into(),
        }
    }

    /// Split the field path into its segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.field.split(SEPARATOR)
    }

    /// Whether a document declaring `target` should be warned about this
    /// change declared at `declared`
    fn applies(&self, declared: &Version, target: &Version) -> bool {
        match self.kind {
            ChangeKind::Deprecated => declared <= target,
            ChangeKind::Introduced => declared > target,
        }
    }
}

/// All field changes of a configuration format, keyed by version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changelog {
    entries: BTreeMap<Version, Vec<Change>>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the changes made in `version`
    ///
    /// ```
    /// use versioned_config::{Change, Changelog};
    ///
    /// let changelog = Changelog::new()
    ///     .with_version("1.0", vec![])?
    ///     .with_version("1.1", vec![Change::introduced("token", "token was introduced in 1.1")])?;
    /// assert_eq!(changelog.len(), 2);
    /// # Ok::<(), versioned_config::ConfigError>(())
    /// ```
    pub fn with_version(mut self, version: &str, changes: Vec<Change>) -> Result<Self> {
        self.insert(parse_version(version)?, changes)?;
        Ok(self)
    }

    /// Register the changes made in `version`, failing if it is already known
    pub fn insert(&mut self, version: Version, changes: Vec<Change>) -> Result<()> {
        if self.entries.contains_key(&version) {
            return Err(ConfigError::DuplicateChangelogVersion(version));
        }
        self.entries.insert(version, changes);
        Ok(())
    }

    /// Registered versions in ascending order
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.entries.keys()
    }

    pub fn latest_version(&self) -> Option<&Version> {
        self.entries.keys().next_back()
    }

    pub fn changes(&self, version: &Version) -> Option<&[Change]> {
        self.entries.get(version).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand the changelog into one field tree per registered version
    ///
    /// When several changes land on the same path of one tree, the change
    /// declared closest to the tree's version wins (distance counted in
    /// registered versions, the older declaration winning a tie, then
    /// declaration order). A change on a parent field always shadows changes
    /// on its descendants.
    pub fn expand(&self) -> ExpandedChangelog {
        let mut trees = BTreeMap::new();

        for (target_rank, target) in self.entries.keys().enumerate() {
            let mut candidates = Vec::new();
            for (declared_rank, (declared, changes)) in self.entries.iter().enumerate() {
                for change in changes.iter().filter(|c| c.applies(declared, target)) {
                    candidates.push((target_rank.abs_diff(declared_rank), declared_rank, change));
                }
            }
            // stable, so declaration order breaks remaining ties
            candidates.sort_by_key(|(distance, declared_rank, _)| (*distance, *declared_rank));

            let mut tree = FieldTree::default();
            for (_, _, change) in candidates {
                tree.insert(change.clone());
            }
            trees.insert(target.clone(), tree);
        }

        ExpandedChangelog { trees }
    }
}

/// Node of a [`FieldTree`]: either more path segments or the governing change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldTreeNode {
    SubTree(FieldTree),
    Leaf(Change),
}

/// Hierarchical map from path segment to nested tree or terminal change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldTree {
    nodes: BTreeMap<String, FieldTreeNode>,
}

impl FieldTree {
    /// Insert a change at its field path
    ///
    /// Returns `false` when the change was discarded because an ancestor, or
    /// the path itself, already holds a change.
    pub fn insert(&mut self, change: Change) -> bool {
        let segments: Vec<String> = change.segments().map(str::to_string).collect();
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };

        let mut tree = self;
        for segment in parents {
            let node = tree
                .nodes
                .entry(segment.clone())
                .or_insert_with(|| FieldTreeNode::SubTree(FieldTree::default()));
            match node {
                FieldTreeNode::SubTree(sub) => tree = sub,
                FieldTreeNode::Leaf(_) => return false,
            }
        }

        if let Some(FieldTreeNode::Leaf(_)) = tree.nodes.get(last) {
            return false;
        }
        // replaces any subtree: the parent change governs its descendants
        tree.nodes.insert(last.clone(), FieldTreeNode::Leaf(change));
        true
    }

    /// Find the change governing `path`
    ///
    /// Each segment is matched by exact name first and `*` second. A change
    /// found before the path is exhausted governs the whole subtree.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Change> {
        let mut tree = self;
        for segment in path {
            let node = tree
                .nodes
                .get(segment.as_ref())
                .or_else(|| tree.nodes.get(WILDCARD))?;
            match node {
                FieldTreeNode::Leaf(change) => return Some(change),
                FieldTreeNode::SubTree(sub) => tree = sub,
            }
        }
        None
    }

    pub fn get(&self, segment: &str) -> Option<&FieldTreeNode> {
        self.nodes.get(segment)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every change in the tree, depth first
    pub fn changes(&self) -> Vec<&Change> {
        let mut out = Vec::new();
        for node in self.nodes.values() {
            match node {
                FieldTreeNode::Leaf(change) => out.push(change),
                FieldTreeNode::SubTree(sub) => out.extend(sub.changes()),
            }
        }
        out
    }
}

/// Per-version field trees derived from a [`Changelog`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedChangelog {
    trees: BTreeMap<Version, FieldTree>,
}

impl ExpandedChangelog {
    /// Field tree applying to `version`
    ///
    /// Versions without their own changelog entry inherit the tree of the
    /// closest earlier version. Versions older than every entry have no tree.
    pub fn tree_for(&self, version: &Version) -> Option<&FieldTree> {
        if let Some(tree) = self.trees.get(version) {
            return Some(tree);
        }
        self.trees.range(..version).next_back().map(|(_, tree)| tree)
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.trees.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Version, &FieldTree)> {
        self.trees.iter()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
