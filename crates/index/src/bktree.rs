//! Burkhard-Keller tree over Hamming distance.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to their children by index,
//! keyed by the edge distance to the parent. Node 0 is the root. The tree
//! is never rebalanced; its shape depends on insertion order and is exposed
//! through [`BkTree::stats`].
//!
//! For every edge `parent -(d)-> child`, `d == hamming(parent, child)`. The
//! triangle inequality then bounds which subtrees can hold a match: with
//! `d = hamming(query, node)`, only children on edges in `[d - t, d + t]`
//! need to be visited for a threshold `t`.

use std::collections::BTreeMap;

use chrono::Utc;
use perceptual::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::snapshot::{SnapshotNode, TreeSnapshot};
use crate::IndexError;

#[derive(Debug, Clone)]
struct Node {
    fingerprint: Fingerprint,
    id: String,
    children: BTreeMap<u32, usize>,
}

/// A single range-search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMatch {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub distance: u32,
}

/// Shape summary of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    pub size: usize,
    /// Nodes on the longest root-to-leaf path.
    pub max_depth: usize,
    /// Mean child count over nodes that have children.
    pub avg_branching: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BkTree {
    nodes: Vec<Node>,
}

impl BkTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert `fingerprint` owned by `id`. Duplicate fingerprints and ids are kept.
    pub fn insert(&mut self, fingerprint: Fingerprint, id: impl Into<String>) {
        let id = id.into();
        let new_idx = self.nodes.len();
        if self.nodes.is_empty() {
            self.nodes.push(Node {
                fingerprint,
                id,
                children: BTreeMap::new(),
            });
            return;
        }

        let mut current = 0usize;
        loop {
            let d = self.nodes[current].fingerprint.hamming_distance(&fingerprint);
            match self.nodes[current].children.get(&d) {
                Some(&child) => current = child,
                None => {
                    self.nodes[current].children.insert(d, new_idx);
                    break;
                }
            }
        }
        self.nodes.push(Node {
            fingerprint,
            id,
            children: BTreeMap::new(),
        });
    }

    /// Every entry within `threshold` of `query`, ascending by distance then id.
    pub fn search(&self, query: &Fingerprint, threshold: u32) -> Vec<TreeMatch> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }

        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            let d = node.fingerprint.hamming_distance(query);
            if d <= threshold {
                out.push(TreeMatch {
                    id: node.id.clone(),
                    fingerprint: node.fingerprint,
                    distance: d,
                });
            }
            let lo = d.saturating_sub(threshold);
            let hi = d.saturating_add(threshold);
            stack.extend(node.children.range(lo..=hi).map(|(_, &child)| child));
        }

        out.sort_unstable_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Remove every node owned by `id`.
    ///
    /// Survivors are collected in preorder and reinserted into a fresh arena,
    /// so this is O(n) in the tree size. Returns `false` and leaves the tree
    /// untouched when no node carries `id`.
    pub fn remove(&mut self, id: &str) -> bool {
        let mut found = false;
        let mut survivors = Vec::with_capacity(self.nodes.len());
        for idx in self.preorder() {
            let node = &self.nodes[idx];
            if node.id == id {
                found = true;
            } else {
                survivors.push((node.fingerprint, node.id.clone()));
            }
        }
        if !found {
            return false;
        }

        let mut rebuilt = BkTree::new();
        rebuilt.nodes.reserve(survivors.len());
        for (fingerprint, owner) in survivors {
            rebuilt.insert(fingerprint, owner);
        }
        *self = rebuilt;
        true
    }

    /// `(fingerprint, id)` pairs in preorder, children visited by ascending edge.
    pub fn entries(&self) -> Vec<(Fingerprint, &str)> {
        self.preorder()
            .into_iter()
            .map(|idx| (self.nodes[idx].fingerprint, self.nodes[idx].id.as_str()))
            .collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn stats(&self) -> TreeStats {
        if self.nodes.is_empty() {
            return TreeStats::default();
        }

        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(self.nodes[idx].children.values().map(|&c| (c, depth + 1)));
        }

        let (parents, edges) = self
            .nodes
            .iter()
            .filter(|n| !n.children.is_empty())
            .fold((0usize, 0usize), |(p, e), n| (p + 1, e + n.children.len()));
        let avg_branching = if parents == 0 {
            0.0
        } else {
            edges as f64 / parents as f64
        };

        TreeStats {
            size: self.nodes.len(),
            max_depth,
            avg_branching,
        }
    }

    /// Flatten into a serializable snapshot stamped with the current time.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|n| SnapshotNode {
                    fingerprint: n.fingerprint,
                    id: n.id.clone(),
                    children: n.children.clone(),
                })
                .collect(),
            count: self.nodes.len(),
            updated_at: Utc::now(),
        }
    }

    /// Rebuild a tree from a snapshot, rejecting anything that is not a
    /// well-formed BK-tree rooted at node 0.
    pub fn from_snapshot(snapshot: TreeSnapshot) -> Result<Self, IndexError> {
        let nodes = snapshot.nodes;
        let n = nodes.len();
        if snapshot.count != n {
            return Err(IndexError::CorruptSnapshot(format!(
                "count {} does not match {} nodes",
                snapshot.count, n
            )));
        }

        let mut referenced = vec![0u32; n];
        for (idx, node) in nodes.iter().enumerate() {
            for (&edge, &child) in &node.children {
                if child >= n {
                    return Err(IndexError::CorruptSnapshot(format!(
                        "node {idx} references missing child {child}"
                    )));
                }
                if child == 0 {
                    return Err(IndexError::CorruptSnapshot(format!(
                        "node {idx} references the root"
                    )));
                }
                let actual = node.fingerprint.hamming_distance(&nodes[child].fingerprint);
                if actual != edge {
                    return Err(IndexError::CorruptSnapshot(format!(
                        "edge {idx}->{child} labelled {edge} but distance is {actual}"
                    )));
                }
                referenced[child] += 1;
            }
        }
        if let Some(orphan) = (1..n).find(|&i| referenced[i] != 1) {
            return Err(IndexError::CorruptSnapshot(format!(
                "node {orphan} is referenced {} times",
                referenced[orphan]
            )));
        }

        let tree = BkTree {
            nodes: nodes
                .into_iter()
                .map(|s| Node {
                    fingerprint: s.fingerprint,
                    id: s.id,
                    children: s.children,
                })
                .collect(),
        };
        // Single parents alone still allow detached cycles.
        if tree.preorder().len() != n {
            return Err(IndexError::CorruptSnapshot(
                "nodes unreachable from the root".into(),
            ));
        }
        Ok(tree)
    }

    fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            order.push(idx);
            stack.extend(self.nodes[idx].children.values().rev().copied());
        }
        order
    }
}
