//! Flat, serializable form of a [`BkTree`](crate::BkTree).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use perceptual::Fingerprint;
use serde::{Deserialize, Serialize};

/// One arena node: its fingerprint, owning id, and `edge distance → node index` children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub fingerprint: Fingerprint,
    pub id: String,
    pub children: BTreeMap<u32, usize>,
}

/// Snapshot of a whole tree. Node 0 is the root; `count` equals `nodes.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub count: usize,
    pub updated_at: DateTime<Utc>,
}

impl TreeSnapshot {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            count: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
