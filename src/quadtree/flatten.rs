//! Tree serialization: pointer tree → GPU-traversable flat array
//!
//! Flattens a [`CoefficientNode`] tree into a fixed-stride float buffer that
//! environments without pointer dereferencing (GPU compute, persisted blobs)
//! can walk with integer arithmetic alone.
//!
//! Per-node record, 16 floats:
//!
//! | offsets | contents                                  |
//! |---------|-------------------------------------------|
//! | 0–2     | cell average RGB                          |
//! | 3–5     | vertical detail coefficient               |
//! | 6–8     | horizontal detail coefficient             |
//! | 9–11    | diagonal detail coefficient               |
//! | 12–15   | child slots: `child_index * 16` or `-1.0` |
//!
//! Nodes are appended breadth-first; the root is always node 0.
//!
//! Author: Moroya Sakamoto

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{CoefficientNode, TreeError};

/// Floats per serialized node record.
pub const NODE_STRIDE: usize = 16;

/// Sentinel child slot value: the quadrant does not resolve further.
pub const NO_CHILD: f32 = -1.0;

/// A flattened coefficient tree.
///
/// Wraps the raw stride-16 float buffer with typed accessors so host-side
/// consumers never repeat the offset arithmetic the GPU kernel uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTree {
    data: Vec<f32>,
}

impl FlatTree {
    /// Wrap an existing buffer, validating the stride.
    ///
    /// # Errors
    /// [`TreeError::MalformedFlatTree`] if the length is not a multiple of
    /// [`NODE_STRIDE`] or the buffer is empty.
    pub fn from_floats(data: Vec<f32>) -> Result<Self, TreeError> {
        if data.is_empty() || data.len() % NODE_STRIDE != 0 {
            return Err(TreeError::MalformedFlatTree {
                len: data.len(),
                stride: NODE_STRIDE,
            });
        }
        Ok(FlatTree { data })
    }

    /// Number of serialized nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.data.len() / NODE_STRIDE
    }

    /// The raw float buffer, ready for GPU upload or persistence.
    #[inline]
    pub fn as_floats(&self) -> &[f32] {
        &self.data
    }

    /// Buffer size in bytes.
    #[inline]
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Average color of node `node`.
    #[inline]
    pub fn average(&self, node: u32) -> Vec3 {
        let base = node as usize * NODE_STRIDE;
        Vec3::new(self.data[base], self.data[base + 1], self.data[base + 2])
    }

    /// Detail coefficient `k` (0 vertical, 1 horizontal, 2 diagonal) of node `node`.
    #[inline]
    pub fn coeff(&self, node: u32, k: usize) -> Vec3 {
        debug_assert!(k < 3);
        let base = node as usize * NODE_STRIDE + 3 + 3 * k;
        Vec3::new(self.data[base], self.data[base + 1], self.data[base + 2])
    }

    /// Child node index for `quadrant`, or `None` when the slot holds the
    /// `-1` sentinel.
    #[inline]
    pub fn child(&self, node: u32, quadrant: usize) -> Option<u32> {
        debug_assert!(quadrant < 4);
        let slot = self.data[node as usize * NODE_STRIDE + 12 + quadrant];
        if slot < 0.0 {
            None
        } else {
            Some(slot as u32 / NODE_STRIDE as u32)
        }
    }
}

/// Serialize a coefficient tree breadth-first into a [`FlatTree`].
///
/// Children are assigned indices in discovery order: each present child gets
/// the next unused node index and its slot records `index * 16` (the float
/// offset of its record), matching what a pointer-free traversal adds to
/// navigate. Output length is exactly `16 * node_count` and the operation is
/// deterministic — flattening the same tree twice yields identical buffers.
pub fn flatten_tree(root: &CoefficientNode) -> FlatTree {
    let mut data = Vec::with_capacity(root.node_count() * NODE_STRIDE);
    let mut queue: VecDeque<&CoefficientNode> = VecDeque::new();
    queue.push_back(root);
    let mut next_index = 0u32;

    while let Some(node) = queue.pop_front() {
        data.extend_from_slice(&[node.average.x, node.average.y, node.average.z]);
        for coeff in &node.coeffs {
            data.extend_from_slice(&[coeff.x, coeff.y, coeff.z]);
        }
        for child in &node.children {
            match child {
                Some(child) => {
                    next_index += 1;
                    queue.push_back(child);
                    data.push((next_index * NODE_STRIDE as u32) as f32);
                }
                None => data.push(NO_CHILD),
            }
        }
    }

    FlatTree { data }
}
