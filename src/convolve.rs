//! Compressed-domain convolution (triple-product integrals)
//!
//! Computes the channelwise inner product of two compressed signals —
//! `Σ texelA · texelB` over the original images — without reconstructing
//! either one. The co-traversal visits only node pairs both trees resolve,
//! so cost scales with the smaller tree, not with `resolution²`.
//!
//! The algorithm is implemented once against the [`TreeView`] capability
//! trait; the in-memory pointer tree and the flat serialized array are two
//! views of the same math. A third entry point, [`convolve_flat_bounded`],
//! runs the flat traversal over a fixed-capacity ring queue the way a GPU
//! kernel must, and reports overflow as an explicit error instead of
//! silently wrapping.
//!
//! Correctness rests on the Haar basis being orthonormal over each node's
//! support: when neither side resolves a node further, the pair's entire
//! contribution contracts to `avgA·avgB + Σ coeffA[k]·coeffB[k]`.
//!
//! Author: Moroya Sakamoto

use std::collections::VecDeque;

use glam::Vec3;
use thiserror::Error;

use crate::quadtree::build::quad_butterfly_inverse;
use crate::quadtree::{CoefficientNode, FlatTree, NODE_STRIDE};

/// Ring queue capacity (in queue entries) that covered every 128×128 signal
/// pair in the reference captures. [`convolve_flat_bounded`] fails loudly
/// rather than wrapping when a pathological pair exceeds the given capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8435;

/// Errors from the bounded convolution variant.
#[derive(Error, Debug)]
pub enum ConvolveError {
    /// The fixed-capacity node-pair queue filled up.
    #[error("node-pair queue overflow: capacity of {capacity} entries exhausted")]
    QueueOverflow {
        /// Configured queue capacity in entries.
        capacity: usize,
    },
}

/// Read-only traversal capability over a compressed coefficient tree.
///
/// Both concrete representations — the owned pointer tree and the flat
/// serialized buffer — expose the same four operations, which is all the
/// convolution needs.
pub trait TreeView {
    /// Handle to one node of this view.
    type Node: Copy;

    /// The root node.
    fn root(&self) -> Self::Node;

    /// Wavelet-scaled average color of a node.
    fn average(&self, node: Self::Node) -> Vec3;

    /// Detail coefficient `k` (0 vertical, 1 horizontal, 2 diagonal).
    fn coeff(&self, node: Self::Node, k: usize) -> Vec3;

    /// Child in `quadrant`, or `None` where the tree is flat.
    fn child(&self, node: Self::Node, quadrant: usize) -> Option<Self::Node>;
}

impl<'a> TreeView for &'a CoefficientNode {
    type Node = &'a CoefficientNode;

    #[inline]
    fn root(&self) -> Self::Node {
        *self
    }

    #[inline]
    fn average(&self, node: Self::Node) -> Vec3 {
        node.average
    }

    #[inline]
    fn coeff(&self, node: Self::Node, k: usize) -> Vec3 {
        node.coeffs[k]
    }

    #[inline]
    fn child(&self, node: Self::Node, quadrant: usize) -> Option<Self::Node> {
        node.children[quadrant].as_deref()
    }
}

impl<'a> TreeView for &'a FlatTree {
    type Node = u32;

    #[inline]
    fn root(&self) -> Self::Node {
        0
    }

    #[inline]
    fn average(&self, node: Self::Node) -> Vec3 {
        FlatTree::average(self, node)
    }

    #[inline]
    fn coeff(&self, node: Self::Node, k: usize) -> Vec3 {
        FlatTree::coeff(self, node, k)
    }

    #[inline]
    fn child(&self, node: Self::Node, quadrant: usize) -> Option<Self::Node> {
        FlatTree::child(self, node, quadrant)
    }
}

/// Quadrant averages of a node, derived with the one-level inverse butterfly.
#[inline]
fn quadrant_averages<V: TreeView>(view: &V, node: V::Node) -> [Vec3; 4] {
    quad_butterfly_inverse(
        view.average(node),
        [view.coeff(node, 0), view.coeff(node, 1), view.coeff(node, 2)],
    )
}

/// Co-traverse two tree views and accumulate the channelwise inner product.
///
/// The work queue grows as needed; this variant cannot overflow.
pub fn convolve_views<A: TreeView, B: TreeView>(a: A, b: B) -> Vec3 {
    let mut total = Vec3::ZERO;
    let mut queue: VecDeque<(A::Node, B::Node)> = VecDeque::new();
    queue.push_back((a.root(), b.root()));

    while let Some((node_a, node_b)) = queue.pop_front() {
        // A quadrant is "flat" when either side stops resolving there; the
        // product cannot subdivide past the coarser signal.
        let mut flat = [false; 4];
        let mut all_flat = true;
        for (q, slot) in flat.iter_mut().enumerate() {
            if a.child(node_a, q).is_none() || b.child(node_b, q).is_none() {
                *slot = true;
            } else {
                all_flat = false;
            }
        }

        if all_flat {
            // Neither side resolves any quadrant: the orthonormal closed form
            // covers the node pair's entire support.
            total += a.average(node_a) * b.average(node_b);
            for k in 0..3 {
                total += a.coeff(node_a, k) * b.coeff(node_b, k);
            }
            continue;
        }

        let averages_a = quadrant_averages(&a, node_a);
        let averages_b = quadrant_averages(&b, node_b);
        for q in 0..4 {
            if flat[q] {
                total += averages_a[q] * averages_b[q];
            } else if let (Some(child_a), Some(child_b)) =
                (a.child(node_a, q), b.child(node_b, q))
            {
                queue.push_back((child_a, child_b));
            }
        }
    }

    total
}

/// Inner product of two pointer trees.
#[inline]
pub fn convolve(a: &CoefficientNode, b: &CoefficientNode) -> Vec3 {
    convolve_views(a, b)
}

/// Inner product of two flattened trees.
#[inline]
pub fn convolve_flat(a: &FlatTree, b: &FlatTree) -> Vec3 {
    convolve_views(a, b)
}

/// Flat-buffer convolution over a fixed-capacity circular queue.
///
/// Mirrors the pointer-free execution environment (GPU compute): node handles
/// are float-encoded record offsets and the work queue is a pre-sized ring.
/// Unlike that environment, overflow is detected and surfaced as
/// [`ConvolveError::QueueOverflow`] — never a silent wrap. `capacity` counts
/// queue entries (two per pending node pair);
/// [`DEFAULT_QUEUE_CAPACITY`] covers 128×128 signals comfortably.
pub fn convolve_flat_bounded(
    a: &FlatTree,
    b: &FlatTree,
    capacity: usize,
) -> Result<Vec3, ConvolveError> {
    let mut total = Vec3::ZERO;
    let mut queue = RingQueue::with_capacity(capacity);
    let mut high_water = 0usize;

    // Root pair: both trees start at record offset 0.
    queue.push(0.0)?;
    queue.push(0.0)?;

    while let Some(offset_a) = queue.pop() {
        let offset_b = queue.pop().unwrap_or(0.0);
        let node_a = (offset_a as usize / NODE_STRIDE) as u32;
        let node_b = (offset_b as usize / NODE_STRIDE) as u32;

        let mut flat = [false; 4];
        let mut all_flat = true;
        for (q, slot) in flat.iter_mut().enumerate() {
            if a.child(node_a, q).is_none() || b.child(node_b, q).is_none() {
                *slot = true;
            } else {
                all_flat = false;
            }
        }

        if all_flat {
            total += a.average(node_a) * b.average(node_b);
            for k in 0..3 {
                total += a.coeff(node_a, k) * b.coeff(node_b, k);
            }
            continue;
        }

        let averages_a = quadrant_averages(&a, node_a);
        let averages_b = quadrant_averages(&b, node_b);
        for q in 0..4 {
            if flat[q] {
                total += averages_a[q] * averages_b[q];
            } else if let (Some(child_a), Some(child_b)) = (a.child(node_a, q), b.child(node_b, q))
            {
                queue.push((child_a as usize * NODE_STRIDE) as f32)?;
                queue.push((child_b as usize * NODE_STRIDE) as f32)?;
                high_water = high_water.max(queue.len());
            }
        }
    }

    log::debug!(
        "bounded convolution finished: queue high-water {high_water} / {capacity}"
    );
    Ok(total)
}

/// Fixed-capacity circular queue of float-encoded record offsets.
///
/// Owned by each convolution call; never shared.
struct RingQueue {
    base: Vec<f32>,
    front: usize,
    rear: usize,
    count: usize,
}

impl RingQueue {
    fn with_capacity(capacity: usize) -> Self {
        RingQueue {
            base: vec![0.0; capacity.max(1)],
            front: 0,
            rear: 0,
            count: 0,
        }
    }

    fn push(&mut self, value: f32) -> Result<(), ConvolveError> {
        if self.count == self.base.len() {
            return Err(ConvolveError::QueueOverflow {
                capacity: self.base.len(),
            });
        }
        // Offsets are whole record strides; truncate like the flat layout does.
        self.base[self.rear] = (value as i64) as f32;
        self.rear = (self.rear + 1) % self.base.len();
        self.count += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        let value = self.base[self.front];
        self.front = (self.front + 1) % self.base.len();
        self.count -= 1;
        Some(value)
    }

    #[inline]
    fn len(&self) -> usize {
        self.count
    }
}
