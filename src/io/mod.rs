//! Persistence for baked signal sets
//!
//! One `.aprt` container holds every compressed sample point of a batch:
//! a 16-byte header with a CRC32 integrity check, then the bincode-encoded
//! signal set. The in-memory flat-array contents and ordering are the
//! contract; the framing here is only what this crate's own tooling reads
//! back.
//!
//! Author: Moroya Sakamoto

mod aprt;

pub use aprt::{load_aprt, save_aprt, AprtHeader, APRT_MAGIC, APRT_VERSION};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bake::BakedSignal;
use crate::quadtree::FlatTree;

/// File I/O errors
#[derive(Error, Debug)]
pub enum IoError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// CRC checksum mismatch
    #[error("CRC mismatch: expected {expected}, got {actual}")]
    CrcMismatch {
        /// Expected CRC value
        expected: u32,
        /// Actual CRC value
        actual: u32,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unsupported file version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u16),

    /// Signals of mixed resolutions pushed into one set
    #[error("signal resolution {actual} does not match the set's {expected}")]
    MixedResolutions {
        /// Resolution the set was created with
        expected: usize,
        /// Resolution of the rejected signal
        actual: usize,
    },
}

/// An ordered collection of flattened signals sharing one capture resolution.
///
/// This is the unit of persistence: one set per batch of sample points. The
/// per-signal start offsets (in floats, with a trailing total) reproduce the
/// index table a GPU consumer uses to jump into the concatenated buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    resolution: u32,
    signals: Vec<FlatTree>,
}

impl SignalSet {
    /// Create an empty set for signals of side length `resolution`.
    pub fn new(resolution: usize) -> Self {
        SignalSet {
            resolution: resolution as u32,
            signals: Vec::new(),
        }
    }

    /// Append a flattened signal.
    pub fn push(&mut self, signal: FlatTree) {
        self.signals.push(signal);
    }

    /// Append a baked signal, rejecting mismatched capture resolutions.
    pub fn push_baked(&mut self, baked: BakedSignal) -> Result<(), IoError> {
        if baked.resolution != self.resolution as usize {
            return Err(IoError::MixedResolutions {
                expected: self.resolution as usize,
                actual: baked.resolution,
            });
        }
        self.signals.push(baked.flat);
        Ok(())
    }

    /// Capture resolution shared by every signal in the set.
    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution as usize
    }

    /// The stored signals, in insertion order.
    #[inline]
    pub fn signals(&self) -> &[FlatTree] {
        &self.signals
    }

    /// Number of signals.
    #[inline]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// True when the set holds no signals.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Float start offset of each signal in the concatenated buffer, plus a
    /// trailing entry holding the total length.
    pub fn start_offsets(&self) -> Vec<u32> {
        let mut offsets = Vec::with_capacity(self.signals.len() + 1);
        let mut cursor = 0u32;
        for signal in &self.signals {
            offsets.push(cursor);
            cursor += signal.as_floats().len() as u32;
        }
        offsets.push(cursor);
        offsets
    }

    /// All signals concatenated into one upload-ready float buffer.
    pub fn concatenated(&self) -> Vec<f32> {
        let total: usize = self.signals.iter().map(|s| s.as_floats().len()).sum();
        let mut data = Vec::with_capacity(total);
        for signal in &self.signals {
            data.extend_from_slice(signal.as_floats());
        }
        data
    }

    /// Total serialized node count across the set.
    pub fn node_count(&self) -> usize {
        self.signals.iter().map(|s| s.node_count()).sum()
    }
}
