//! Deferred block-file reads.

use std::path::PathBuf;

use aup_ir::SampleFormat;

use crate::builder::{ClipKey, TrackId};
use crate::ImportError;

/// A sample block queued during parsing and decoded afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockFileDescriptor {
    pub track: TrackId,
    /// Clip that was active when the block was seen, if any
    pub clip: Option<ClipKey>,
    /// Source file; `None` means silence
    pub path: Option<PathBuf>,
    /// Length in samples
    pub len: u64,
    /// First frame to read from the source
    pub origin: u64,
    /// Source channel to extract
    pub channel: u16,
    /// Storage format of the target clip
    pub format: SampleFormat,
}

/// Descriptors in document order, with their total length.
#[derive(Clone, Debug, Default)]
pub struct DescriptorQueue {
    items: Vec<BlockFileDescriptor>,
    total: u64,
}

impl DescriptorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a descriptor. Fails if the running total would overflow.
    pub fn push(&mut self, descriptor: BlockFileDescriptor) -> Result<(), ImportError> {
        self.total = self
            .total
            .checked_add(descriptor.len)
            .ok_or(ImportError::LengthOverflow)?;
        self.items.push(descriptor);
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BlockFileDescriptor> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all descriptor lengths.
    pub fn total_samples(&self) -> u64 {
        self.total
    }
}

impl<'a> IntoIterator for &'a DescriptorQueue {
    type Item = &'a BlockFileDescriptor;
    type IntoIter = std::slice::Iter<'a, BlockFileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
