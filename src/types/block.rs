// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block locations of a staged firmware image.

use serde::{Deserialize, Serialize};

use crate::error::{FlashError, Result};

/// One staged chunk: a flash block (relative to the user area) and the byte
/// offset inside it where the chunk starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLocation {
    pub block_id: u32,
    pub offset: u32,
}

impl BlockLocation {
    pub fn new(block_id: u32, offset: u32) -> Self {
        Self { block_id, offset }
    }

    /// Bytes this location can hold before the end of its block.
    /// Zero when the offset is past the block.
    pub fn capacity(&self, block_size: usize) -> usize {
        block_size.saturating_sub(self.offset as usize)
    }
}

/// Ordered block/offset pairs produced by the staging allocator.
///
/// The order is the order of the image bytes: entry `i` holds the chunk that
/// follows entry `i - 1`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMap(Vec<BlockLocation>);

impl BlockMap {
    pub fn new(locations: Vec<BlockLocation>) -> Self {
        Self(locations)
    }

    /// Builds a map from the two parallel lists an allocator usually reports.
    /// Both lists must have one entry per staged block.
    pub fn from_parts(block_ids: &[u32], offsets: &[u32]) -> Result<Self> {
        if block_ids.len() != offsets.len() {
            return Err(FlashError::AllocationShape {
                block_ids: block_ids.len(),
                offsets: offsets.len(),
            });
        }
        Ok(Self(
            block_ids
                .iter()
                .zip(offsets)
                .map(|(&block_id, &offset)| BlockLocation { block_id, offset })
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockLocation> {
        self.0.iter()
    }

    pub fn locations(&self) -> &[BlockLocation] {
        &self.0
    }

    /// Total bytes the map can describe.
    pub fn covered_bytes(&self, block_size: usize) -> u64 {
        self.0.iter().map(|loc| loc.capacity(block_size) as u64).sum()
    }

    /// Splits an image of `fw_size` bytes over the map: `(location, chunk_len)`
    /// per entry, chunk lengths shrinking to zero once the image is exhausted.
    pub fn chunks(&self, fw_size: u64, block_size: usize) -> Vec<(BlockLocation, usize)> {
        let mut remaining = fw_size;
        self.0
            .iter()
            .map(|loc| {
                let len = remaining.min(loc.capacity(block_size) as u64) as usize;
                remaining -= len as u64;
                (*loc, len)
            })
            .collect()
    }
}

impl FromIterator<BlockLocation> for BlockMap {
    fn from_iter<I: IntoIterator<Item = BlockLocation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BlockMap {
    type Item = &'a BlockLocation;
    type IntoIter = core::slice::Iter<'a, BlockLocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
