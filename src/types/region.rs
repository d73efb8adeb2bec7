// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Filesystem partition geometry.

use serde::{Deserialize, Serialize};

use crate::config::BLOCK_SIZE;

/// Sector range `[start_sec, start_sec + blocks)` reserved for the filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub start_sec: u32,
    pub blocks: u32,
    pub sec_size: usize,
}

impl RegionDescriptor {
    pub fn new(start_sec: u32, blocks: u32) -> Self {
        Self {
            start_sec,
            blocks,
            sec_size: BLOCK_SIZE,
        }
    }

    pub fn with_sec_size(mut self, sec_size: usize) -> Self {
        self.sec_size = sec_size;
        self
    }

    /// Absolute byte address of sector `n` of the region.
    pub fn sector_addr(&self, n: u32) -> u64 {
        (self.start_sec as u64 + n as u64) * self.sec_size as u64
    }

    /// One past the last byte of the region.
    pub fn end_addr(&self) -> u64 {
        self.sector_addr(self.blocks)
    }
}
