// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Storage access seams.
//!
//! Everything in this crate reaches flash through these two traits so that a
//! real driver, a memory-mapped dump and an in-memory simulation are
//! interchangeable.

use crate::error::Result;
use crate::types::RegionDescriptor;

pub mod partition;
pub mod sim;

pub use partition::Partition;
pub use sim::SimulatedFlash;

/// Byte-addressable flash chip.
pub trait FlashDevice {
    /// Erase/allocation block size in bytes.
    fn block_size(&self) -> usize;

    /// Absolute address of the first user-writable byte (the staging area base).
    fn user_start(&self) -> u64;

    /// Total chip size in bytes.
    fn size(&self) -> u64;

    /// Fills `buf` with the bytes starting at absolute address `addr`.
    fn read(&self, addr: u64, buf: &mut [u8]) -> Result<()>;

    fn read_vec(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read(addr, &mut buf)?;
        Ok(buf)
    }

    /// Absolute address of `offset` inside staging block `block_id`.
    fn staging_addr(&self, block_id: u32, offset: u32) -> u64 {
        self.user_start() + block_id as u64 * self.block_size() as u64 + offset as u64
    }
}

impl<T: FlashDevice + ?Sized> FlashDevice for &T {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn user_start(&self) -> u64 {
        (**self).user_start()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read(addr, buf)
    }
}

/// Sector-addressed view of the filesystem partition.
pub trait BlockDevice {
    fn region(&self) -> RegionDescriptor;

    /// Reads whole sectors starting at partition-relative sector `n`.
    fn read_blocks(&self, n: u32, buf: &mut [u8]) -> Result<()>;
}
