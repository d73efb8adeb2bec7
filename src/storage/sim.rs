// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory NOR flash.
//!
//! Erased cells read as `ERASE_VALUE`. Programming can only clear bits, so a
//! write over non-erased data yields the AND of old and new bytes, the same
//! way a real chip behaves when a sector is not erased first.

use crate::config::{BLOCK_SIZE, ERASE_VALUE};
use crate::error::{FlashError, Result};
use crate::storage::FlashDevice;

#[derive(Clone, Debug)]
pub struct SimulatedFlash {
    cells: Vec<u8>,
    user_start: u64,
}

impl SimulatedFlash {
    /// A fully erased chip of `size` bytes.
    pub fn new(size: usize, user_start: u64) -> Self {
        Self {
            cells: vec![ERASE_VALUE; size],
            user_start,
        }
    }

    /// Wraps an existing dump.
    pub fn from_bytes(cells: Vec<u8>, user_start: u64) -> Self {
        Self { cells, user_start }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cells
    }

    pub fn sector_count(&self) -> usize {
        self.cells.len() / BLOCK_SIZE
    }

    fn span(&self, addr: u64, len: usize) -> Result<core::ops::Range<usize>> {
        let start = usize::try_from(addr).map_err(|_| FlashError::OutOfBounds { addr, len })?;
        match start.checked_add(len) {
            Some(end) if end <= self.cells.len() => Ok(start..end),
            _ => Err(FlashError::OutOfBounds { addr, len }),
        }
    }

    /// Programs `data` at `addr`. Bits can only go from 1 to 0.
    pub fn write(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let range = self.span(addr, data.len())?;
        for (cell, &byte) in self.cells[range].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }

    /// Overwrites bytes regardless of their erase state. Used to simulate
    /// bit rot and stray writes in tests.
    pub fn poke(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let range = self.span(addr, data.len())?;
        self.cells[range].copy_from_slice(data);
        Ok(())
    }

    pub fn erase_sector(&mut self, sector: usize) -> Result<()> {
        let range = self.span((sector * BLOCK_SIZE) as u64, BLOCK_SIZE)?;
        self.cells[range].fill(ERASE_VALUE);
        Ok(())
    }

    pub fn is_sector_erased(&self, sector: usize) -> Result<bool> {
        let range = self.span((sector * BLOCK_SIZE) as u64, BLOCK_SIZE)?;
        Ok(self.cells[range].iter().all(|&b| b == ERASE_VALUE))
    }

    /// Erases `sector` only if it holds programmed data. Returns whether an
    /// erase cycle was spent.
    pub fn erase_if_dirty(&mut self, sector: usize) -> Result<bool> {
        if self.is_sector_erased(sector)? {
            return Ok(false);
        }
        self.erase_sector(sector)?;
        Ok(true)
    }
}

impl FlashDevice for SimulatedFlash {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn user_start(&self) -> u64 {
        self.user_start
    }

    fn size(&self) -> u64 {
        self.cells.len() as u64
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.span(addr, buf.len())?;
        buf.copy_from_slice(&self.cells[range]);
        Ok(())
    }
}
