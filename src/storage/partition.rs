// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Filesystem partition carved out of a flash chip.

use crate::error::{FlashError, Result};
use crate::storage::{BlockDevice, FlashDevice};
use crate::types::RegionDescriptor;

pub struct Partition<F> {
    flash: F,
    region: RegionDescriptor,
}

impl<F: FlashDevice> Partition<F> {
    pub fn new(flash: F, region: RegionDescriptor) -> Self {
        Self { flash, region }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: FlashDevice> BlockDevice for Partition<F> {
    fn region(&self) -> RegionDescriptor {
        self.region
    }

    fn read_blocks(&self, n: u32, buf: &mut [u8]) -> Result<()> {
        let addr = self.region.sector_addr(n);
        // Reads may not leave the partition even if the chip is larger.
        if n >= self.region.blocks || addr + buf.len() as u64 > self.region.end_addr() {
            return Err(FlashError::OutOfBounds {
                addr,
                len: buf.len(),
            });
        }
        self.flash.read(addr, buf)
    }
}
