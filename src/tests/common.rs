// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::cell::RefCell;

use crate::config::BLOCK_SIZE;
use crate::dfu::stage_image;
use crate::error::Result;
use crate::storage::{FlashDevice, SimulatedFlash};
use crate::types::BlockMap;

/// Staging area starts at 256KB, chip is 512KB.
pub const USER_START: u64 = 64 * BLOCK_SIZE as u64;
pub const CHIP_SIZE: usize = 128 * BLOCK_SIZE;

/// Deterministic, non-repeating-per-block image content.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn aligned_map(block_ids: &[u32]) -> BlockMap {
    BlockMap::from_parts(block_ids, &vec![0; block_ids.len()]).unwrap()
}

pub fn staged(image: &[u8], map: &BlockMap) -> SimulatedFlash {
    let mut flash = SimulatedFlash::new(CHIP_SIZE, USER_START);
    stage_image(&mut flash, image, map).unwrap();
    flash
}

/// Records every read issued against the wrapped chip.
pub struct RecordingFlash<'a> {
    pub inner: &'a SimulatedFlash,
    pub reads: RefCell<Vec<(u64, usize)>>,
}

impl<'a> RecordingFlash<'a> {
    pub fn new(inner: &'a SimulatedFlash) -> Self {
        Self {
            inner,
            reads: RefCell::new(Vec::new()),
        }
    }
}

impl FlashDevice for RecordingFlash<'_> {
    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    fn user_start(&self) -> u64 {
        self.inner.user_start()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        self.reads.borrow_mut().push((addr, buf.len()));
        self.inner.read(addr, buf)
    }
}
