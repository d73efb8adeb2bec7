// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlashError {
    /// The programmer has no block/offset map for the staged image.
    #[error("no block allocation recorded for the staged image")]
    AllocationMissing,
    /// Staged data differs from the source image.
    #[error("data differs at block index {index} (block id {block_id})")]
    VerificationMismatch { index: usize, block_id: u32 },
    /// The allocator's block and offset lists are not the same length.
    #[error("allocator reported {block_ids} block ids but {offsets} offsets")]
    AllocationShape { block_ids: usize, offsets: usize },
    /// Block map and declared image size do not reconcile.
    #[error("block map covers {covered} bytes but the image is {fw_size} bytes")]
    SizeAccounting { fw_size: u64, covered: u64 },
    /// The filesystem region holds non-erased data and the operator aborted the wait.
    #[error("filesystem at sector {start_sec} ({blocks} sectors) looks corrupt")]
    StorageCorrupted { start_sec: u32, blocks: u32 },
    #[error("access of {len} bytes at {addr:#x} is outside the device")]
    OutOfBounds { addr: u64, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FlashError>;
