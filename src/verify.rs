// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Staged image verification.

use std::io::{Read, Seek};

use crate::error::{FlashError, Result};
use crate::image::FirmwareImage;
use crate::storage::FlashDevice;
use crate::types::BlockMap;

/// Receives `(index, total)` after each block compared equal.
pub trait Progress {
    fn block_verified(&mut self, index: usize, total: usize);
}

impl<F: FnMut(usize, usize)> Progress for F {
    fn block_verified(&mut self, index: usize, total: usize) {
        self(index, total)
    }
}

/// Discards progress.
pub struct Silent;

impl Progress for Silent {
    fn block_verified(&mut self, _index: usize, _total: usize) {}
}

/// Logs progress through `tracing`.
pub struct LogProgress;

impl Progress for LogProgress {
    fn block_verified(&mut self, index: usize, total: usize) {
        tracing::info!("{}/{}", index, total);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    pub blocks: usize,
    pub bytes: u64,
}

/// Outcome of a compare pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified(VerifyReport),
    /// First block whose staged bytes differ from the image.
    Mismatch { index: usize, block_id: u32 },
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified(_))
    }

    pub fn into_result(self) -> Result<VerifyReport> {
        match self {
            Verdict::Verified(report) => Ok(report),
            Verdict::Mismatch { index, block_id } => {
                Err(FlashError::VerificationMismatch { index, block_id })
            }
        }
    }
}

enum Stop {
    Mismatch { index: usize, block_id: u32 },
    Fail(FlashError),
}

impl From<FlashError> for Stop {
    fn from(e: FlashError) -> Self {
        Stop::Fail(e)
    }
}

/// Compares the staged blocks against the image, in map order.
///
/// The image must be positioned at its first byte. Entry `i` holds
/// `min(remaining, block_size - offset)` bytes; the pass stops at the first
/// differing block. A map that runs out before the image does, or that still
/// has entries once the image is exhausted, is a `SizeAccounting` error.
pub fn scan_blocks<F, R, P>(
    flash: &F,
    image: &mut FirmwareImage<R>,
    map: &BlockMap,
    progress: &mut P,
) -> Result<Verdict>
where
    F: FlashDevice + ?Sized,
    R: Read + Seek,
    P: Progress + ?Sized,
{
    if map.is_empty() {
        return Err(FlashError::AllocationMissing);
    }

    let block_size = flash.block_size();
    let fw_size = image.len();
    let covered = map.covered_bytes(block_size);
    let total = map.len();

    let mut staged = vec![0u8; block_size];
    let mut source = vec![0u8; block_size];

    let outcome = map
        .iter()
        .enumerate()
        .try_fold(fw_size, |remaining, (index, loc)| -> std::result::Result<u64, Stop> {
            let room = loc.capacity(block_size);
            if remaining == 0 || room == 0 {
                return Err(FlashError::SizeAccounting { fw_size, covered }.into());
            }
            let len = remaining.min(room as u64) as usize;

            flash.read(flash.staging_addr(loc.block_id, loc.offset), &mut staged[..len])?;
            image.read_exact(&mut source[..len])?;

            if staged[..len] != source[..len] {
                return Err(Stop::Mismatch {
                    index,
                    block_id: loc.block_id,
                });
            }

            progress.block_verified(index, total);
            Ok(remaining - len as u64)
        });

    match outcome {
        Ok(0) => Ok(Verdict::Verified(VerifyReport {
            blocks: total,
            bytes: fw_size,
        })),
        Ok(_) => Err(FlashError::SizeAccounting { fw_size, covered }),
        Err(Stop::Mismatch { index, block_id }) => Ok(Verdict::Mismatch { index, block_id }),
        Err(Stop::Fail(e)) => Err(e),
    }
}

/// `scan_blocks`, with a mismatch turned into `VerificationMismatch`.
pub fn verify_image<F, R, P>(
    flash: &F,
    image: &mut FirmwareImage<R>,
    map: &BlockMap,
    progress: &mut P,
) -> Result<VerifyReport>
where
    F: FlashDevice + ?Sized,
    R: Read + Seek,
    P: Progress + ?Sized,
{
    tracing::debug!("Verifying {} bytes over {} blocks", image.len(), map.len());
    let verdict = scan_blocks(flash, image, map, progress)?;
    if let Verdict::Mismatch { index, block_id } = verdict {
        tracing::error!("Staged data differs at block index {} (block id {})", index, block_id);
    }
    verdict.into_result()
}
