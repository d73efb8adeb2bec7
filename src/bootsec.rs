// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Boot sector emptiness check.
//!
//! Only sector 0 of the partition is read. A clean first sector is taken as
//! evidence that the whole partition was never formatted; leftover data
//! further in is not detected. This is a heuristic, not a full scan.

use serde::Serialize;

use crate::config::ERASE_VALUE;
use crate::error::Result;
use crate::storage::BlockDevice;

/// What the first sector of the partition looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BootSectorReport {
    pub sec_size: usize,
    /// Offset of the first byte that is not `ERASE_VALUE`.
    pub first_dirty: Option<usize>,
    /// Number of bytes that are not `ERASE_VALUE`.
    pub dirty_bytes: usize,
}

impl BootSectorReport {
    pub fn is_empty(&self) -> bool {
        self.first_dirty.is_none()
    }
}

pub fn is_erased(buf: &[u8]) -> bool {
    buf.iter().all(|&b| b == ERASE_VALUE)
}

fn read_boot_sector<D: BlockDevice + ?Sized>(dev: &D) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; dev.region().sec_size];
    dev.read_blocks(0, &mut buf)?;
    Ok(buf)
}

/// True when sector 0 of the partition is fully erased.
pub fn check_boot_sector<D: BlockDevice + ?Sized>(dev: &D) -> Result<bool> {
    Ok(is_erased(&read_boot_sector(dev)?))
}

/// Like `check_boot_sector` but scans the whole sector for a report.
pub fn inspect_boot_sector<D: BlockDevice + ?Sized>(dev: &D) -> Result<BootSectorReport> {
    let buf = read_boot_sector(dev)?;
    Ok(BootSectorReport {
        sec_size: buf.len(),
        first_dirty: buf.iter().position(|&b| b != ERASE_VALUE),
        dirty_bytes: buf.iter().filter(|&&b| b != ERASE_VALUE).count(),
    })
}
