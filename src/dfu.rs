// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Firmware programmer seam and a simulated DFU implementation.

use crate::config::BLOCK_SIZE;
use crate::error::{FlashError, Result};
use crate::storage::{FlashDevice, SimulatedFlash};
use crate::types::{BlockLocation, BlockMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitReport {
    pub bytes_written: u64,
    pub sectors_erased: usize,
}

/// The component that owns the staged image and finally installs it.
///
/// Call order for one attempt: `begin`, `image_read` for every chunk of the
/// read-through, optionally `allocation` / `suspend` / `finalize`, then
/// `commit`.
pub trait FirmwareProgrammer {
    type Flash: FlashDevice;

    /// Flash the staged image lives on.
    fn flash(&self) -> &Self::Flash;

    /// Declares the image size and starts recording block placement.
    fn begin(&mut self, fw_size: u64);

    /// A chunk of `len` image bytes went through the filesystem.
    fn image_read(&mut self, len: usize);

    /// Block placement recorded since `begin`, if any.
    fn allocation(&self) -> Option<BlockMap>;

    /// Stops recording so that verification reads are not mistaken for staging.
    fn suspend(&mut self);

    /// Fixes how many recorded blocks the commit will copy.
    fn finalize(&mut self, block_count: usize);

    /// Installs the staged image as the running firmware.
    fn commit(&mut self, erase_all: bool) -> Result<CommitReport>;
}

/// Writes `image` into the staging blocks described by `map`, the way the
/// filesystem would have laid it out.
pub fn stage_image(flash: &mut SimulatedFlash, image: &[u8], map: &BlockMap) -> Result<()> {
    let mut pos = 0usize;
    for (loc, len) in map.chunks(image.len() as u64, flash.block_size()) {
        if len == 0 {
            break;
        }
        let addr = flash.staging_addr(loc.block_id, loc.offset);
        flash.write(addr, &image[pos..pos + len])?;
        pos += len;
    }
    if pos != image.len() {
        return Err(FlashError::SizeAccounting {
            fw_size: image.len() as u64,
            covered: map.covered_bytes(flash.block_size()),
        });
    }
    Ok(())
}

/// DFU over an in-memory chip. The image is copied from its staging blocks to
/// address zero on commit.
///
/// While capturing, every image read claims the next blocks of the placement
/// until the bytes read so far are covered. Reads after `suspend` are not
/// recorded.
pub struct SimulatedDfu {
    flash: SimulatedFlash,
    placement: Option<BlockMap>,
    fw_size: Option<u64>,
    capturing: bool,
    bytes_seen: u64,
    captured: Vec<BlockLocation>,
    block_count: Option<usize>,
}

impl SimulatedDfu {
    pub fn new(flash: SimulatedFlash) -> Self {
        Self {
            flash,
            placement: None,
            fw_size: None,
            capturing: false,
            bytes_seen: 0,
            captured: Vec::new(),
            block_count: None,
        }
    }

    /// Where the image file sits in the staging area. Without a placement the
    /// programmer records nothing and `allocation` stays `None`.
    pub fn with_placement(mut self, map: BlockMap) -> Self {
        self.placement = Some(map);
        self
    }

    /// Whether reads are currently being recorded as staging placement.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn into_flash(self) -> SimulatedFlash {
        self.flash
    }
}

impl FirmwareProgrammer for SimulatedDfu {
    type Flash = SimulatedFlash;

    fn flash(&self) -> &SimulatedFlash {
        &self.flash
    }

    fn begin(&mut self, fw_size: u64) {
        self.fw_size = Some(fw_size);
        self.capturing = true;
        self.bytes_seen = 0;
        self.captured.clear();
        self.block_count = None;
    }

    fn image_read(&mut self, len: usize) {
        if !self.capturing {
            return;
        }
        let Some(placement) = &self.placement else {
            return;
        };
        self.bytes_seen += len as u64;

        let mut covered: u64 = self
            .captured
            .iter()
            .map(|loc| loc.capacity(BLOCK_SIZE) as u64)
            .sum();
        for loc in placement.locations().iter().skip(self.captured.len()) {
            if covered >= self.bytes_seen {
                break;
            }
            covered += loc.capacity(BLOCK_SIZE) as u64;
            self.captured.push(*loc);
        }
    }

    fn allocation(&self) -> Option<BlockMap> {
        (!self.captured.is_empty()).then(|| BlockMap::new(self.captured.clone()))
    }

    fn suspend(&mut self) {
        self.capturing = false;
    }

    fn finalize(&mut self, block_count: usize) {
        self.block_count = Some(block_count);
    }

    fn commit(&mut self, erase_all: bool) -> Result<CommitReport> {
        let fw_size = self.fw_size.ok_or(FlashError::AllocationMissing)?;
        let captured = self.allocation().ok_or(FlashError::AllocationMissing)?;
        let take = self.block_count.unwrap_or(captured.len()).min(captured.len());

        // Pull the staged chunks out before any erase touches the chip.
        let mut chunks = Vec::with_capacity(take);
        for (loc, len) in captured.chunks(fw_size, BLOCK_SIZE).into_iter().take(take) {
            if len == 0 {
                break;
            }
            chunks.push(self.flash.read_vec(self.flash.staging_addr(loc.block_id, loc.offset), len)?);
        }
        let staged: u64 = chunks.iter().map(|c| c.len() as u64).sum();
        if staged != fw_size {
            return Err(FlashError::SizeAccounting {
                fw_size,
                covered: captured.covered_bytes(BLOCK_SIZE),
            });
        }

        let fw_sectors = (fw_size as usize).div_ceil(BLOCK_SIZE);
        let mut report = CommitReport::default();
        for sector in 0..fw_sectors {
            if self.flash.erase_if_dirty(sector)? {
                report.sectors_erased += 1;
            }
        }

        let mut pos = 0u64;
        for chunk in &chunks {
            self.flash.write(pos, chunk)?;
            pos += chunk.len() as u64;
        }
        report.bytes_written = pos;

        if erase_all {
            for sector in fw_sectors..self.flash.sector_count() {
                if self.flash.erase_if_dirty(sector)? {
                    report.sectors_erased += 1;
                }
            }
        }

        tracing::info!(
            "Committed {} bytes, {} sectors erased",
            report.bytes_written,
            report.sectors_erased
        );
        self.capturing = false;
        Ok(report)
    }
}
