// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Firmware update flow: stage, verify, commit.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::config::UpdateConfig;
use crate::dfu::{CommitReport, FirmwareProgrammer};
use crate::error::{FlashError, Result};
use crate::image::FirmwareImage;
use crate::verify::{verify_image, LogProgress, Silent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub fw_size: u64,
    /// Blocks compared, zero when verification was skipped.
    pub blocks: usize,
    pub verified: bool,
    pub bytes_written: u64,
    pub sectors_erased: usize,
}

pub struct FirmwareUpdater<P> {
    programmer: P,
}

impl<P: FirmwareProgrammer> FirmwareUpdater<P> {
    pub fn new(programmer: P) -> Self {
        Self { programmer }
    }

    pub fn programmer(&self) -> &P {
        &self.programmer
    }

    pub fn into_programmer(self) -> P {
        self.programmer
    }

    /// Runs one update attempt. Nothing is committed unless every staged
    /// block matched (or verification was switched off).
    pub fn run<R: Read + Seek>(
        &mut self,
        image: &mut FirmwareImage<R>,
        config: &UpdateConfig,
    ) -> Result<UpdateReport> {
        let fw_size = image.len();
        self.programmer.begin(fw_size);

        // The full read-through has to finish before anything is compared.
        let programmer = &mut self.programmer;
        image.drain_with(|n| programmer.image_read(n))?;

        let mut blocks = 0;
        if config.skip_verification {
            tracing::warn!("Skipping verification, committing unverified image");
        } else {
            let map = self
                .programmer
                .allocation()
                .ok_or(FlashError::AllocationMissing)?;
            self.programmer.suspend();
            if config.verbose {
                tracing::info!("Verifying sector data: {} blocks", map.len());
            }

            image.rewind()?;
            let report = if config.verbose {
                verify_image(self.programmer.flash(), image, &map, &mut LogProgress)?
            } else {
                verify_image(self.programmer.flash(), image, &map, &mut Silent)?
            };
            self.programmer.finalize(map.len());
            blocks = report.blocks;

            if config.verbose {
                tracing::info!("Success, starting firmware update ...");
            }
        }

        let CommitReport {
            bytes_written,
            sectors_erased,
        } = self.programmer.commit(config.erase_all)?;

        Ok(UpdateReport {
            fw_size,
            blocks,
            verified: !config.skip_verification,
            bytes_written,
            sectors_erased,
        })
    }
}
