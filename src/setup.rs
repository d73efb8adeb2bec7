// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! First-run setup, gated on an erased filesystem region.

use core::time::Duration;
use std::io::Write;

use tokio_util::sync::CancellationToken;

use crate::bootsec::check_boot_sector;
use crate::config::BOOT_SCRIPT_NAME;
use crate::corrupt::hold_corrupted;
use crate::error::Result;
use crate::storage::BlockDevice;

/// Written to the fresh filesystem as the boot script.
pub const DEFAULT_BOOT_SCRIPT: &str = "\
# Runs on every boot, including wake from deep sleep.
import gc
gc.collect()
";

/// Services setup hands off to once the region is known to be empty.
pub trait Provisioner {
    fn activate_access_point(&mut self) -> Result<()>;
    fn format(&mut self) -> Result<()>;
    fn mount(&mut self) -> Result<()>;
    fn write_file(&mut self, name: &str, contents: &str) -> Result<()>;
}

/// Checks the boot sector and, if it is erased, formats and populates the
/// filesystem.
///
/// A non-erased boot sector parks the caller in the corruption hold until
/// `token` is cancelled, and the provisioner is never touched.
pub fn setup<D, P, W>(
    dev: &D,
    provisioner: &mut P,
    token: &CancellationToken,
    interval: Duration,
    out: &mut W,
) -> Result<()>
where
    D: BlockDevice + ?Sized,
    P: Provisioner + ?Sized,
    W: Write + ?Sized,
{
    if !check_boot_sector(dev)? {
        return Err(hold_corrupted(dev.region(), token, interval, out));
    }

    tracing::info!("Performing initial setup");
    provisioner.activate_access_point()?;
    provisioner.format()?;
    provisioner.mount()?;
    provisioner.write_file(BOOT_SCRIPT_NAME, DEFAULT_BOOT_SCRIPT)?;
    Ok(())
}
