use anyhow::Context;
use core::time::Duration;
use flashguard::bootsec::{inspect_boot_sector, BootSectorReport};
use flashguard::config::CORRUPT_NOTICE_INTERVAL;
use flashguard::corrupt::{hold_corrupted, CorruptionNotice};
use flashguard::storage::Partition;
use flashguard::types::RegionDescriptor;
use flashguard::FlashError;
use flashguard_store::dump::FlashDump;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Checks the first sector of the filesystem partition inside a flash dump.
///
/// A dirty sector is an error. With `wait` the command instead stays in the
/// corruption hold, repeating its notice until Ctrl-C.
pub fn run(
    dump_path: &str,
    region: RegionDescriptor,
    wait: bool,
) -> anyhow::Result<BootSectorReport> {
    let token = CancellationToken::new();
    if wait {
        let handler_token = token.clone();
        if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
            tracing::warn!("Could not install Ctrl-C handler: {}", e);
        }
    }
    run_with(
        dump_path,
        region,
        wait,
        &token,
        CORRUPT_NOTICE_INTERVAL,
        &mut std::io::stdout(),
    )
}

pub fn run_with<W: Write>(
    dump_path: &str,
    region: RegionDescriptor,
    wait: bool,
    token: &CancellationToken,
    interval: Duration,
    out: &mut W,
) -> anyhow::Result<BootSectorReport> {
    let flash = FlashDump::open(dump_path, 0).context("Failed to open flash dump")?;
    let partition = Partition::new(&flash, region);
    let report = inspect_boot_sector(&partition)?;

    if report.is_empty() {
        writeln!(
            out,
            "Boot sector at sector {} is erased, partition is safe to format.",
            region.start_sec
        )?;
        return Ok(report);
    }

    writeln!(
        out,
        "Boot sector holds {} programmed bytes, first at offset {}.",
        report.dirty_bytes,
        report.first_dirty.unwrap_or_default()
    )?;
    if wait {
        return Err(hold_corrupted(region, token, interval, out).into());
    }
    write!(out, "{}", CorruptionNotice { region })?;
    Err(FlashError::StorageCorrupted {
        start_sec: region.start_sec,
        blocks: region.blocks,
    }
    .into())
}
