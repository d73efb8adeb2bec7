// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Operator-facing hold state for a corrupt filesystem region.

use core::fmt;
use core::time::Duration;
use std::io::Write;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::FlashError;
use crate::types::RegionDescriptor;

/// Longest uninterrupted sleep; bounds how late a cancellation is noticed.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Diagnostic printed while the region is held.
pub struct CorruptionNotice {
    pub region: RegionDescriptor,
}

impl fmt::Display for CorruptionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The filesystem starting at sector {} with size {} sectors looks corrupt.",
            self.region.start_sec, self.region.blocks
        )?;
        writeln!(f, "Take a snapshot of the flash and try to recover the data from it,")?;
        writeln!(f, "reformat the partition if its contents can be discarded,")?;
        writeln!(f, "or erase the whole flash and program the firmware again.")
    }
}

/// Repeats the corruption notice every `interval` until `token` is cancelled.
///
/// There is no other way out: setup stays parked here so that nothing formats
/// over data of unknown origin. Returns the error the caller should report once
/// the operator aborts.
pub fn hold_corrupted<W: Write + ?Sized>(
    region: RegionDescriptor,
    token: &CancellationToken,
    interval: Duration,
    out: &mut W,
) -> FlashError {
    let notice = CorruptionNotice { region }.to_string();
    tracing::error!(
        start_sec = region.start_sec,
        blocks = region.blocks,
        "filesystem region is not erased, waiting for operator"
    );

    let mut notices = 0u64;
    while !token.is_cancelled() {
        if let Err(e) = out.write_all(notice.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!("Failed to print corruption notice: {}", e);
        }
        notices += 1;
        sleep_unless_cancelled(token, interval);
    }

    tracing::info!("Corruption hold aborted after {} notices", notices);
    FlashError::StorageCorrupted {
        start_sec: region.start_sec,
        blocks: region.blocks,
    }
}

fn sleep_unless_cancelled(token: &CancellationToken, interval: Duration) {
    let deadline = Instant::now() + interval;
    loop {
        if token.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(POLL_SLICE));
    }
}
