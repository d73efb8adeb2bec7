// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants and the runtime update configuration.

use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Size in bytes of one flash block (the erase granularity of the chip).
pub const BLOCK_SIZE: usize = 4096;

/// Value every byte of an erased NOR flash cell reads back as.
pub const ERASE_VALUE: u8 = 0xFF;

/// Default base of the user-writable area where images are staged (1MB).
pub const DEFAULT_USER_START: u64 = 0x10_0000;

/// Pause between two diagnostics while the filesystem region is reported corrupt.
pub const CORRUPT_NOTICE_INTERVAL: Duration = Duration::from_secs(3);

/// Name of the script written to a freshly formatted filesystem.
pub const BOOT_SCRIPT_NAME: &str = "boot.py";

/// Knobs for a single firmware update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Commit without re-reading the staged blocks.
    pub skip_verification: bool,
    /// Report per-block progress while verifying.
    pub verbose: bool,
    /// Erase the rest of the chip after the image has been copied.
    pub erase_all: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            skip_verification: false,
            verbose: true,
            erase_all: false,
        }
    }
}
