use crate::error::{Result, StoreError};
use flashguard::config::BLOCK_SIZE;
use flashguard::error::FlashError;
use flashguard::storage::{FlashDevice, SimulatedFlash};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Read-only raw flash image mapped into memory.
pub struct FlashDump {
    mmap: Mmap,
    user_start: u64,
}

impl FlashDump {
    pub fn open(path: impl AsRef<Path>, user_start: u64) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(StoreError::InvalidFormat("flash dump is empty".to_string()));
        }
        // The dump is only ever read; nothing else writes it while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap, user_start })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn sector_count(&self) -> usize {
        self.mmap.len() / BLOCK_SIZE
    }

    /// Copies the dump into a mutable in-memory chip.
    pub fn to_simulated(&self) -> SimulatedFlash {
        SimulatedFlash::from_bytes(self.mmap.to_vec(), self.user_start)
    }
}

impl FlashDevice for FlashDump {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn user_start(&self) -> u64 {
        self.user_start
    }

    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> flashguard::Result<()> {
        let len = buf.len();
        let start = usize::try_from(addr).map_err(|_| FlashError::OutOfBounds { addr, len })?;
        let src = start
            .checked_add(len)
            .and_then(|end| self.mmap.get(start..end))
            .ok_or(FlashError::OutOfBounds { addr, len })?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Writes `flash` to `path` through a temporary file and a rename so a
/// crash never leaves a half-written dump behind.
pub fn save(path: impl AsRef<Path>, flash: &SimulatedFlash) -> Result<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(flash.as_bytes())?;
        file.sync_data()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
