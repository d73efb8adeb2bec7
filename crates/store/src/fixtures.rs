use crate::blockmap;
use crate::dump;
use crate::error::{Result, StoreError};

use flashguard::config::{BLOCK_SIZE, DEFAULT_USER_START};
use flashguard::dfu::stage_image;
use flashguard::storage::{FlashDevice, SimulatedFlash};
use flashguard::types::{BlockMap, RegionDescriptor};

use std::fs;
use std::path::{Path, PathBuf};

/// 2MB chip with images staged from `DEFAULT_USER_START`.
pub const CHIP_SIZE: usize = 2 * 1024 * 1024;
pub const IMAGE_SIZE: usize = 10_000;
pub const STAGING_BLOCKS: [u32; 3] = [3, 7, 5];

pub struct TestPaths {
    pub dump: PathBuf,
    pub image: PathBuf,
    pub map: PathBuf,
}

/// Filesystem partition used by the fixtures: the last 256KB of the chip.
pub fn fixture_region() -> RegionDescriptor {
    RegionDescriptor::new(448, 64)
}

pub fn image_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Writes `flash.bin`, `firmware.bin` and `firmware.bmap` for a 10,000 byte
/// image staged in blocks 3, 7 and 5 of the user area. The filesystem
/// partition is left erased.
pub fn generate_update_scenario(dir: &Path) -> Result<TestPaths> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let image = image_bytes(IMAGE_SIZE);
    let map = BlockMap::from_parts(&STAGING_BLOCKS, &[0, 0, 0])?;

    let mut chip = SimulatedFlash::new(CHIP_SIZE, DEFAULT_USER_START);
    stage_image(&mut chip, &image, &map)?;

    let paths = TestPaths {
        dump: dir.join("flash.bin"),
        image: dir.join("firmware.bin"),
        map: dir.join("firmware.bmap"),
    };
    dump::save(&paths.dump, &chip)?;
    fs::write(&paths.image, &image)?;
    blockmap::write_to(&paths.map, image.len() as u64, &map)?;

    Ok(paths)
}

/// Flips the staged copy of image byte `offset` inside the dump.
pub fn corrupt_staged_byte(paths: &TestPaths, offset: usize) -> Result<()> {
    let recorded = blockmap::read_file(&paths.map)?;
    let mut chip = dump::FlashDump::open(&paths.dump, DEFAULT_USER_START)?.to_simulated();

    let mut start = 0usize;
    for (loc, len) in recorded.map.chunks(recorded.fw_size, BLOCK_SIZE) {
        if offset < start + len {
            let addr = chip.staging_addr(loc.block_id, loc.offset) + (offset - start) as u64;
            let old = chip.read_vec(addr, 1)?;
            chip.poke(addr, &[!old[0]])?;
            return dump::save(&paths.dump, &chip);
        }
        start += len;
    }
    Err(StoreError::InvalidFormat(format!(
        "offset {} is past the staged image",
        offset
    )))
}

/// Leaves a few programmed bytes in the first sector of `region`.
pub fn dirty_boot_sector(dump_path: &Path, region: RegionDescriptor) -> Result<()> {
    let mut chip = dump::FlashDump::open(dump_path, DEFAULT_USER_START)?.to_simulated();
    chip.write(region.sector_addr(0) + 100, b"littlefs")?;
    dump::save(dump_path, &chip)
}
