// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use proptest::prelude::*;

use super::common::{aligned_map, pattern, staged, RecordingFlash, USER_START};
use crate::config::BLOCK_SIZE;
use crate::dfu::stage_image;
use crate::error::FlashError;
use crate::image::FirmwareImage;
use crate::storage::{FlashDevice, SimulatedFlash};
use crate::types::{BlockLocation, BlockMap};
use crate::verify::{scan_blocks, verify_image, Silent, Verdict, VerifyReport};

const BS: u64 = BLOCK_SIZE as u64;

#[test]
fn test_ten_thousand_byte_image_reads_three_chunks() {
    let image = pattern(10_000);
    let map = aligned_map(&[3, 7, 5]);
    let flash = staged(&image, &map);
    let recorder = RecordingFlash::new(&flash);

    let verdict = scan_blocks(
        &recorder,
        &mut FirmwareImage::from_bytes(image),
        &map,
        &mut Silent,
    )
    .unwrap();

    assert_eq!(
        verdict,
        Verdict::Verified(VerifyReport {
            blocks: 3,
            bytes: 10_000
        })
    );
    assert_eq!(
        *recorder.reads.borrow(),
        vec![
            (USER_START + 3 * BS, 4096),
            (USER_START + 7 * BS, 4096),
            (USER_START + 5 * BS, 1808),
        ]
    );
}

#[test]
fn test_corrupt_byte_5000_fails_at_second_block() {
    let image = pattern(10_000);
    let map = aligned_map(&[3, 7, 5]);
    let mut flash = staged(&image, &map);

    // Global offset 5000 lands 904 bytes into block 7.
    let addr = flash.staging_addr(7, 0) + 904;
    flash.poke(addr, &[!image[5000]]).unwrap();

    let verdict = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap();
    assert_eq!(verdict, Verdict::Mismatch { index: 1, block_id: 7 });
}

#[test]
fn test_mismatch_stops_the_scan() {
    let image = pattern(3 * BLOCK_SIZE);
    let map = aligned_map(&[0, 1, 2]);
    let mut flash = staged(&image, &map);
    flash.poke(flash.staging_addr(1, 0), &[!image[BLOCK_SIZE]]).unwrap();

    let recorder = RecordingFlash::new(&flash);
    let mut seen = Vec::new();
    let mut progress = |i: usize, total: usize| seen.push((i, total));
    let verdict = scan_blocks(
        &recorder,
        &mut FirmwareImage::from_bytes(image),
        &map,
        &mut progress,
    )
    .unwrap();

    assert!(!verdict.is_verified());
    assert_eq!(seen, vec![(0, 3)]);
    // Block 2 is never read.
    assert_eq!(recorder.reads.borrow().len(), 2);
}

#[test]
fn test_progress_reports_every_block() {
    let image = pattern(2 * BLOCK_SIZE + 1);
    let map = aligned_map(&[9, 4, 6]);
    let flash = staged(&image, &map);

    let mut seen = Vec::new();
    let mut progress = |i: usize, total: usize| seen.push((i, total));
    verify_image(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut progress).unwrap();

    assert_eq!(seen, vec![(0, 3), (1, 3), (2, 3)]);
}

#[test]
fn test_intra_block_offsets() {
    let image = pattern(BLOCK_SIZE - 100 + 50);
    let map = BlockMap::new(vec![BlockLocation::new(2, 100), BlockLocation::new(4, 0)]);
    let flash = staged(&image, &map);
    let recorder = RecordingFlash::new(&flash);

    let report = verify_image(&recorder, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap();
    assert_eq!(report.blocks, 2);
    assert_eq!(
        *recorder.reads.borrow(),
        vec![(USER_START + 2 * BS + 100, 3996), (USER_START + 4 * BS, 50)]
    );
}

#[test]
fn test_image_longer_than_map_is_size_error() {
    let image = pattern(5000);
    let map = aligned_map(&[1]);
    let mut flash = SimulatedFlash::new(super::common::CHIP_SIZE, USER_START);
    stage_image(&mut flash, &image[..BLOCK_SIZE], &map).unwrap();

    let err = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap_err();
    assert!(matches!(
        err,
        FlashError::SizeAccounting {
            fw_size: 5000,
            covered: 4096
        }
    ));
}

#[test]
fn test_map_longer_than_image_is_size_error() {
    let image = pattern(100);
    let map = aligned_map(&[1, 2]);
    let flash = staged(&image, &aligned_map(&[1]));

    let err = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap_err();
    assert!(matches!(err, FlashError::SizeAccounting { fw_size: 100, .. }));
}

#[test]
fn test_offset_past_block_is_size_error() {
    let image = pattern(10);
    let map = BlockMap::new(vec![BlockLocation::new(0, BLOCK_SIZE as u32)]);
    let flash = SimulatedFlash::new(super::common::CHIP_SIZE, USER_START);

    let err = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap_err();
    assert!(matches!(err, FlashError::SizeAccounting { .. }));
}

#[test]
fn test_empty_map_is_allocation_missing() {
    let flash = SimulatedFlash::new(super::common::CHIP_SIZE, USER_START);
    let err = scan_blocks(
        &flash,
        &mut FirmwareImage::from_bytes(pattern(10)),
        &BlockMap::default(),
        &mut Silent,
    )
    .unwrap_err();
    assert!(matches!(err, FlashError::AllocationMissing));
}

#[test]
fn test_verify_image_reports_mismatch_as_error() {
    let image = pattern(BLOCK_SIZE);
    let map = aligned_map(&[12]);
    let mut flash = staged(&image, &map);
    flash.poke(flash.staging_addr(12, 0) + 4095, &[!image[4095]]).unwrap();

    let err = verify_image(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap_err();
    assert!(matches!(
        err,
        FlashError::VerificationMismatch {
            index: 0,
            block_id: 12
        }
    ));
}

#[test]
fn test_staging_outside_chip_is_reported() {
    let image = pattern(10);
    let map = aligned_map(&[1000]);
    let flash = SimulatedFlash::new(super::common::CHIP_SIZE, USER_START);

    let err = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap_err();
    assert!(matches!(err, FlashError::OutOfBounds { .. }));
}

/// Map of distinct blocks with the given offsets, trimmed to what `size` needs.
fn map_for(size: usize, offsets: &[u32]) -> BlockMap {
    let mut covered = 0usize;
    offsets
        .iter()
        .enumerate()
        .take_while(|&(_, &off)| {
            let keep = covered < size;
            covered += BLOCK_SIZE - off as usize;
            keep
        })
        .map(|(i, &off)| BlockLocation::new(2 * i as u32 + 1, off))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_untampered_image_verifies(
        size in 1usize..=6 * 2048,
        offsets in proptest::collection::vec(0u32..2048, 6),
    ) {
        let image = pattern(size);
        let map = map_for(size, &offsets);
        let flash = staged(&image, &map);

        let verdict = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap();
        prop_assert_eq!(verdict, Verdict::Verified(VerifyReport { blocks: map.len(), bytes: size as u64 }));
    }

    #[test]
    fn prop_single_flip_reports_covering_block(
        size in 1usize..=6 * 2048,
        offsets in proptest::collection::vec(0u32..2048, 6),
        pick in any::<prop::sample::Index>(),
    ) {
        let image = pattern(size);
        let map = map_for(size, &offsets);
        let mut flash = staged(&image, &map);

        let k = pick.index(size);
        let mut start = 0usize;
        let mut expected = None;
        for (i, (loc, len)) in map.chunks(size as u64, BLOCK_SIZE).into_iter().enumerate() {
            if k < start + len {
                let addr = flash.staging_addr(loc.block_id, loc.offset) + (k - start) as u64;
                flash.poke(addr, &[!image[k]]).unwrap();
                expected = Some((i, loc.block_id));
                break;
            }
            start += len;
        }
        let (index, block_id) = expected.unwrap();

        let verdict = scan_blocks(&flash, &mut FirmwareImage::from_bytes(image), &map, &mut Silent).unwrap();
        prop_assert_eq!(verdict, Verdict::Mismatch { index, block_id });
    }
}
