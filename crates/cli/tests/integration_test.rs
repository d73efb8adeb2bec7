use core::time::Duration;
use flashguard::config::{UpdateConfig, DEFAULT_USER_START};
use flashguard::storage::FlashDevice;
use flashguard::FlashError;
use flashguard_cli::commands::{bootsec, inspect, update, verify};
use flashguard_store::dump::FlashDump;
use flashguard_store::fixtures;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn s(p: &std::path::Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_integration_workflow() {
    let dir = tempdir().unwrap();
    let paths = fixtures::generate_update_scenario(dir.path()).unwrap();

    let report = inspect::run(
        s(&paths.dump),
        Some(s(&paths.map)),
        Some(fixtures::fixture_region()),
        DEFAULT_USER_START,
        false,
    )
    .unwrap();
    let map = report.map.unwrap();
    assert_eq!(map.blocks, 3);
    assert!(map.in_bounds);
    assert!(report.boot_sector.unwrap().is_empty());

    let result = verify::run(s(&paths.dump), s(&paths.image), s(&paths.map), DEFAULT_USER_START, false);
    assert!(result.is_ok(), "Verification should succeed on valid fixtures");

    let result = bootsec::run(s(&paths.dump), fixtures::fixture_region(), false);
    assert!(result.is_ok());
}

#[test]
fn test_verify_reports_corrupted_block() {
    let dir = tempdir().unwrap();
    let paths = fixtures::generate_update_scenario(dir.path()).unwrap();
    fixtures::corrupt_staged_byte(&paths, 5000).unwrap();

    let err = verify::run(s(&paths.dump), s(&paths.image), s(&paths.map), DEFAULT_USER_START, false)
        .unwrap_err();
    match err.downcast_ref::<FlashError>() {
        Some(FlashError::VerificationMismatch { index, block_id }) => {
            assert_eq!((*index, *block_id), (1, 7));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_verify_rejects_wrong_image() {
    let dir = tempdir().unwrap();
    let paths = fixtures::generate_update_scenario(dir.path()).unwrap();
    std::fs::write(&paths.image, fixtures::image_bytes(9000)).unwrap();

    let result = verify::run(s(&paths.dump), s(&paths.image), s(&paths.map), DEFAULT_USER_START, false);
    assert!(result.is_err());
}

#[test]
fn test_update_installs_image() {
    let dir = tempdir().unwrap();
    let paths = fixtures::generate_update_scenario(dir.path()).unwrap();

    let config = UpdateConfig {
        verbose: false,
        ..UpdateConfig::default()
    };
    let report = update::run(s(&paths.dump), s(&paths.image), s(&paths.map), DEFAULT_USER_START, config)
        .unwrap();
    assert!(report.verified);
    assert_eq!(report.bytes_written, fixtures::IMAGE_SIZE as u64);

    let flash = FlashDump::open(&paths.dump, DEFAULT_USER_START).unwrap();
    assert_eq!(
        flash.read_vec(0, fixtures::IMAGE_SIZE).unwrap(),
        fixtures::image_bytes(fixtures::IMAGE_SIZE)
    );
}

#[test]
fn test_failed_update_leaves_dump_untouched() {
    let dir = tempdir().unwrap();
    let paths = fixtures::generate_update_scenario(dir.path()).unwrap();
    fixtures::corrupt_staged_byte(&paths, 9999).unwrap();
    let before = std::fs::read(&paths.dump).unwrap();

    let result = update::run(
        s(&paths.dump),
        s(&paths.image),
        s(&paths.map),
        DEFAULT_USER_START,
        UpdateConfig::default(),
    );
    assert!(result.is_err());
    assert_eq!(std::fs::read(&paths.dump).unwrap(), before);
}

#[test]
fn test_dirty_boot_sector() {
    let dir = tempdir().unwrap();
    let paths = fixtures::generate_update_scenario(dir.path()).unwrap();
    let region = fixtures::fixture_region();
    fixtures::dirty_boot_sector(&paths.dump, region).unwrap();

    // Without --wait the check fails straight away.
    let mut out: Vec<u8> = Vec::new();
    let err = bootsec::run_with(
        s(&paths.dump),
        region,
        false,
        &CancellationToken::new(),
        Duration::ZERO,
        &mut out,
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FlashError>(),
        Some(FlashError::StorageCorrupted { .. })
    ));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("first at offset 100"));
    assert!(text.contains("looks corrupt"));

    // With --wait it holds until cancelled.
    let token = CancellationToken::new();
    token.cancel();
    let result = bootsec::run_with(s(&paths.dump), region, true, &token, Duration::ZERO, &mut Vec::<u8>::new());
    assert!(result.is_err());

    let report = inspect::run(s(&paths.dump), None, Some(region), DEFAULT_USER_START, true).unwrap();
    assert_eq!(report.boot_sector.unwrap().dirty_bytes, 8);
}
