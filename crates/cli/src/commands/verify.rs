use anyhow::Context;
use flashguard::image::FirmwareImage;
use flashguard::verify::{scan_blocks, LogProgress, Progress, Silent, Verdict, VerifyReport};
use flashguard::FlashError;
use flashguard_store::blockmap;
use flashguard_store::dump::FlashDump;

/// Re-reads the staged image from a flash dump and compares it with the
/// source file.
pub fn run(
    dump_path: &str,
    image_path: &str,
    map_path: &str,
    user_start: u64,
    verbose: bool,
) -> anyhow::Result<VerifyReport> {
    let flash = FlashDump::open(dump_path, user_start).context("Failed to open flash dump")?;
    let recorded = blockmap::read_file(map_path).context("Failed to read block map")?;
    let mut image = FirmwareImage::open(image_path).context("Failed to open firmware image")?;

    if recorded.fw_size != image.len() {
        anyhow::bail!(
            "block map was recorded for {} bytes but {} is {} bytes",
            recorded.fw_size,
            image_path,
            image.len()
        );
    }

    // Full pass over the source before any compare.
    image.drain()?;
    image.rewind()?;

    if verbose {
        println!("Verifying sector data: {} blocks", recorded.map.len());
    }
    let mut progress: Box<dyn Progress> = if verbose {
        Box::new(LogProgress)
    } else {
        Box::new(Silent)
    };

    match scan_blocks(&flash, &mut image, &recorded.map, progress.as_mut())? {
        Verdict::Verified(report) => {
            println!("\n✅ VERIFIED\n");
            println!("Blocks: {}", report.blocks);
            println!("Bytes:  {}\n", report.bytes);
            Ok(report)
        }
        Verdict::Mismatch { index, block_id } => {
            println!("\n❌ MISMATCH\n");
            println!("Block index: {}", index);
            println!("Block id:    {}\n", block_id);
            Err(FlashError::VerificationMismatch { index, block_id }.into())
        }
    }
}
