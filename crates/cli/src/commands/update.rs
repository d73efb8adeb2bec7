use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use flashguard::config::UpdateConfig;
use flashguard::dfu::SimulatedDfu;
use flashguard::image::FirmwareImage;
use flashguard::update::{FirmwareUpdater, UpdateReport};
use flashguard_store::blockmap;
use flashguard_store::dump::{self, FlashDump};

/// Runs a simulated DFU against a flash dump and writes the result back.
///
/// The dump is only rewritten when the update committed.
pub fn run(
    dump_path: &str,
    image_path: &str,
    map_path: &str,
    user_start: u64,
    config: UpdateConfig,
) -> anyhow::Result<UpdateReport> {
    let chip = FlashDump::open(dump_path, user_start)
        .context("Failed to open flash dump")?
        .to_simulated();
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

    let mut updater = FirmwareUpdater::new(SimulatedDfu::new(chip).with_placement(recorded.map));
    let report = match updater.run(&mut image, &config) {
        Ok(report) => report,
        Err(e) => {
            println!("\n❌ UPDATE ABORTED\n");
            println!("Reason: {}\n", e);
            return Err(e.into());
        }
    };

    dump::save(dump_path, &updater.into_programmer().into_flash())
        .context("Failed to write flash dump")?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"]);

    table.add_row(vec!["Image Size", &report.fw_size.to_string()]);
    table.add_row(vec!["Verified", if report.verified { "yes" } else { "SKIPPED" }]);
    table.add_row(vec!["Blocks Compared", &report.blocks.to_string()]);
    table.add_row(vec!["Bytes Written", &report.bytes_written.to_string()]);
    table.add_row(vec!["Sectors Erased", &report.sectors_erased.to_string()]);
    table.add_row(vec!["Erase All", if config.erase_all { "yes" } else { "no" }]);

    println!("\nUpdate Report");
    println!("-------------");
    println!("{table}\n");

    Ok(report)
}
