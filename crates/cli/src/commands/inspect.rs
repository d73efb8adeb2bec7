use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use anyhow::Context;
use flashguard::bootsec::{inspect_boot_sector, BootSectorReport};
use flashguard::storage::{FlashDevice, Partition};
use flashguard::types::{BlockMap, RegionDescriptor};
use flashguard_store::blockmap;
use flashguard_store::dump::FlashDump;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MapSummary {
    pub fw_size: u64,
    pub blocks: usize,
    pub covered_bytes: u64,
    /// Every staging chunk lies inside the dump.
    pub in_bounds: bool,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub flash_size: u64,
    pub sectors: usize,
    pub user_start: u64,
    pub map: Option<MapSummary>,
    pub region: Option<RegionDescriptor>,
    pub boot_sector: Option<BootSectorReport>,
}

fn summarize(flash: &FlashDump, fw_size: u64, map: &BlockMap) -> MapSummary {
    let block_size = flash.block_size();
    let in_bounds = map
        .chunks(fw_size, block_size)
        .iter()
        .all(|(loc, len)| flash.staging_addr(loc.block_id, loc.offset) + *len as u64 <= flash.size());
    MapSummary {
        fw_size,
        blocks: map.len(),
        covered_bytes: map.covered_bytes(block_size),
        in_bounds,
    }
}

pub fn run(
    dump_path: &str,
    map_path: Option<&str>,
    region: Option<RegionDescriptor>,
    user_start: u64,
    json: bool,
) -> anyhow::Result<InspectReport> {
    let flash = FlashDump::open(dump_path, user_start).context("Failed to open flash dump")?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Item", "Status", "Details"]);

    table.add_row(vec![
        "Flash".to_string(),
        "FOUND".to_string(),
        format!(
            "{} bytes, {} sectors, user area at {:#x}",
            flash.size(),
            flash.sector_count(),
            user_start
        ),
    ]);

    let mut map_summary = None;
    match map_path {
        Some(path) => match blockmap::read_file(path) {
            Ok(recorded) => {
                let summary = summarize(&flash, recorded.fw_size, &recorded.map);
                let status = if !summary.in_bounds {
                    "OUT OF BOUNDS"
                } else if summary.covered_bytes < summary.fw_size {
                    "SHORT"
                } else {
                    "FOUND"
                };
                table.add_row(vec![
                    "Block map".to_string(),
                    status.to_string(),
                    format!(
                        "{} blocks covering {} of {} bytes",
                        summary.blocks, summary.covered_bytes, summary.fw_size
                    ),
                ]);
                map_summary = Some(summary);
            }
            Err(e) => {
                table.add_row(vec!["Block map".to_string(), "CORRUPT".to_string(), e.to_string()]);
            }
        },
        None => {
            table.add_row(vec!["Block map".to_string(), "SKIPPED".to_string(), String::new()]);
        }
    }

    let mut boot_sector = None;
    if let Some(region) = region {
        let partition = Partition::new(&flash, region);
        match inspect_boot_sector(&partition) {
            Ok(report) if report.is_empty() => {
                table.add_row(vec![
                    "Boot sector".to_string(),
                    "ERASED".to_string(),
                    format!("sector {} ({} sectors)", region.start_sec, region.blocks),
                ]);
                boot_sector = Some(report);
            }
            Ok(report) => {
                table.add_row(vec![
                    "Boot sector".to_string(),
                    "DIRTY".to_string(),
                    format!(
                        "{} programmed bytes, first at offset {}",
                        report.dirty_bytes,
                        report.first_dirty.unwrap_or_default()
                    ),
                ]);
                boot_sector = Some(report);
            }
            Err(e) => {
                table.add_row(vec!["Boot sector".to_string(), "ERROR".to_string(), e.to_string()]);
            }
        }
    }

    let report = InspectReport {
        flash_size: flash.size(),
        sectors: flash.sector_count(),
        user_start,
        map: map_summary,
        region,
        boot_sector,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\nFlash Status Report");
        println!("-------------------");
        println!("{table}\n");
    }

    Ok(report)
}
