use clap::{Parser, Subcommand};
use flashguard::config::{UpdateConfig, BLOCK_SIZE, DEFAULT_USER_START};
use flashguard::types::RegionDescriptor;
use flashguard_cli::commands::{bootsec, inspect, parse_addr, update, verify};
use flashguard_cli::telemetry;

#[derive(Parser)]
#[command(name = "flashguard")]
#[command(about = "Staged firmware verification and filesystem boot-sector checks on flash dumps", long_about = None)]
struct Cli {
    /// Only print warnings and results.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a staged image inside a flash dump with its source file
    Verify {
        dump_path: String,
        image_path: String,
        map_path: String,

        /// Base address of the staging area
        #[arg(long, value_parser = parse_addr, default_value_t = DEFAULT_USER_START)]
        user_start: u64,
    },
    /// Check whether the filesystem partition's first sector is erased
    Bootsec {
        dump_path: String,

        /// First sector of the filesystem partition
        #[arg(long)]
        start_sec: u32,

        /// Partition length in sectors
        #[arg(long)]
        blocks: u32,

        #[arg(long, default_value_t = BLOCK_SIZE)]
        sec_size: usize,

        /// Keep repeating the corruption notice until Ctrl-C
        #[arg(long)]
        wait: bool,
    },
    /// Show flash, block map and boot sector status
    Inspect {
        dump_path: String,

        /// Block map file to check against the dump
        #[arg(long)]
        map: Option<String>,

        /// First sector of the filesystem partition
        #[arg(long, requires = "blocks")]
        start_sec: Option<u32>,

        /// Partition length in sectors
        #[arg(long, requires = "start_sec")]
        blocks: Option<u32>,

        #[arg(long, default_value_t = BLOCK_SIZE)]
        sec_size: usize,

        #[arg(long, value_parser = parse_addr, default_value_t = DEFAULT_USER_START)]
        user_start: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify and install a staged image in a flash dump (simulated DFU)
    Update {
        dump_path: String,
        image_path: String,
        map_path: String,

        #[arg(long, value_parser = parse_addr, default_value_t = DEFAULT_USER_START)]
        user_start: u64,

        /// Commit without comparing the staged blocks
        #[arg(long)]
        skip_verify: bool,

        /// Erase the rest of the chip after the copy
        #[arg(long)]
        erase_all: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.quiet);

    match cli.command {
        Commands::Verify {
            dump_path,
            image_path,
            map_path,
            user_start,
        } => verify::run(&dump_path, &image_path, &map_path, user_start, !cli.quiet).map(|_| ()),
        Commands::Bootsec {
            dump_path,
            start_sec,
            blocks,
            sec_size,
            wait,
        } => {
            let region = RegionDescriptor::new(start_sec, blocks).with_sec_size(sec_size);
            bootsec::run(&dump_path, region, wait).map(|_| ())
        }
        Commands::Inspect {
            dump_path,
            map,
            start_sec,
            blocks,
            sec_size,
            user_start,
            json,
        } => {
            let region = start_sec
                .zip(blocks)
                .map(|(s, b)| RegionDescriptor::new(s, b).with_sec_size(sec_size));
            inspect::run(&dump_path, map.as_deref(), region, user_start, json).map(|_| ())
        }
        Commands::Update {
            dump_path,
            image_path,
            map_path,
            user_start,
            skip_verify,
            erase_all,
        } => {
            let config = UpdateConfig {
                skip_verification: skip_verify,
                verbose: !cli.quiet,
                erase_all,
            };
            update::run(&dump_path, &image_path, &map_path, user_start, config).map(|_| ())
        }
    }
}
