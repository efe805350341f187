//! `echfs-utils`: formats and manipulates disk images using the echidnaFS
//! on-disk layout.
//!
//! This binary is a thin consumer of the [`echfs`] library: it parses
//! arguments, opens the image (optionally windowed to a single MBR/GPT
//! partition), and dispatches to the operations layer.

mod cli;

use echfs::block_device::device_size;
use echfs::block_device::BlockDevice;
use echfs::error::cli_error;
use echfs::error::VolumeError;
use echfs::ops::export;
use echfs::ops::format;
use echfs::ops::import;
use echfs::ops::ls;
use echfs::ops::mkdir;
use echfs::partition;
use echfs::volume::Volume;
use std::env;
use std::fs::OpenOptions;
use std::process::exit;

fn open_window(bin: &str, args: &cli::Args) -> BlockDevice {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.image)
        .unwrap_or_else(|e| cli_error(bin, format!("{}: {e}", args.image.display())));

    let full_size = device_size(&file).unwrap_or_else(|e| cli_error(bin, format!("{}: {e}", args.image.display())));

    match args.table_kind {
        None => BlockDevice::new(file, 0, full_size),
        Some(kind) => {
            let index = args.partition_index.unwrap_or_else(|| cli_error(bin, "-p N is required with -m or -g"));
            let location = partition::locate_partition(&mut file, kind, index, args.verbose)
                .unwrap_or_else(|e| cli_error(bin, format!("{}: {e}", args.image.display())))
                .unwrap_or_else(|| cli_error(bin, format!("no such partition: {index}")));
            let part_offset = location.first_lba * 512;
            let part_len = location.sector_count * 512;
            BlockDevice::new(file, part_offset, part_len)
        }
    }
}

/// Reports a command-level error the way the original tool does: print to
/// stderr, then either exit (fatal, e.g. corruption or I/O failure) or let
/// the process continue to its normal (successful) exit.
fn report(bin: &str, err: VolumeError) {
    eprintln!("{bin}: error: {err}");
    if err.is_fatal() {
        exit(1);
    }
}

fn main() {
    let mut raw_args = env::args_os();
    let bin = raw_args
        .next()
        .map(std::path::PathBuf::from)
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_owned))
        .unwrap_or_else(|| "echfs-utils".to_owned());

    let args = cli::parse(&bin, raw_args);
    let verbose = args.verbose;
    let force = args.force;

    match &args.action {
        cli::Action::Format { block_size } | cli::Action::QuickFormat { block_size } => {
            let quick = matches!(args.action, cli::Action::QuickFormat { .. });
            let dev = open_window(&bin, &args);
            if let Err(e) = format::format(dev, *block_size, quick, verbose) {
                report(&bin, e);
            }
        }
        other => {
            let dev = open_window(&bin, &args);
            let (mut volume, warning) = match Volume::open(dev, verbose) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("{bin}: error: {e}");
                    exit(1);
                }
            };
            if let Some(w) = warning {
                eprintln!("{bin}: warning: {w}");
            }

            let result = match other {
                cli::Action::Mkdir { path } => mkdir::mkdir(&mut volume, path),
                cli::Action::Ls { path } => ls::ls(&mut volume, path.as_deref()),
                cli::Action::Import { host_path, fs_path } => import::import(&mut volume, host_path, fs_path, force),
                cli::Action::Export { fs_path, host_path } => export::export(&mut volume, fs_path, host_path),
                cli::Action::Format { .. } | cli::Action::QuickFormat { .. } => unreachable!(),
            };

            if let Err(e) = result {
                report(&bin, e);
            }
        }
    }
}
