//! Command-line argument parsing for the `echfs-utils` binary.
//!
//! `tool [-v] [-f] [-m | -g] [-p N] <image> <action> <args...>`

use echfs::partition::TableKind;
use std::env::ArgsOs;
use std::ffi::OsString;
use std::path::PathBuf;

pub enum Action {
    Format { block_size: u64 },
    QuickFormat { block_size: u64 },
    Mkdir { path: String },
    Ls { path: Option<String> },
    Import { host_path: PathBuf, fs_path: String },
    Export { fs_path: String, host_path: PathBuf },
}

pub struct Args {
    pub verbose: bool,
    pub force: bool,
    pub table_kind: Option<TableKind>,
    pub partition_index: Option<usize>,
    pub image: PathBuf,
    pub action: Action,
}

fn next_os(args: &mut ArgsOs, bin: &str, what: &str) -> OsString {
    args.next().unwrap_or_else(|| echfs::error::cli_error(bin, format!("missing argument: {what}")))
}

fn next_string(args: &mut ArgsOs, bin: &str, what: &str) -> String {
    next_os(args, bin, what)
        .into_string()
        .unwrap_or_else(|_| echfs::error::cli_error(bin, format!("argument is not valid UTF-8: {what}")))
}

fn parse_u64(bin: &str, what: &str, s: &str) -> u64 {
    s.parse().unwrap_or_else(|_| echfs::error::cli_error(bin, format!("invalid {what}: `{s}`")))
}

/// Parses the process's arguments (excluding argv[0]) into [`Args`].
pub fn parse(bin: &str, mut args: ArgsOs) -> Args {
    let mut verbose = false;
    let mut force = false;
    let mut table_kind = None;
    let mut partition_index = None;

    let image = loop {
        let arg = next_os(&mut args, bin, "image path");
        let Some(flag) = arg.to_str() else {
            break PathBuf::from(arg);
        };
        match flag {
            "-v" => verbose = true,
            "-f" => force = true,
            "-m" => table_kind = Some(TableKind::Mbr),
            "-g" => table_kind = Some(TableKind::Gpt),
            "-p" => {
                let n = next_string(&mut args, bin, "partition index");
                partition_index = Some(parse_u64(bin, "partition index", &n) as usize);
            }
            _ => break PathBuf::from(arg),
        }
    };

    let action_name = next_string(&mut args, bin, "action");
    let action = match action_name.as_str() {
        "format" => Action::Format {
            block_size: parse_u64(bin, "block size", &next_string(&mut args, bin, "block size")),
        },
        "quick-format" => Action::QuickFormat {
            block_size: parse_u64(bin, "block size", &next_string(&mut args, bin, "block size")),
        },
        "mkdir" => Action::Mkdir {
            path: next_string(&mut args, bin, "fs_path"),
        },
        "ls" => Action::Ls {
            path: args.next().map(|a| a.into_string().unwrap_or_else(|_| echfs::error::cli_error(bin, "argument is not valid UTF-8: fs_path"))),
        },
        "import" => {
            let host_path = PathBuf::from(next_os(&mut args, bin, "host_path"));
            let fs_path = next_string(&mut args, bin, "fs_path");
            Action::Import { host_path, fs_path }
        }
        "export" => {
            let fs_path = next_string(&mut args, bin, "fs_path");
            let host_path = PathBuf::from(next_os(&mut args, bin, "host_path"));
            Action::Export { fs_path, host_path }
        }
        other => echfs::error::cli_error(bin, format!("unknown action `{other}`")),
    };

    Args {
        verbose,
        force,
        table_kind,
        partition_index,
        image,
        action,
    }
}
