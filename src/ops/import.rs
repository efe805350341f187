//! `import`: copies a host file into the volume, creating any missing
//! parent directories along the way.

use crate::chain;
use crate::dir_table::Entry;
use crate::dir_table::EntryType;
use crate::error::Result;
use crate::error::VolumeError;
use crate::ops::mkdir;
use crate::path;
use crate::volume::Volume;
use std::fs::File;
use std::os::unix::fs::MetadataExt;

/// Walks `fs_path`'s parent components, creating any directory that does
/// not already exist.
///
/// The original walks the path character by character, `goto`-ing back to
/// retry each prefix it hasn't yet created; this is the same effect
/// expressed as an ordinary loop over path components rather than a literal
/// port of that control flow.
fn ensure_parents(volume: &mut Volume, fs_path: &str) -> Result<()> {
    let components: Vec<&str> = fs_path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if components.len() <= 1 {
        return Ok(());
    }

    let mut prefix = String::new();
    for component in &components[..components.len() - 1] {
        prefix.push('/');
        prefix.push_str(component);
        let result = path::resolve(&mut volume.dev, &volume.dt, &prefix, EntryType::Directory)?;
        if result.not_found {
            mkdir::mkdir(volume, &prefix)?;
        }
    }
    Ok(())
}

/// Imports `host_path` into the volume at `fs_path`.
///
/// When `fs_path` already names a file: without `force`, this fails with
/// `AlreadyExists`; with `force`, the entry's payload and size are
/// overwritten with the newly imported chain — but the previous chain is
/// never freed first. That leak is a known property of the original `-f`
/// path, preserved rather than fixed (see spec §9 open questions).
pub fn import(volume: &mut Volume, host_path: &std::path::Path, fs_path: &str, force: bool) -> Result<()> {
    ensure_parents(volume, fs_path)?;

    let result = path::resolve(&mut volume.dev, &volume.dt, fs_path, EntryType::File)?;
    if !result.not_found && !force {
        return Err(VolumeError::AlreadyExists);
    }

    let metadata = std::fs::metadata(host_path)?;
    if !metadata.is_file() {
        return Err(VolumeError::NotARegularFile);
    }

    let mut src = File::open(host_path)?;
    let head = chain::import_chain(&mut volume.dev, &volume.at, volume.superblock.block_size, &mut src)?;

    if let Some(index) = result.target_entry {
        let mut entry = result.target;
        entry.payload = head;
        entry.size = metadata.len();
        entry.mtime = metadata.mtime() as u64;
        volume.dt.write_entry(&mut volume.dev, index, &entry)?;
        crate::util::vprintln!(volume.verbose, "overwrote {fs_path} (leaving the old chain allocated)");
        return Ok(());
    }

    let slot = volume
        .dt
        .find_empty_slot(&mut volume.dev, volume.dt.capacity())?
        .ok_or(VolumeError::AllocationFailure)?;

    let mut entry = Entry::empty();
    entry.parent_id = result.parent.payload;
    entry.r#type = EntryType::File as u8;
    entry.set_name(&result.name);
    entry.payload = head;
    entry.size = metadata.len();
    entry.perms = (metadata.mode() & 0o777) as u16;
    entry.owner = 0;
    entry.group = 0;
    entry.atime = metadata.atime() as u64;
    entry.mtime = metadata.mtime() as u64;
    entry.ctime = metadata.ctime() as u64;

    volume.dt.write_entry(&mut volume.dev, slot, &entry)?;
    crate::util::vprintln!(volume.verbose, "imported {} to {fs_path}", host_path.display());
    Ok(())
}
