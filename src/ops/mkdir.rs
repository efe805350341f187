//! `mkdir`: creates a single directory entry.

use crate::dir_table::Entry;
use crate::dir_table::EntryType;
use crate::error::Result;
use crate::error::VolumeError;
use crate::path;
use crate::volume::Volume;

/// Creates the directory named by `target_path`.
///
/// The parent must already exist; creating `/` or a path whose parent is
/// missing is reported the same way as "already exists" — the original
/// tool's `path_resolver` only distinguishes `not_found` from everything
/// else, so a caller cannot tell a missing parent from an existing target
/// without a second resolve. That conflation is preserved here rather than
/// invented: `mkdir_cmd` in the original checks nothing but
/// `!path_result.not_found` before giving up.
pub fn mkdir(volume: &mut Volume, target_path: &str) -> Result<()> {
    let result = path::resolve(&mut volume.dev, &volume.dt, target_path, EntryType::Directory)?;
    if !result.not_found {
        return Err(VolumeError::AlreadyExists);
    }

    let slot = volume
        .dt
        .find_empty_slot(&mut volume.dev, volume.dt.capacity())?
        .ok_or(VolumeError::AllocationFailure)?;

    let id = volume.dt.get_free_id(&mut volume.dev)?;
    let now = crate::util::now_secs();

    let mut entry = Entry::empty();
    entry.parent_id = result.parent.payload;
    entry.r#type = EntryType::Directory as u8;
    entry.set_name(&result.name);
    entry.payload = id;
    entry.perms = 0o644;
    entry.atime = now;
    entry.mtime = now;
    entry.ctime = now;

    volume.dt.write_entry(&mut volume.dev, slot, &entry)?;
    crate::util::vprintln!(volume.verbose, "created directory {target_path} with ID {id}");
    Ok(())
}
