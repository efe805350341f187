//! `ls`: lists the entries of a directory.

use crate::dir_table::EntryType;
use crate::dir_table::ROOT_ID;
use crate::error::Result;
use crate::error::VolumeError;
use crate::volume::Volume;

/// Lists the entries directly under `path` (`/` when `None`), printing one
/// name per line and bracketing directory names, e.g. `[docs]`.
pub fn ls(volume: &mut Volume, path: Option<&str>) -> Result<()> {
    let parent_id = match path {
        None | Some("/") => ROOT_ID,
        Some(p) => {
            let result = crate::path::resolve(&mut volume.dev, &volume.dt, p, EntryType::Directory)?;
            if result.not_found || result.failure {
                return Err(VolumeError::NotFound);
            }
            result.target.payload
        }
    };

    let capacity = volume.dt.capacity();
    for index in 0..capacity {
        let entry = volume.dt.read_entry(&mut volume.dev, index)?;
        if entry.is_empty_slot() {
            break;
        }
        if !entry.is_live() || entry.parent_id != parent_id {
            continue;
        }
        if entry.is_directory() {
            println!("[{}]", entry.name_str());
        } else {
            println!("{}", entry.name_str());
        }
    }
    Ok(())
}
