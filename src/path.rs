//! Path resolver: translates textual paths into `(parent_entry, name,
//! optional target_entry)` triples against the directory table.

use crate::dir_table::DirectoryTable;
use crate::dir_table::Entry;
use crate::dir_table::EntryType;
use crate::dir_table::ROOT_ID;
use crate::block_device::BlockDevice;
use crate::error::Result;

/// The outcome of resolving a path. Exactly one of `failure`, `not_found`,
/// or "found" (`target_entry.is_some()`) holds at any time.
///
/// Kept as a value-type entry plus a positional handle, deliberately
/// avoiding a reference into the on-disk mirror (see spec §9).
pub struct PathResult {
    /// Index of the resolved entry in the directory table, if found.
    pub target_entry: Option<u64>,
    /// The resolved entry itself (meaningful only when `target_entry` is
    /// `Some`, or for the `"/"` special case where only `payload` is set).
    pub target: Entry,
    /// The parent directory's entry. For components resolved directly
    /// under the root, only `payload == ROOT_ID` is meaningful.
    pub parent: Entry,
    /// The terminal path component's name.
    pub name: String,
    /// A non-terminal component failed to resolve as a directory.
    pub failure: bool,
    /// The terminal component does not exist (not a failure: callers may
    /// still use `parent`/`name` to create the entry).
    pub not_found: bool,
}

impl PathResult {
    fn failure(parent: Entry, name: String) -> Self {
        Self {
            target_entry: None,
            target: Entry::empty(),
            parent,
            name,
            failure: true,
            not_found: false,
        }
    }

    fn not_found(parent: Entry, name: String) -> Self {
        Self {
            target_entry: None,
            target: Entry::empty(),
            parent,
            name,
            failure: false,
            not_found: true,
        }
    }

    fn found(target_entry: u64, target: Entry, parent: Entry, name: String) -> Self {
        Self {
            target_entry: Some(target_entry),
            target,
            parent,
            name,
            failure: false,
            not_found: false,
        }
    }
}

/// Resolves `path` against the directory table, requiring the terminal
/// component to be of type `entry_type`.
///
/// `path` must be absolute (start with `/`). `"/"` resolved as a directory
/// succeeds immediately with `target.payload == ROOT_ID`; `"/"` resolved as
/// a file fails.
pub fn resolve(
    dev: &mut BlockDevice,
    dt: &DirectoryTable,
    path: &str,
    entry_type: EntryType,
) -> Result<PathResult> {
    if path == "/" {
        return Ok(match entry_type {
            EntryType::Directory => {
                let mut target = Entry::empty();
                target.payload = ROOT_ID;
                PathResult {
                    target_entry: None,
                    target,
                    parent: Entry::empty(),
                    name: String::new(),
                    failure: false,
                    not_found: false,
                }
            }
            EntryType::File => PathResult::failure(Entry::empty(), String::new()),
        });
    }

    let components: Vec<&str> = path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    let mut parent = Entry::empty();
    parent.payload = ROOT_ID;

    if components.is_empty() {
        return Ok(PathResult::failure(parent, String::new()));
    }

    for component in &components[..components.len() - 1] {
        match dt.search(dev, parent.payload, EntryType::Directory, component)? {
            Some((_, entry)) => parent = entry,
            None => return Ok(PathResult::failure(parent, (*component).to_owned())),
        }
    }

    let name = components[components.len() - 1].to_owned();
    match dt.search(dev, parent.payload, entry_type, &name)? {
        Some((index, entry)) => Ok(PathResult::found(index, entry, parent, name)),
        None => Ok(PathResult::not_found(parent, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir_table::Entry;
    use std::fs::OpenOptions;

    fn temp_dt(name: &str) -> (BlockDevice, DirectoryTable, std::path::PathBuf) {
        let block_size = 512u64;
        let dir_size_blocks = 4u64;
        let len = dir_size_blocks * block_size;
        let path = std::env::temp_dir().join(format!("echfs-path-test-{name}-{}", std::process::id()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(len).unwrap();
        let dev = BlockDevice::new(file, 0, len);
        let dt = DirectoryTable::new(0, block_size, dir_size_blocks);
        (dev, dt, path)
    }

    #[test]
    fn root_as_directory_succeeds() {
        let (mut dev, dt, path) = temp_dt("root-dir");
        let result = resolve(&mut dev, &dt, "/", EntryType::Directory).unwrap();
        assert!(!result.failure && !result.not_found);
        assert_eq!({ result.target.payload }, ROOT_ID);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn root_as_file_fails() {
        let (mut dev, dt, path) = temp_dt("root-file");
        let result = resolve(&mut dev, &dt, "/", EntryType::File).unwrap();
        assert!(result.failure);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn nested_resolution() {
        let (mut dev, dt, path) = temp_dt("nested");
        let mut a = Entry::empty();
        a.parent_id = ROOT_ID;
        a.r#type = EntryType::Directory as u8;
        a.set_name("a");
        a.payload = 1;
        dt.write_entry(&mut dev, 0, &a).unwrap();

        let mut b = Entry::empty();
        b.parent_id = 1;
        b.r#type = EntryType::File as u8;
        b.set_name("b");
        b.payload = 99;
        b.size = 123;
        dt.write_entry(&mut dev, 1, &b).unwrap();

        let result = resolve(&mut dev, &dt, "/a/b", EntryType::File).unwrap();
        assert!(!result.failure && !result.not_found);
        assert_eq!({ result.target.payload }, 99);
        assert_eq!({ result.parent.payload }, 1);
        assert_eq!(result.name, "b");

        let missing_parent = resolve(&mut dev, &dt, "/missing/b", EntryType::File).unwrap();
        assert!(missing_parent.failure);

        let missing_leaf = resolve(&mut dev, &dt, "/a/c", EntryType::File).unwrap();
        assert!(missing_leaf.not_found);
        assert_eq!(missing_leaf.name, "c");
        assert_eq!({ missing_leaf.parent.payload }, 1);
        std::fs::remove_file(&path).ok();
    }
}
