//! Directory table (DT): a linear array of fixed-size directory entries,
//! searched sequentially and indexed positionally.
//!
//! The table is never compacted: deleting an entry tombstones its slot
//! (`parent_id = DELETED_ENTRY`) rather than shifting later entries down,
//! because `parent_id == 0` doubles as the "first never-used slot" marker
//! that terminates iteration (see spec §4.5, §9).

use crate::block_device::BlockDevice;
use crate::error::Result;
use crate::error::VolumeError;
use crate::util;

/// The root directory's ID. Shares its bit pattern with `END_OF_CHAIN` in
/// the allocation table, but the two belong to different domains
/// (directory payload vs. AT entry) and must never be conflated.
pub const ROOT_ID: u64 = 0xFFFF_FFFF_FFFF_FFFF;
/// Marks a directory-table slot as tombstoned (deleted, reusable).
pub const DELETED_ENTRY: u64 = 0xFFFF_FFFF_FFFF_FFFE;
/// Maximum length of a filename, excluding the NUL terminator.
pub const NAME_CAPACITY: usize = 201;

/// Type tag stored in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    File = 0,
    Directory = 1,
}

/// A directory-table entry, packed exactly as it is stored on disk (256
/// bytes, little-endian, no padding).
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct Entry {
    /// `0` => slot empty/past-end. `DELETED_ENTRY` => tombstone. Otherwise
    /// the parent directory's ID.
    pub parent_id: u64,
    /// `0` = file, `1` = directory.
    pub r#type: u8,
    /// NUL-terminated filename within the parent.
    pub name: [u8; NAME_CAPACITY],
    pub atime: u64,
    pub mtime: u64,
    pub perms: u16,
    pub owner: u16,
    pub group: u16,
    pub ctime: u64,
    /// Files: first block of the chain, or `END_OF_CHAIN` for empty files.
    /// Directories: the directory's own ID.
    pub payload: u64,
    /// Files: byte length. Directories: unused.
    pub size: u64,
}

const _: () = assert!(std::mem::size_of::<Entry>() == 256);

impl Entry {
    /// An all-zero entry: an empty, never-used slot.
    pub fn empty() -> Self {
        unsafe { std::mem::zeroed() }
    }

    pub fn is_empty_slot(&self) -> bool {
        self.parent_id == 0
    }

    pub fn is_tombstone(&self) -> bool {
        self.parent_id == DELETED_ENTRY
    }

    pub fn is_live(&self) -> bool {
        !self.is_empty_slot() && !self.is_tombstone()
    }

    pub fn is_directory(&self) -> bool {
        self.r#type == EntryType::Directory as u8
    }

    /// Returns the name up to (but excluding) the first NUL byte.
    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Writes `name` into the entry's name field, NUL-terminated.
    ///
    /// Panics if `name` does not fit (longer than `NAME_CAPACITY - 1`
    /// bytes) or contains an interior NUL — a command-line argument error
    /// that callers are expected to validate before reaching this point.
    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        assert!(
            bytes.len() < NAME_CAPACITY,
            "filename `{name}` exceeds the {} byte limit",
            NAME_CAPACITY - 1
        );
        assert!(!bytes.contains(&0), "filename must not contain a NUL byte");
        self.name = [0; NAME_CAPACITY];
        self.name[..bytes.len()].copy_from_slice(bytes);
    }
}

/// A view over the directory table region of a volume.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryTable {
    pub start_block: u64,
    pub block_size: u64,
    pub dir_size_blocks: u64,
}

impl DirectoryTable {
    pub fn new(start_block: u64, block_size: u64, dir_size_blocks: u64) -> Self {
        Self {
            start_block,
            block_size,
            dir_size_blocks,
        }
    }

    /// Total number of entry slots the table can hold.
    pub fn capacity(&self) -> u64 {
        (self.dir_size_blocks * self.block_size) / std::mem::size_of::<Entry>() as u64
    }

    fn entry_offset(&self, index: u64) -> Result<u64> {
        if index >= self.capacity() {
            return Err(VolumeError::OutOfBoundsDirectory);
        }
        Ok(self.start_block * self.block_size + index * std::mem::size_of::<Entry>() as u64)
    }

    /// Reads the entry at `index`.
    pub fn read_entry(&self, dev: &mut BlockDevice, index: u64) -> Result<Entry> {
        let offset = self.entry_offset(index)?;
        let mut buf = [0u8; std::mem::size_of::<Entry>()];
        dev.read_at(offset, &mut buf)?;
        Ok(unsafe { util::from_bytes(&buf) })
    }

    /// Writes `entry` at `index`.
    pub fn write_entry(&self, dev: &mut BlockDevice, index: u64, entry: &Entry) -> Result<()> {
        let offset = self.entry_offset(index)?;
        dev.write_at(offset, unsafe { util::as_bytes(entry) })?;
        Ok(())
    }

    /// Sequential search for a live entry with the given `(parent_id, type,
    /// name)`. Stops at the first never-used slot (`parent_id == 0`) or at
    /// the end of the table, whichever comes first.
    pub fn search(
        &self,
        dev: &mut BlockDevice,
        parent_id: u64,
        entry_type: EntryType,
        name: &str,
    ) -> Result<Option<(u64, Entry)>> {
        let capacity = self.capacity();
        let mut index = 0;
        while index < capacity {
            let entry = self.read_entry(dev, index)?;
            if entry.is_empty_slot() {
                return Ok(None);
            }
            if entry.parent_id == parent_id
                && entry.r#type == entry_type as u8
                && entry.name_str() == name
            {
                return Ok(Some((index, entry)));
            }
            index += 1;
        }
        Ok(None)
    }

    /// Returns the index of the first reusable slot: either never-used
    /// (`parent_id == 0`) or tombstoned (`parent_id == DELETED_ENTRY`).
    ///
    /// Returns `None` if the table is full.
    pub fn find_empty_slot(&self, dev: &mut BlockDevice, limit: u64) -> Result<Option<u64>> {
        let capacity = self.capacity().min(limit);
        for index in 0..capacity {
            let entry = self.read_entry(dev, index)?;
            if entry.is_empty_slot() || entry.is_tombstone() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Returns a directory ID not used by any live directory entry:
    /// `max(payload over live directory entries) + 1`, starting from `1`.
    ///
    /// Scans the *entire* table rather than stopping at the first
    /// never-used slot, so that a tombstone sitting in front of a later
    /// live directory does not cause an ID clash (see spec §9).
    pub fn get_free_id(&self, dev: &mut BlockDevice) -> Result<u64> {
        let capacity = self.capacity();
        let mut max_id = 0u64;
        for index in 0..capacity {
            let entry = self.read_entry(dev, index)?;
            if entry.is_live() && entry.is_directory() {
                max_id = max_id.max(entry.payload);
            }
        }
        Ok(max_id + 1)
    }
}
