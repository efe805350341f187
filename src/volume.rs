//! The volume: an opaque value threading the block device, superblock,
//! allocation table and directory table through the operations layer.
//!
//! The original tool kept this state in file-scope static variables
//! (`image`, `part_offset`, `blocks`, `fatsize`, ...); this crate re-expresses
//! that as a single `Volume` value instead, per spec §9 ("Global mutable
//! state").

use crate::alloc_table::AllocationTable;
use crate::block_device::BlockDevice;
use crate::dir_table::DirectoryTable;
use crate::error::Result;
use crate::error::VolumeError;
use crate::superblock::Superblock;
use crate::superblock::RESERVED_BLOCKS;

/// A formatted (or freshly opened) echidnaFS volume and its geometry.
pub struct Volume {
    pub dev: BlockDevice,
    pub superblock: Superblock,
    pub at: AllocationTable,
    pub dt: DirectoryTable,
    /// `16 + F + D`: the first usable data block.
    pub data_start: u64,
    /// Total block count derived from the image's actual size.
    pub total_blocks: u64,
    pub verbose: bool,
}

impl Volume {
    fn geometry(block_size: u64, total_blocks: u64, dir_size: u64) -> (AllocationTable, DirectoryTable, u64) {
        let at_size = crate::util::ceil_division(total_blocks * 8, block_size);
        let at_start = RESERVED_BLOCKS;
        let dir_start = at_start + at_size;
        let data_start = dir_start + dir_size;
        (
            AllocationTable::new(at_start, block_size),
            DirectoryTable::new(dir_start, block_size, dir_size),
            data_start,
        )
    }

    /// Opens an already-formatted volume over `dev`.
    ///
    /// `dev`'s window length is taken as the image size and must be a
    /// multiple of the superblock's block size. A declared/actual block
    /// count mismatch is reported back as a [`VolumeError::DeclaredCountMismatch`]
    /// warning rather than failing the open, per spec (it's informational,
    /// not fatal).
    pub fn open(mut dev: BlockDevice, verbose: bool) -> Result<(Self, Option<VolumeError>)> {
        let superblock = Superblock::load(&mut dev)?;
        let image_size = dev.len();
        if image_size % superblock.block_size != 0 {
            return Err(VolumeError::MisalignedImage);
        }
        let total_blocks = image_size / superblock.block_size;

        let warning = if superblock.declared_blocks != total_blocks {
            Some(VolumeError::DeclaredCountMismatch {
                declared: superblock.declared_blocks,
                actual: total_blocks,
            })
        } else {
            None
        };

        let (at, dt, data_start) = Self::geometry(superblock.block_size, total_blocks, superblock.dir_size);

        if verbose {
            crate::util::vprintln!(verbose, "echidnaFS signature found");
            crate::util::vprintln!(verbose, "image size: {image_size} bytes");
            crate::util::vprintln!(verbose, "bytes per block: {}", superblock.block_size);
            crate::util::vprintln!(verbose, "block count: {total_blocks}");
            crate::util::vprintln!(verbose, "declared block count: {}", superblock.declared_blocks);
            crate::util::vprintln!(verbose, "expected allocation table start: block {}", at.start_block);
            crate::util::vprintln!(verbose, "expected directory start: block {}", dt.start_block);
            crate::util::vprintln!(verbose, "expected reserved blocks: {data_start}");
            crate::util::vprintln!(verbose, "expected usable blocks: {}", total_blocks - data_start);
            crate::util::vprintln!(
                verbose,
                "the image is {}bootable",
                if superblock.bootable { "" } else { "NOT " }
            );
        }

        Ok((
            Self {
                dev,
                superblock,
                at,
                dt,
                data_start,
                total_blocks,
                verbose,
            },
            warning,
        ))
    }

    /// Formats `dev` as a fresh echidnaFS volume of the given `block_size`.
    ///
    /// `quick`, when set, skips zeroing the data region (pass 1's
    /// "quick-format" path); the directory table then has no entries
    /// either way, since `mark_reserved_region` only marks AT entries.
    pub fn format(mut dev: BlockDevice, block_size: u64, quick: bool, verbose: bool) -> Result<Self> {
        let image_size = dev.len();
        if block_size == 0 || block_size % 512 != 0 {
            return Err(VolumeError::InvalidBlockSize);
        }
        if image_size % block_size != 0 {
            return Err(VolumeError::MisalignedImage);
        }

        let superblock = Superblock::create(&mut dev, image_size, block_size)?;
        println!("{}", superblock.uuid);

        if !quick {
            crate::util::vprintln!(verbose, "zeroing");
            let zero_block = vec![0u8; block_size as usize];
            let mut offset = RESERVED_BLOCKS * block_size;
            while offset < image_size {
                dev.write_at(offset, &zero_block)?;
                offset += block_size;
            }
        }

        let total_blocks = image_size / block_size;
        let (at, dt, data_start) = Self::geometry(block_size, total_blocks, superblock.dir_size);
        at.mark_reserved_region(&mut dev, data_start)?;

        crate::util::vprintln!(verbose, "format complete!");

        Ok(Self {
            dev,
            superblock,
            at,
            dt,
            data_start,
            total_blocks,
            verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::device_size;
    use std::fs::OpenOptions;

    fn temp_file(name: &str, len: u64) -> (std::fs::File, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("echfs-volume-test-{name}-{}", std::process::id()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(len).unwrap();
        (file, path)
    }

    #[test]
    fn format_then_open_matches_scenario_s1() {
        let (file, path) = temp_file("s1", 1_048_576);
        let size = device_size(&file).unwrap();
        let dev = BlockDevice::new(file, 0, size);
        let mut volume = Volume::format(dev, 512, false, false).unwrap();
        assert_eq!(volume.superblock.declared_blocks, 2048);
        assert_eq!(volume.superblock.dir_size, 102);
        assert_eq!(volume.data_start, 16 + 32 + 102);

        for block in 0..volume.data_start {
            assert_eq!(
                volume.at.get(&mut volume.dev, block).unwrap(),
                crate::alloc_table::RESERVED_BLOCK
            );
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn open_reports_declared_count_mismatch() {
        let (file, path) = temp_file("mismatch", 1_048_576);
        let size = device_size(&file).unwrap();
        let dev = BlockDevice::new(file, 0, size);
        let volume = Volume::format(dev, 512, true, false).unwrap();
        drop(volume);

        let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let mut dev = BlockDevice::new(file, 0, size);
        dev.write_u64(12, 9999).unwrap();

        let (_volume, warning) = Volume::open(dev, false).unwrap();
        assert!(matches!(
            warning,
            Some(VolumeError::DeclaredCountMismatch { declared: 9999, actual: 2048 })
        ));
        std::fs::remove_file(&path).ok();
    }
}
