//! Superblock codec: reads and writes the fixed-layout header describing
//! block size, total block count, directory table size and volume UUID.
//!
//! Field offsets are addressed directly, the same way the C original reads
//! and writes specific byte ranges of block 0 rather than mapping the whole
//! block onto a struct — doing so keeps the boot-program bytes (0–3, 36–39,
//! 56–509) untouched outside of formatting, as required by spec.

use crate::block_device::BlockDevice;
use crate::error::Result;
use crate::error::VolumeError;
use uuid::Uuid;

/// Number of blocks reserved for the boot program and superblock.
pub const RESERVED_BLOCKS: u64 = 16;

const SIGNATURE: &[u8; 8] = b"_ECH_FS_";
const OFF_SIGNATURE: u64 = 4;
const OFF_TOTAL_BLOCKS: u64 = 12;
const OFF_DIR_SIZE: u64 = 20;
const OFF_BLOCK_SIZE: u64 = 28;
const OFF_UUID: u64 = 40;
const OFF_BOOT_SIG: u64 = 510;
const BOOT_SIG: u16 = 0xAA55;

/// In-memory view of the superblock fields this tool cares about.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    /// Declared total block count (may disagree with `image_size / block_size`).
    pub declared_blocks: u64,
    /// Directory table size in blocks.
    pub dir_size: u64,
    /// Block size in bytes.
    pub block_size: u64,
    /// Volume UUID.
    pub uuid: Uuid,
    /// Whether the boot-signature bytes at offset 510 read `0xAA55`.
    pub bootable: bool,
}

impl Superblock {
    /// Reads the superblock from `dev`. `dev`'s window must already cover at
    /// least the first 512 bytes of the volume.
    ///
    /// Fails with `BadSignature` if the 8-byte signature does not read
    /// `_ECH_FS_`.
    pub fn load(dev: &mut BlockDevice) -> Result<Self> {
        let mut sig = [0u8; 8];
        dev.read_at(OFF_SIGNATURE, &mut sig)?;
        if &sig != SIGNATURE {
            return Err(VolumeError::BadSignature);
        }
        let declared_blocks = dev.read_u64(OFF_TOTAL_BLOCKS)?;
        let dir_size = dev.read_u64(OFF_DIR_SIZE)?;
        let block_size = dev.read_u64(OFF_BLOCK_SIZE)?;

        let mut uuid_bytes = [0u8; 16];
        dev.read_at(OFF_UUID, &mut uuid_bytes[..8])?;
        dev.read_at(OFF_UUID + 8, &mut uuid_bytes[8..])?;
        let uuid = Uuid::from_bytes(uuid_bytes);

        let bootable = dev.read_u16(OFF_BOOT_SIG)? == BOOT_SIG;

        Ok(Self {
            declared_blocks,
            dir_size,
            block_size,
            uuid,
            bootable,
        })
    }

    /// Writes a fresh superblock for an image of `image_size` bytes and the
    /// given `block_size`, generating a random v4 UUID. Returns the
    /// resulting superblock.
    ///
    /// Does not touch the boot-program bytes. Does not write the boot
    /// signature at offset 510; that is left as whatever the image already
    /// contained (informational only, per spec).
    pub fn create(dev: &mut BlockDevice, image_size: u64, block_size: u64) -> Result<Self> {
        if block_size == 0 || block_size % 512 != 0 {
            return Err(VolumeError::InvalidBlockSize);
        }
        if image_size % block_size != 0 {
            return Err(VolumeError::MisalignedImage);
        }

        let total_blocks = image_size / block_size;
        let dir_size = total_blocks / 20;
        let uuid = Uuid::new_v4();

        dev.write_at(OFF_SIGNATURE, SIGNATURE)?;
        dev.write_u64(OFF_TOTAL_BLOCKS, total_blocks)?;
        dev.write_u64(OFF_DIR_SIZE, dir_size)?;
        dev.write_u64(OFF_BLOCK_SIZE, block_size)?;

        let bytes = uuid.into_bytes();
        dev.write_at(OFF_UUID, &bytes[..8])?;
        dev.write_at(OFF_UUID + 8, &bytes[8..])?;

        let bootable = dev.read_u16(OFF_BOOT_SIG)? == BOOT_SIG;

        Ok(Self {
            declared_blocks: total_blocks,
            dir_size,
            block_size,
            uuid,
            bootable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::device_size;
    use std::fs::OpenOptions;

    fn open_temp(name: &str, len: u64) -> (BlockDevice, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("echfs-sb-test-{name}-{}", std::process::id()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(len).unwrap();
        let size = device_size(&file).unwrap();
        (BlockDevice::new(file, 0, size), path)
    }

    #[test]
    fn create_then_load_roundtrips() {
        let (mut dev, path) = open_temp("create-load", 1_048_576);
        let created = Superblock::create(&mut dev, 1_048_576, 512).unwrap();
        assert_eq!(created.declared_blocks, 2048);
        assert_eq!(created.dir_size, 102);
        assert_eq!(created.block_size, 512);

        let loaded = Superblock::load(&mut dev).unwrap();
        assert_eq!(loaded.declared_blocks, 2048);
        assert_eq!(loaded.dir_size, 102);
        assert_eq!(loaded.block_size, 512);
        assert_eq!(loaded.uuid, created.uuid);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_bad_signature() {
        let (mut dev, path) = open_temp("bad-sig", 4096);
        assert!(matches!(Superblock::load(&mut dev), Err(VolumeError::BadSignature)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn create_rejects_misaligned_image() {
        let (mut dev, path) = open_temp("misaligned", 1000);
        assert!(matches!(
            Superblock::create(&mut dev, 1000, 512),
            Err(VolumeError::MisalignedImage)
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn create_rejects_bad_block_size() {
        let (mut dev, path) = open_temp("bad-block-size", 4096);
        assert!(matches!(
            Superblock::create(&mut dev, 4096, 300),
            Err(VolumeError::InvalidBlockSize)
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn format_twice_differs_only_in_uuid() {
        let (mut dev, path) = open_temp("twice", 1_048_576);
        let first = Superblock::create(&mut dev, 1_048_576, 512).unwrap();
        let second = Superblock::create(&mut dev, 1_048_576, 512).unwrap();
        assert_eq!(first.declared_blocks, second.declared_blocks);
        assert_eq!(first.dir_size, second.dir_size);
        assert_eq!(first.block_size, second.block_size);
        assert_ne!(first.uuid, second.uuid);
        std::fs::remove_file(&path).ok();
    }
}
