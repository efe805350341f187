//! Minimal MBR/GPT partition table reader.
//!
//! Locates a single partition's starting sector and length so that `-m`/`-g`
//! plus `-p N` can compute the byte offset a [`crate::block_device::BlockDevice`]
//! should be windowed to, instead of operating on the whole image.

use crate::crc32;
use crate::guid::Guid;
use crate::util;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

const SECTOR_SIZE: u64 = 512;
const MBR_SIGNATURE: u16 = 0xaa55;
const GPT_SIGNATURE: &[u8; 8] = b"EFI PART";

/// Which partition table an image is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Mbr,
    Gpt,
}

/// A located partition's extent, in sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLocation {
    pub first_lba: u64,
    pub sector_count: u64,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Default)]
struct MbrPartition {
    attrs: u8,
    chs_start: [u8; 3],
    partition_type: u8,
    chs_end: [u8; 3],
    lba_start: u32,
    sectors_count: u32,
}

const _: () = assert!(std::mem::size_of::<MbrPartition>() == 16);

const MBR_PARTITION_TABLE_OFFSET: usize = 446;
const MBR_SIGNATURE_OFFSET: usize = 510;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GptHeader {
    signature: [u8; 8],
    revision: u32,
    hdr_size: u32,
    checksum: u32,
    reserved: u32,
    hdr_lba: u64,
    alternate_hdr_lba: u64,
    first_usable: u64,
    last_usable: u64,
    disk_guid: Guid,
    entries_start: u64,
    entries_number: u32,
    entry_size: u32,
    entries_checksum: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GptEntry {
    partition_type: Guid,
    guid: Guid,
    start: u64,
    end: u64,
    attributes: u64,
    name: [u16; 36],
}

fn read_sector(file: &mut File, lba: u64, buf: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(lba * SECTOR_SIZE))?;
    file.read_exact(buf)
}

/// Reads the `index`-th (0-based) primary partition from an MBR at sector 0.
///
/// Partition entries are decoded straight from the raw sector buffer rather
/// than through a struct spanning the whole 512 bytes, the same reasoning
/// `Superblock` uses: a struct big enough to cover a packed array of
/// sub-structs can't be safely referenced without realigning it first, so
/// each entry is read out as its own fixed-size byte window instead.
pub fn locate_mbr_partition(file: &mut File, index: usize) -> io::Result<Option<PartitionLocation>> {
    if index >= 4 {
        return Ok(None);
    }
    let mut buf = [0u8; 512];
    read_sector(file, 0, &mut buf)?;

    let signature = u16::from_le_bytes([buf[MBR_SIGNATURE_OFFSET], buf[MBR_SIGNATURE_OFFSET + 1]]);
    if signature != MBR_SIGNATURE {
        return Ok(None);
    }

    let entry_offset = MBR_PARTITION_TABLE_OFFSET + index * std::mem::size_of::<MbrPartition>();
    let entry_bytes = &buf[entry_offset..entry_offset + std::mem::size_of::<MbrPartition>()];
    let partition: MbrPartition = unsafe { util::from_bytes(entry_bytes) };
    if partition.partition_type == 0 {
        return Ok(None);
    }
    Ok(Some(PartitionLocation {
        first_lba: partition.lba_start as u64,
        sector_count: partition.sectors_count as u64,
    }))
}

/// Reads the `index`-th (0-based) entry from a GPT header at LBA 1.
///
/// Under `-v`, also reads back the whole entries array and checks it against
/// `entries_checksum`, printing a warning on mismatch rather than failing
/// the lookup — the tool only reads the table, it never writes one back, so
/// a bad checksum is diagnostic information for the user, not something
/// this function needs to act on.
pub fn locate_gpt_partition(file: &mut File, index: usize, verbose: bool) -> io::Result<Option<PartitionLocation>> {
    let mut sector_buf = [0u8; SECTOR_SIZE as usize];
    read_sector(file, 1, &mut sector_buf)?;
    let header: GptHeader = unsafe { util::from_bytes(&sector_buf[..std::mem::size_of::<GptHeader>()]) };
    if header.signature != *GPT_SIGNATURE {
        return Ok(None);
    }

    if verbose {
        let entries_size = header.entry_size as u64 * header.entries_number as u64;
        let mut entries_buf = vec![0u8; entries_size as usize];
        file.seek(SeekFrom::Start(header.entries_start * SECTOR_SIZE))?;
        file.read_exact(&mut entries_buf)?;
        if !gpt_entries_checksum_matches(&entries_buf, header.entries_checksum) {
            eprintln!("warning: GPT partition entries array checksum does not match the header's recorded value");
        }
    }

    if index as u32 >= header.entries_number {
        return Ok(None);
    }

    let entry_size = header.entry_size as u64;
    let entries_per_sector = SECTOR_SIZE / entry_size;
    let sector = header.entries_start + index as u64 / entries_per_sector;
    let offset_in_sector = (index as u64 % entries_per_sector) * entry_size;

    let mut sector_buf = vec![0u8; SECTOR_SIZE as usize];
    read_sector(file, sector, &mut sector_buf)?;
    let entry_bytes = &sector_buf[offset_in_sector as usize..(offset_in_sector + entry_size) as usize];
    let entry: GptEntry = unsafe { util::from_bytes(entry_bytes) };

    if entry.partition_type == Guid::default() {
        return Ok(None);
    }

    Ok(Some(PartitionLocation {
        first_lba: entry.start,
        sector_count: entry.end - entry.start + 1,
    }))
}

/// Locates the `index`-th partition of the given table kind.
pub fn locate_partition(file: &mut File, kind: TableKind, index: usize, verbose: bool) -> io::Result<Option<PartitionLocation>> {
    match kind {
        TableKind::Mbr => locate_mbr_partition(file, index),
        TableKind::Gpt => locate_gpt_partition(file, index, verbose),
    }
}

/// Verifies a GPT entries array's checksum against the header's recorded
/// value, for diagnostic (`-v`) reporting only.
pub fn gpt_entries_checksum_matches(entries: &[u8], expected: u32) -> bool {
    let mut table = [0u32; 256];
    crc32::compute_lookuptable(&mut table, crc32::IEEE_POLYNOM);
    crc32::compute(entries, &table) == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn temp_image(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("echfs-partition-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn mbr_without_signature_returns_none() {
        let path = temp_image("no-sig");
        let mut file = OpenOptions::new().create(true).truncate(true).read(true).write(true).open(&path).unwrap();
        file.write_all(&[0u8; 512]).unwrap();
        let result = locate_mbr_partition(&mut file, 0).unwrap();
        assert!(result.is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn mbr_reads_first_partition() {
        let path = temp_image("first-part");
        let mut file = OpenOptions::new().create(true).truncate(true).read(true).write(true).open(&path).unwrap();
        let mut buf = [0u8; 512];
        let partition = MbrPartition {
            attrs: 0x80,
            chs_start: [0; 3],
            partition_type: 0x83,
            chs_end: [0; 3],
            lba_start: 2048,
            sectors_count: 4096,
        };
        buf[446..462].copy_from_slice(unsafe { util::as_bytes(&partition) });
        buf[510] = 0x55;
        buf[511] = 0xaa;
        file.write_all(&buf).unwrap();

        let result = locate_mbr_partition(&mut file, 0).unwrap().unwrap();
        assert_eq!(result.first_lba, 2048);
        assert_eq!(result.sector_count, 4096);
        std::fs::remove_file(&path).ok();
    }
}
