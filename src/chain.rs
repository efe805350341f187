//! Chain manager: builds, walks and frees linked chains of data blocks
//! through the allocation table, and copies bytes between host streams and
//! chains.

use crate::alloc_table::AllocationTable;
use crate::alloc_table::END_OF_CHAIN;
use crate::block_device::BlockDevice;
use crate::dir_table::Entry;
use crate::error::Result;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

/// Reads from `src` into `buf` until it is full or the source is
/// exhausted, returning the number of bytes actually placed in `buf`.
///
/// `Read::read` is not required to fill the buffer in one call, so this
/// loops, the same way `fread`'s "copy what was actually read" semantics
/// are reproduced block by block below.
fn fill_or_eof<R: Read>(src: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Builds a new chain from the contents of `src`, allocating blocks via a
/// single ascending scan of the allocation table (§4.4, §9: "a
/// load-bearing performance choice on large images").
///
/// Returns `END_OF_CHAIN` for an empty source, matching the convention used
/// for empty files' `payload` field.
///
/// The trailing bytes of the last block beyond `src`'s length are left
/// untouched (whatever the allocator previously held there) — only the
/// bytes actually read from `src` are written, reproducing the original's
/// `fwrite(buf, 1, fread(...), image)` behavior.
pub fn import_chain<R: Read + Seek>(
    dev: &mut BlockDevice,
    at: &AllocationTable,
    block_size: u64,
    src: &mut R,
) -> Result<u64> {
    let src_size = src.seek(SeekFrom::End(0))?;
    src.seek(SeekFrom::Start(0))?;

    if src_size == 0 {
        return Ok(END_OF_CHAIN);
    }

    let block_count = crate::util::ceil_division(src_size, block_size);
    let blocks = at.scan_free(dev, 0, block_count)?;

    let mut buf = vec![0u8; block_size as usize];
    for &block in &blocks {
        let n = fill_or_eof(src, &mut buf)?;
        dev.write_at(block * block_size, &buf[..n])?;
    }

    for (i, &block) in blocks.iter().enumerate() {
        let next = blocks.get(i + 1).copied().unwrap_or(END_OF_CHAIN);
        at.set(dev, block, next)?;
    }

    Ok(blocks[0])
}

/// Writes the full contents of the chain rooted at `entry.payload` to
/// `dst`, truncated to `entry.size` bytes.
///
/// Reproduces the original's tail-block rule exactly: the terminating
/// condition is `bytes_written + block_size >= entry.size`, and the final
/// write is `entry.size % block_size` bytes. For files whose size is an
/// exact multiple of `block_size` this is `0`, so such a file's last full
/// block is silently dropped on export — a known quirk of the original
/// tool, preserved rather than "fixed" (see spec §9 open questions).
pub fn export_chain<W: Write>(
    dev: &mut BlockDevice,
    at: &AllocationTable,
    block_size: u64,
    entry: &Entry,
    dst: &mut W,
) -> Result<()> {
    let mut cur = entry.payload;
    let mut written = 0u64;
    let mut buf = vec![0u8; block_size as usize];

    while cur != END_OF_CHAIN {
        dev.read_at(cur * block_size, &mut buf)?;

        if written + block_size >= entry.size {
            let tail = (entry.size % block_size) as usize;
            dst.write_all(&buf[..tail])?;
            break;
        }

        dst.write_all(&buf)?;
        written += block_size;
        cur = at.get(dev, cur)?;
    }

    Ok(())
}

/// Frees every block in the chain rooted at `head`.
pub fn delete_chain(dev: &mut BlockDevice, at: &AllocationTable, head: u64) -> Result<()> {
    at.free_chain(dev, head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Cursor;

    fn temp_dev(name: &str, len: u64) -> (BlockDevice, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("echfs-chain-test-{name}-{}", std::process::id()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(len).unwrap();
        (BlockDevice::new(file, 0, len), path)
    }

    #[test]
    fn import_empty_source_returns_end_of_chain() {
        let (mut dev, path) = temp_dev("empty", 4096);
        let at = AllocationTable::new(0, 512);
        let mut src = Cursor::new(Vec::<u8>::new());
        let head = import_chain(&mut dev, &at, 512, &mut src).unwrap();
        assert_eq!(head, END_OF_CHAIN);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn import_export_roundtrip_spans_blocks() {
        let (mut dev, path) = temp_dev("roundtrip", 4096);
        let at = AllocationTable::new(0, 512);

        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        let mut src = Cursor::new(data.clone());
        let head = import_chain(&mut dev, &at, 512, &mut src).unwrap();

        assert_eq!(at.get(&mut dev, head).unwrap(), head + 1);
        assert_eq!(at.get(&mut dev, head + 1).unwrap(), END_OF_CHAIN);

        let mut entry = Entry::empty();
        entry.payload = head;
        entry.size = data.len() as u64;

        let mut out = Cursor::new(Vec::new());
        export_chain(&mut dev, &at, 512, &entry, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn export_exact_multiple_drops_final_block() {
        let (mut dev, path) = temp_dev("exact", 4096);
        let at = AllocationTable::new(0, 512);

        let data = vec![7u8; 1024];
        let mut src = Cursor::new(data.clone());
        let head = import_chain(&mut dev, &at, 512, &mut src).unwrap();

        let mut entry = Entry::empty();
        entry.payload = head;
        entry.size = data.len() as u64;

        let mut out = Cursor::new(Vec::new());
        export_chain(&mut dev, &at, 512, &entry, &mut out).unwrap();
        // The last full block (512 bytes) is dropped: only the first block comes out.
        assert_eq!(out.into_inner().len(), 512);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn allocations_are_strictly_ascending() {
        let (mut dev, path) = temp_dev("ascending", 8192);
        let at = AllocationTable::new(0, 512);
        at.set(&mut dev, 2, crate::alloc_table::RESERVED_BLOCK).unwrap();

        let data = vec![1u8; 512 * 5];
        let mut src = Cursor::new(data);
        let head = import_chain(&mut dev, &at, 512, &mut src).unwrap();

        let mut blocks = vec![head];
        let mut cur = head;
        loop {
            let next = at.get(&mut dev, cur).unwrap();
            if next == END_OF_CHAIN {
                break;
            }
            blocks.push(next);
            cur = next;
        }
        assert!(blocks.windows(2).all(|w| w[0] < w[1]));
        assert!(!blocks.contains(&2));
        std::fs::remove_file(&path).ok();
    }
}
