//! Block device view (BDV): a windowed, byte-addressable handle into the
//! image file.
//!
//! All offsets passed to [`BlockDevice`] are relative to the start of the
//! volume; they are translated by a fixed `part_offset` established at open
//! time, mirroring the C original's `echfs_fseek` helper which added
//! `part_offset` to every seek.

use libc::ioctl;
use std::ffi::c_long;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;

/// ioctl macro: command.
macro_rules! ioc {
    ($a:expr, $b:expr, $c:expr, $d:expr) => {
        (($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
    };
}

/// ioctl macro: read command.
macro_rules! ior {
    ($a:expr, $b:expr, $c:ty) => {
        ioc!(2, $a, $b, std::mem::size_of::<$c>() as c_long)
    };
}

/// ioctl command: get size of disk in bytes.
const BLKGETSIZE64: c_long = ior!(0x12, 114, u64);

/// Returns the size in bytes of the given open file, whether it is a
/// regular file or a block/char device.
pub fn device_size(file: &File) -> io::Result<u64> {
    let metadata = file.metadata()?;
    let file_type = metadata.file_type();
    if file_type.is_block_device() || file_type.is_char_device() {
        let mut size: u64 = 0;
        let ret = unsafe { ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(size)
    } else {
        Ok(metadata.len())
    }
}

/// A windowed, byte-addressable handle into an image file.
///
/// Every `read_at`/`write_at` call is translated by `part_offset` before
/// hitting the backing file. Out-of-window accesses are a programmer error
/// and panic, per spec.
pub struct BlockDevice {
    file: File,
    part_offset: u64,
    len: u64,
}

impl BlockDevice {
    /// Wraps `file`, exposing only the `len`-byte window starting at
    /// `part_offset` within it.
    pub fn new(file: File, part_offset: u64, len: u64) -> Self {
        Self {
            file,
            part_offset,
            len,
        }
    }

    /// The size in bytes of the window this device exposes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_bounds(&self, offset: u64, size: u64) {
        assert!(
            offset.checked_add(size).map(|end| end <= self.len) == Some(true),
            "block device access out of window: offset {offset}, size {size}, window {}",
            self.len
        );
    }

    /// Reads `buf.len()` bytes starting at `offset` within the window.
    ///
    /// Panics (programmer error) if the read would fall outside the window.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.check_bounds(offset, buf.len() as u64);
        self.file.seek(SeekFrom::Start(self.part_offset + offset))?;
        self.file.read_exact(buf)
    }

    /// Writes `bytes` starting at `offset` within the window.
    ///
    /// Panics (programmer error) if the write would fall outside the window.
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        self.check_bounds(offset, bytes.len() as u64);
        self.file.seek(SeekFrom::Start(self.part_offset + offset))?;
        self.file.write_all(bytes)
    }

    /// Flushes buffered writes to the backing store.
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    pub fn read_u8(&mut self, offset: u64) -> io::Result<u8> {
        let mut b = [0u8; 1];
        self.read_at(offset, &mut b)?;
        Ok(b[0])
    }

    pub fn write_u8(&mut self, offset: u64, v: u8) -> io::Result<()> {
        self.write_at(offset, &[v])
    }

    pub fn read_u16(&mut self, offset: u64) -> io::Result<u16> {
        let mut b = [0u8; 2];
        self.read_at(offset, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn write_u16(&mut self, offset: u64, v: u16) -> io::Result<()> {
        self.write_at(offset, &v.to_le_bytes())
    }

    pub fn read_u32(&mut self, offset: u64) -> io::Result<u32> {
        let mut b = [0u8; 4];
        self.read_at(offset, &mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub fn write_u32(&mut self, offset: u64, v: u32) -> io::Result<()> {
        self.write_at(offset, &v.to_le_bytes())
    }

    pub fn read_u64(&mut self, offset: u64) -> io::Result<u64> {
        let mut b = [0u8; 8];
        self.read_at(offset, &mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    pub fn write_u64(&mut self, offset: u64, v: u64) -> io::Result<()> {
        self.write_at(offset, &v.to_le_bytes())
    }
}
