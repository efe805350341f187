//! `export`: copies a file out of the volume onto the host filesystem.

use crate::chain;
use crate::dir_table::EntryType;
use crate::error::Result;
use crate::error::VolumeError;
use crate::path;
use crate::volume::Volume;
use std::fs::File;

/// Copies the file named by `fs_path` to `host_path`.
pub fn export(volume: &mut Volume, fs_path: &str, host_path: &std::path::Path) -> Result<()> {
    let result = path::resolve(&mut volume.dev, &volume.dt, fs_path, EntryType::File)?;
    if result.not_found {
        return Err(VolumeError::NotFound);
    }

    let mut dst = File::create(host_path)?;
    chain::export_chain(&mut volume.dev, &volume.at, volume.superblock.block_size, &result.target, &mut dst)?;
    crate::util::vprintln!(volume.verbose, "exported {fs_path} to {}", host_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::device_size;
    use crate::block_device::BlockDevice;
    use crate::ops::import::import;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn temp_volume(name: &str) -> (Volume, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("echfs-export-test-{name}-{}", std::process::id()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(1_048_576).unwrap();
        let size = device_size(&file).unwrap();
        let dev = BlockDevice::new(file, 0, size);
        let volume = Volume::format(dev, 512, true, false).unwrap();
        (volume, path)
    }

    #[test]
    fn export_roundtrips_imported_file() {
        let (mut volume, image_path) = temp_volume("roundtrip");

        let host_in = std::env::temp_dir().join(format!("echfs-export-in-{}", std::process::id()));
        let mut f = File::create(&host_in).unwrap();
        f.write_all(b"hello volume").unwrap();
        drop(f);

        import(&mut volume, &host_in, "/hello.txt", false).unwrap();

        let host_out = std::env::temp_dir().join(format!("echfs-export-out-{}", std::process::id()));
        export(&mut volume, "/hello.txt", &host_out).unwrap();
        assert_eq!(std::fs::read(&host_out).unwrap(), b"hello volume");

        std::fs::remove_file(&image_path).ok();
        std::fs::remove_file(&host_in).ok();
        std::fs::remove_file(&host_out).ok();
    }

    #[test]
    fn export_missing_file_errors() {
        let (mut volume, path) = temp_volume("missing");
        let host_out = std::env::temp_dir().join(format!("echfs-export-missing-{}", std::process::id()));
        let err = export(&mut volume, "/nope.txt", &host_out).unwrap_err();
        assert!(matches!(err, VolumeError::NotFound));
        std::fs::remove_file(&path).ok();
    }
}
