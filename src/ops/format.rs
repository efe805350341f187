//! `format` / `quick-format`: thin wrapper kept alongside the other
//! commands for symmetry; the real work lives in `Volume::format`.

use crate::block_device::BlockDevice;
use crate::error::Result;
use crate::volume::Volume;

pub fn format(dev: BlockDevice, block_size: u64, quick: bool, verbose: bool) -> Result<Volume> {
    Volume::format(dev, block_size, quick, verbose)
}
