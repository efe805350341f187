//! Core implementation of the echidnaFS on-disk filesystem: block allocation,
//! the directory table, path resolution and chain management.
//!
//! The command-line surface lives in `main.rs` and is a thin consumer of
//! this library; everything here operates purely on a [`BlockDevice`]
//! window over an image file and never touches `std::env` or process exit
//! codes.

pub mod alloc_table;
pub mod block_device;
pub mod chain;
pub mod crc32;
pub mod dir_table;
pub mod error;
pub mod guid;
pub mod ops;
pub mod partition;
pub mod path;
pub mod superblock;
pub mod util;
pub mod volume;

pub use block_device::BlockDevice;
pub use error::VolumeError;
pub use volume::Volume;
