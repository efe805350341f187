//! Operations layer: format, mkdir, import, export and ls, built atop the
//! block device, allocation table, directory table, path resolver and
//! chain manager.

pub mod export;
pub mod format;
pub mod import;
pub mod ls;
pub mod mkdir;
