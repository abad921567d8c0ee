//! Toolchain implementations
//!
//! [`DebianToolchain`] drives the real packaging tools. Tree copies are done
//! in-process by [`fs_copy`].

pub mod debian;
pub mod fs_copy;
pub mod http_probe;

pub use debian::DebianToolchain;
pub use fs_copy::{CopyStats, copy_tree};
pub use http_probe::HttpProbe;
