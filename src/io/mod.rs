pub mod atomic;
pub mod config_io;
pub mod fs_browse;
pub mod store;
