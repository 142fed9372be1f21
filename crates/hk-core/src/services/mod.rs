pub mod config_loader;
pub mod launcher;
pub mod process;
pub mod reclaim;
pub mod registry;
pub mod storage;
