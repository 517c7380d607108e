//! Command implementations

pub mod accessory;
pub mod catalog;
pub mod completions;
pub mod deal;
pub mod export;
pub mod init;
pub mod item;
pub mod option;
pub mod product;
pub mod pump;
pub mod rev;
pub mod size;
pub mod utils;
