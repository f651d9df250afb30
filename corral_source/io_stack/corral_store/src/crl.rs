pub mod archive;
pub mod common;
pub mod packer;
