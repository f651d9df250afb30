#![forbid(unsafe_code)]

pub mod compression;
pub mod container;
pub mod crl;

pub use compression::*;
pub use container::*;
