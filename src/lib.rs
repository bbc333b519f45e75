#![deny(clippy::all)]
#![forbid(unsafe_code)]

// FIXME: When derive_builder supports Rust 2018 syntax switch to a local import
#[macro_use]
extern crate derive_builder;

pub mod airspace;
pub mod altitude;
pub mod cifp;
pub mod error;
pub mod geo;
pub mod geodesy;
pub mod guidance;
pub mod leg;
pub mod txt_data;
pub mod zip_util;

pub use crate::cifp::{Cifp, IngestPolicy};
pub use crate::error::{Error, Result};
