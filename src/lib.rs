//! Compiles the results of kernel autotuning into the parameter tables of a BLAS
//! library.
//!
//! Tuning runs are merged into a persistent database holding every measured
//! configuration. The database is then reduced to the best parameters of each device,
//! defaults are synthesized for unknown devices and the result is rendered as C++
//! tables.
#[cfg(test)]
extern crate env_logger;
#[macro_use]
extern crate tunedb_utils as utils;

pub mod attribute;
pub mod bests;
pub mod compact;
pub mod config;
pub mod database;
pub mod defaults;
pub mod emit;
pub mod error;
pub mod group;
pub mod import;
pub mod io;

pub use crate::attribute::{Attribute, GroupKey, Record, Schema};
pub use crate::config::{Config, VendorAlias};
pub use crate::database::{Database, Parameters, Section, SectionId, TuningResult};
pub use crate::error::{Error, ImportError};
