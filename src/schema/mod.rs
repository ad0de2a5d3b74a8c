//! Input table schema
//!
//! This module defines the typed view over the experiment platform export:
//! disambiguated column names and one immutable row per participant.

mod table;

pub use table::*;
