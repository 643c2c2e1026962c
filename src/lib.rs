//! Access, gridding and age fitting for BPASS stellar-population models.
//!
//! * [`data`] loads BPASS outputs, model inputs and observation tables.
//! * [`hrdiagrams`] and [`cmd`] hold time-resolved HR diagrams and
//!   colour-magnitude diagrams.
//! * [`age`] turns observed sources into age probability distributions.
//! * [`spectral`] bins and interpolates spectra, [`render`] exports figures.

pub mod age;
pub mod cmd;
pub mod color;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod grid;
pub mod hrdiagrams;
pub mod render;
pub mod spectral;

pub use error::{HokiError, Result};
