//! Location and cell tower sampling for transit vehicle tracking.
//!
//! A [`scanner::LocationScanner`] follows the platform location service through
//! connect, sampling and disconnect, and a [`cell_scanner::CellScanner`] polls
//! telephony for the serving and neighboring cells. Both publish every sample
//! through an [`emitter::Emitter`].

pub mod cell;
pub mod cell_scanner;
pub mod config;
pub mod emitter;
pub mod error;
pub mod location;
pub mod platform;
pub mod radio;
pub mod record;
pub mod replay;
pub mod scanner;
