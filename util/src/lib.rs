//! Utility library for the drive software
//!
//! Provides the ambient machinery shared by every executable: sessions,
//! logging, parameter loading, CSV archives and the cyclic module interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
#[macro_use]
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
