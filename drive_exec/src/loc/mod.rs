//! # Localisation module
//!
//! Estimates the pose of the robot from range sensor scans, independently of
//! the wheel encoders.
//!
//! Samples from the sensor are accumulated into [`LidarScan`]s by a
//! [`ScanAccumulator`], each sample placed under the encoder pose at the
//! time it was captured. Completed scans are handed to a single
//! [`ScanProcessor`] over a bounded channel, which registers them either
//! against the previous scan ([`RelativeIcp`]), against a known
//! [`ReferenceModel`] ([`Icp`]) or through a particle filter ([`Mcl`]), and
//! appends the resulting estimate to a [`RobotStateMap`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod icp;
pub mod mcl;
pub mod params;
pub mod processor;
mod reference;
mod relative_icp;
mod scan;
mod state_map;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use icp::{Icp, IcpParams, IcpResult};
pub use mcl::{Mcl, MclParams, Particle, PolarGaussian};
pub use params::LidarParams;
pub use processor::{lidar_pipeline, OperatingMode, ScanAccumulator, ScanClock, ScanProcessor};
pub use reference::{PointCloudModel, ReferenceModel, SegmentModel};
pub use relative_icp::RelativeIcp;
pub use scan::{LidarSample, LidarScan, MAX_SCAN_SIZE};
pub use state_map::{RobotState, RobotStateMap};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised during scan registration.
#[derive(Debug, thiserror::Error)]
pub enum IcpError {
    #[error("No point pairs survived outlier rejection")]
    NoCorrespondences,

    #[error("A reference model must contain at least one feature")]
    EmptyReferenceModel,

    #[error("ICP requires an iteration cap or a timeout")]
    Unbounded,
}

/// Errors raised by the particle filter.
#[derive(Debug, thiserror::Error)]
pub enum MclError {
    #[error("The particle filter needs at least one particle")]
    NoParticles,

    #[error("All particle weights are zero or invalid")]
    DegenerateWeights,
}

/// Errors raised by the robot state map.
#[derive(Debug, thiserror::Error)]
pub enum StateMapError {
    #[error("Cannot index a state by a NaN timestamp")]
    NanTimestamp,
}

/// Errors raised by the scan pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Registration failed: {0}")]
    Icp(#[from] IcpError),

    #[error("Particle filter failed: {0}")]
    Mcl(#[from] MclError),

    #[error("Could not record the estimate: {0}")]
    StateMap(#[from] StateMapError),

    #[error("No prior state is available to register the scan against")]
    NoPriorState,

    #[error("The selected operating mode requires a reference model")]
    MissingReferenceModel,

    #[error("The scan producer has disconnected")]
    Disconnected,
}
