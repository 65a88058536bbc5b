//! Cyclic module interface
//!
//! Modules stepped by an executable's main loop (the drive motion planner
//! for example) implement [`State`], which separates parameter loading and
//! initialisation from the per-cycle processing call.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use serde::de::DeserializeOwned;

// Internal imports
use crate::params::{self, LoadError};
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Parameters the module is initialised from.
    type Params: DeserializeOwned;
    /// An error which can occur during initialisation.
    type InitError: From<LoadError>;

    /// Data required for cyclic processing.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;
    /// An error which can occur during cyclic processing.
    type ProcError;

    /// Initialise the module from already loaded parameters.
    fn init(&mut self, params: Self::Params, session: &Session)
        -> Result<(), Self::InitError>;

    /// Load the module's parameter file (relative to the params directory)
    /// and initialise from it.
    fn init_from_file(&mut self, param_file_path: &str, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Self::Params = params::load(param_file_path)?;
        self.init(params, session)
    }

    /// Main module processing function.
    ///
    /// # Outputs
    /// - On success a tuple of the output data and status report.
    /// - On error a `ProcError` instance.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
