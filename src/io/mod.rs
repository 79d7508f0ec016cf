//! IO module - run configuration files for the `vmc-qmc` binary.

mod config;

pub use config::{read_run_config, EnergyMethod, RunConfig, UpdateMethod};
