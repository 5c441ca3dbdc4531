//! This crate provides the MapMaker server. It serves maps and time series of marine plankton
//! diversity indices and environmental parameters under a range of climate scenarios, read from a
//! directory of NetCDF files.
//!
//! Three endpoints are exposed under `/api`:
//!
//! * `globe-data` returns a global gridded snapshot of an environmental parameter or an
//!   ecological index for one year.
//! * `map-data` returns a gridded snapshot of an ecological index for one year.
//! * `line-data` returns the yearly series of an ecological index at a point or averaged over a
//!   box, optionally paired with an environmental parameter.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team.
//! * [Serde](serde) performs (de)serialisation of query and response data.
//! * [netcdf] reads the datasets.
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays used in numerical
//!   computation.

pub mod app;
pub mod app_state;
pub mod catalog;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod models;
pub mod operation;
pub mod operations;
pub mod resource_manager;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod trend;
pub mod types;
pub mod validated_query;
