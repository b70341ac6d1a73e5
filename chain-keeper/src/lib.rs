//! The chain keeper's library definitions

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod chain_client;
pub mod cli;
pub mod db;
pub mod error;
pub mod flusher;
pub mod keeper;
pub mod pairs;
pub mod rounds;
pub mod scanner;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_utils;
