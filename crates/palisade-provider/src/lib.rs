//! Resource handlers for the Palisade PAN-OS provider.
//!
//! This crate wires the `palisade-core` engine into the per-resource
//! Create/Read/Update/Delete/Import surface the orchestrator calls:
//! typed models with optional attribute cells, bidirectional
//! model⇄entry translators, the certificate importer, the one-shot
//! actions (commit-all, device-group parent moves, API key
//! generation), provider configuration with `PANOS_*` environment
//! defaults, and inspection-mode data sources.
//!
//! Every resource handler follows the same shape: extract the model,
//! resolve its [`Location`](palisade_core::location::Location), require
//! device-connected mode, run the entry manager or group reconciler,
//! copy the device's canonical result back into the model, and stamp a
//! fresh tfid.

pub mod actions;
pub mod config;
pub mod datasource;
pub mod provider;
pub mod resources;

pub use config::{ConfigError, ProviderConfig};
pub use provider::Provider;
pub use resources::ResourceError;
