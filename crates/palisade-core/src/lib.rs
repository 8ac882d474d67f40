//! Core reconciliation engine for the Palisade PAN-OS provider.
//!
//! This crate holds everything below the per-resource surface: the
//! [`location`] placement model, the opaque [`tfid`] identity codec, the
//! [`ledger`] for encrypted attribute values, the [`xmlapi`] element tree
//! and xpath builder, the [`client`] transport interface, the generic
//! [`manager`] for single-entry CRUD, and the [`reconciler`] that turns a
//! desired entry set into a minimal device batch.
//!
//! # Architecture
//!
//! ```text
//! resource shell (palisade-provider)
//!     │
//!     ├── location::Location ──────── placement + xpath prefix
//!     ├── tfid::ResourceIdentity ──── opaque state identity
//!     ├── ledger::EncryptedValues ─── plaintext⇄ciphertext pairs
//!     │
//!     ├── manager::EntryManager ───┐
//!     ├── reconciler::plan/execute ┤── client::DeviceClient (XML API)
//!     └── import_lock ─────────────┘
//! ```
//!
//! The device is the ground truth between invocations; nothing in this
//! crate caches device state across calls.

pub mod client;
pub mod import_lock;
pub mod ledger;
pub mod location;
pub mod manager;
pub mod reconciler;
pub mod tfid;
pub mod version;
pub mod xmlapi;

pub use client::{DeviceClient, DeviceError};
pub use location::{Location, LocationError, LocationModel};
pub use tfid::ResourceIdentity;
pub use version::ApiVersion;
