//! Core contract types for Covenant.
//!
//! This crate contains the value domain, the contract variants and their
//! `check` operation, and the contract-violation error. No IO, no async.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod contract;
mod error;
mod value;

pub use contract::{Contract, ContractFailure, FunContract, Param, TypeTag};
pub use error::{Blame, ContractError, DEFAULT_PREVIEW_CHARS, truncate_preview};
pub use value::{ErrorObject, Value};
