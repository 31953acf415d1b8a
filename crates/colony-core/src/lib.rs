//! Core types and traits for the Colony ecosystem simulator.
//!
//! This is the leaf crate of the workspace. It defines the identifiers,
//! coordinate type, capability traits, and error enums that the grid,
//! engine, and simulation packages share.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::{GridError, PackageError};
pub use id::{CellId, CellIdAllocator, Coord, CycleId};
pub use traits::{Backup, Biomass, Cell, Model, Runnable};
