//! Spatial world data for Colony simulations.
//!
//! This crate defines [`Grid`], the single owner of per-voxel state:
//! media concentrations, barriers, cell occupancy, and the refresh/static
//! overrides applied every cycle. One type serves both 2D and 3D worlds;
//! the rank is fixed by the [`Shape`] it was built with.
//!
//! # Edge behavior
//!
//! [`EdgeBehavior::Wrap`] makes every axis periodic (a torus), while
//! [`EdgeBehavior::Clamp`] treats everything outside the shape as barrier.
//!
//! # Stochastic sampling
//!
//! [`Grid::sample_population`] draws discrete event counts (mutations,
//! divisions) from the grid's seeded RNG, see [`sampling`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod edge;
pub mod grid;
pub mod points;
pub mod sampling;
pub mod shape;

pub use edge::EdgeBehavior;
pub use grid::Grid;
pub use points::{RefreshPoint, StaticMedia, StaticPoint};
pub use sampling::{sample_population, POISSON_THRESHOLD};
pub use shape::{Shape, ShapeError};
