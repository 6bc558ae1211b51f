//! 2D constrained Delaunay triangulation container.
//!
//! This crate owns the mesh that refinement algorithms operate on:
//!
//! - [`Mesh`] - arena-backed triangulation with triangle and subsegment
//!   handles ([`Otri`], [`Osub`])
//! - [`Mesh::triangulate`] - build a constrained Delaunay triangulation
//!   from a [`Pslg`]
//! - [`Mesh::insert_vertex`] / [`Mesh::undo_vertex`] /
//!   [`Mesh::delete_vertex`] - journaled incremental updates
//! - [`predicates`] - robust `orient2d` / `incircle` with an exact
//!   expansion-arithmetic fallback, and circumcenter / off-center
//!   construction
//!
//! # Layer 0 Crate
//!
//! No GUI or engine dependencies; usable from CLI tools, servers, WASM,
//! and test harnesses.
//!
//! # Handles
//!
//! A triangle handle selects one directed edge of one triangle; a
//! subsegment handle selects one direction along a constrained segment.
//! Handles are plain `Copy` values and never dangle silently: death
//! tests ([`Mesh::tri_is_dead`], [`Mesh::subseg_is_dead`]) and endpoint
//! snapshots are the intended staleness protocol for queued handles.
//!
//! # Example
//!
//! ```
//! use mesh_cdt::{Mesh, Pslg};
//! use nalgebra::Point2;
//!
//! let pslg = Pslg::from_points(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.0, 1.0),
//! ]);
//! let mesh = Mesh::triangulate(&pslg).unwrap();
//! assert_eq!(mesh.triangle_count(), 1);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Mesh indices and counts don't overflow in practice
#![allow(clippy::cast_possible_truncation)]

mod build;
mod error;
mod handles;
mod insert;
mod mesh;
pub mod predicates;
mod vertex;

pub use build::Pslg;
pub use error::{CdtError, CdtResult};
pub use handles::{Osub, Otri, SubsegId, TriId, VertexId};
pub use insert::{FlawObserver, InsertStatus, NoopObserver};
pub use mesh::Mesh;
pub use vertex::{Vertex, VertexKind};

// Re-export the math types used in the public API.
pub use nalgebra::{Point2, Vector2};
