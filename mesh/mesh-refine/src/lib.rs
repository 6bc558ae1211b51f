//! Quality refinement for 2D constrained Delaunay triangulations.
//!
//! Given a triangulation built by [`mesh_cdt`] and a set of quality
//! targets, [`enforce_quality`] inserts Steiner points until every
//! triangle meets the targets or the Steiner budget runs out. Both
//! classical schemes are available in one framework:
//!
//! - **Ruppert**: a subsegment is encroached when a vertex lies inside
//!   its diametral circle; the result is a conforming Delaunay
//!   triangulation.
//! - **Chew** (default): the narrower diametral lens is used instead,
//!   inserting fewer Steiner points on segments.
//!
//! Encroached subsegments are always repaired before skinny or oversized
//! triangles, worst (shortest-edge) triangle first. Termination on small
//! input angles rests on two devices: segments adjoining another segment
//! are split on concentric power-of-two shells rather than at midpoints,
//! and skinny triangles pinned between matching shells are exempted from
//! refinement (Miller, Pav, Walkington).
//!
//! # Layer 0 Crate
//!
//! No GUI or engine dependencies; usable from CLI tools, servers, WASM,
//! and test harnesses.
//!
//! # Example
//!
//! ```
//! use mesh_cdt::{Mesh, Point2, Pslg};
//! use mesh_refine::{enforce_quality, RefineParams};
//!
//! let pslg = Pslg::from_points(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//! ])
//! .with_segments(vec![[0, 1], [1, 2], [2, 3], [3, 0]]);
//! let mut mesh = Mesh::triangulate(&pslg).unwrap();
//!
//! let params = RefineParams::with_min_angle(20.0)
//!     .and_max_area(0.05)
//!     .and_steiner_limit(1000);
//! let report = enforce_quality(&mut mesh, &params).unwrap();
//! assert!(report.steiner_points > 0);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Mesh indices and counts don't overflow in practice
#![allow(clippy::cast_possible_truncation)]

mod check;
mod error;
mod params;
mod quality;
mod queues;
mod refine;
mod result;

pub use check::{check_delaunay, check_mesh, DelaunayCheck, MeshCheck};
pub use error::{RefineError, RefineResult};
pub use params::{RefineParams, SegmentSplitPolicy, UserTest};
pub use refine::enforce_quality;
pub use result::RefineReport;
