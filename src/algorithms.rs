//! # Algorithm Toolbox
//!
//! Direct access to the pure algorithms of the route pipeline. Use these
//! to integrate a single step into your own system without a session or
//! providers.
//!
//! ## Geometry
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Polyline Length**: Total distance along a path
//! - **Bounds / Center**: Bounding box and centroid of a path
//! - **Polyline Codec**: Encoded polyline decode/encode
//!
//! ## Route Processing
//!
//! - **Nearest Vertex**: The snapping primitive
//! - **Step Classification**: Surface type of a single route step
//! - **Elevation Sampling**: Stride sampling and gain/loss statistics
//! - **Response Parsing**: Directions payload to [`GeneratedRoute`]
//!
//! # Example
//!
//! ```rust
//! use route_planner::algorithms::{decode, nearest_vertex, GpsPoint};
//!
//! let path = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! let (index, meters) = nearest_vertex(&GpsPoint::new(40.7, -120.95), &path).unwrap();
//! assert_eq!(index, 1);
//! println!("Nearest vertex is {:.0} m away", meters);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    Bounds, ElevationPoint, GeneratedRoute, GpsPoint, RouteStep, SurfaceType, Waypoint,
};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    compute_bounds, compute_center, cumulative_distances, haversine_distance, polyline_length,
};

// =============================================================================
// Polyline Codec
// =============================================================================

pub use crate::polyline::{decode, decode_with_precision, encode, encode_with_precision};

// =============================================================================
// Route Processing
// =============================================================================

/// Index and distance of the path vertex nearest to a point.
pub use crate::snapping::nearest_vertex;

/// Surface type of a single directions step.
///
/// Priority: ferry, then intersection class tags, then the street name or
/// route reference.
pub use crate::surface::classify_step;

/// Parse a directions response body.
pub use crate::directions::parse_response;

pub use crate::elevation::{build_profile, sample_path, summarize};
