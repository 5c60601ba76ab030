//! Unified error handling for the route-planner library.
//!
//! Every fallible operation in the pipeline returns [`RouteError`]. Provider
//! failures carry the provider name and a message rather than the underlying
//! client error so the type stays `Clone` and can be stored in notifications.

use thiserror::Error;

/// Unified error type for route-planner operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    /// The provider answered with a non-2xx status
    #[error("{provider} returned HTTP {status}: {message}")]
    HttpStatus {
        provider: String,
        status: u16,
        message: String,
    },

    /// The provider answered but the payload is unusable
    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse { provider: String, message: String },

    /// Fewer waypoints than a route needs
    #[error("Route has {count} waypoints, minimum {minimum_required} required")]
    InsufficientWaypoints {
        count: usize,
        minimum_required: usize,
    },

    /// No waypoint with this id exists in the store
    #[error("Waypoint '{id}' not found")]
    WaypointNotFound { id: String },

    /// Latitude outside -90..=90, longitude outside -180..=180, or non-finite
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Encoded polyline could not be decoded
    #[error("Polyline decode failed at byte {position}: {message}")]
    PolylineDecode { position: usize, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl RouteError {
    /// Whether this error came from talking to an external provider.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            RouteError::Transport { .. }
                | RouteError::HttpStatus { .. }
                | RouteError::MalformedResponse { .. }
        )
    }

    pub(crate) fn malformed(provider: &str, message: impl Into<String>) -> Self {
        RouteError::MalformedResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for route-planner operations.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Extension trait for converting Option to RouteError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a malformed-response error.
    fn ok_or_malformed(self, provider: &str, message: &str) -> Result<T>;

    /// Convert Option to Result with a waypoint-not-found error.
    fn ok_or_waypoint_not_found(self, id: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed(self, provider: &str, message: &str) -> Result<T> {
        self.ok_or_else(|| RouteError::malformed(provider, message))
    }

    fn ok_or_waypoint_not_found(self, id: &str) -> Result<T> {
        self.ok_or_else(|| RouteError::WaypointNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouteError::InsufficientWaypoints {
            count: 1,
            minimum_required: 2,
        };
        assert!(err.to_string().contains("1 waypoints"));

        let err = RouteError::HttpStatus {
            provider: "directions".to_string(),
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "directions returned HTTP 503: Service Unavailable"
        );
    }

    #[test]
    fn test_provider_error_classification() {
        assert!(RouteError::malformed("elevation", "empty").is_provider_error());
        assert!(!RouteError::WaypointNotFound { id: "wp-1".into() }.is_provider_error());
        assert!(!RouteError::InvalidCoordinate {
            latitude: 91.0,
            longitude: 0.0
        }
        .is_provider_error());
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_waypoint_not_found("wp-9"),
            Err(RouteError::WaypointNotFound { .. })
        ));
        assert_eq!(Some(3).ok_or_malformed("directions", "missing"), Ok(3));
    }
}
