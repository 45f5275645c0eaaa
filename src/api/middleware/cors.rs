use http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The leaderboard JSON is public and read-only, so any origin may fetch it.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(AllowOrigin::any())
}
