use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::{board_page, leaderboard, loading_page};
use crate::api::middleware::cors::cors_layer;
use crate::constants::{AVATAR_ROUTE, LEADERBOARD_FETCH_ERROR};
use crate::scoring::roster::Roster;
use crate::util::env::Env;
use crate::util::github::{GitHub, GithubErr, GithubResult, RepoSource};

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

/// Shared, read-only request state
pub struct AppState {
    pub env: Env,
    pub roster: Roster,
    pub source: Arc<dyn RepoSource>,
    /// Client the board page uses to fetch the leaderboard JSON
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(env: Env) -> GithubResult<Self> {
        let source = Arc::new(GitHub::new(&env)?);
        Ok(Self::with_source(env, source))
    }

    pub fn with_source(env: Env, source: Arc<dyn RepoSource>) -> Self {
        let roster = Roster::with_extra_aliases(&env.participant_aliases);
        Self {
            env,
            roster,
            source,
            http: reqwest::Client::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let avatars = ServeDir::new(format!("{}/avatars", state.env.assets_dir));

    Router::new()
        .route("/", get(loading_page))
        .route("/board", get(board_page))
        .route("/api/leaderboard", get(leaderboard))
        .route("/health", get(|| async { "ok" }))
        .nest_service(AVATAR_ROUTE, avatars)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors_layer())
        .with_state(state)
}

/// Logs the error behind any `RouteError` response; the response body itself stays generic.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

/// Binds the configured port and serves until ctrl-c.
#[instrument(skip(state))]
pub async fn start_server(state: Arc<AppState>) -> std::io::Result<()> {
    let port = state.env.server_api_port;
    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tracing::info!(
        server_url = &format!("http://127.0.0.1:{port}"),
        owner = %state.env.repo_owner,
        repo = %state.env.repo_name,
        attribution = ?state.env.attribution,
        "server ready"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
    }

    tracing::info!("shutting down");
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Github(#[from] GithubErr),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = match &self {
            RouteError::Github(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: String::from(LEADERBOARD_FETCH_ERROR),
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

#[cfg(test)]
mod test {
    use axum::body::{Body, to_bytes};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::util::github::test::commit_json;

    fn env(pairs: &[(&str, String)]) -> Env {
        Env::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    async fn github_mock(status: u16, body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/log/commits"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        server
    }

    fn app(github: &MockServer, extra: &[(&str, String)]) -> Router {
        let mut pairs = vec![
            ("GITHUB_API_URL", github.uri()),
            ("REPO_OWNER", String::from("owner")),
            ("REPO_NAME", String::from("log")),
        ];
        pairs.extend(extra.iter().cloned());

        router(Arc::new(AppState::new(env(&pairs)).unwrap()))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let res = app
            .oneshot(http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_leaderboard_ok() {
        let github = github_mock(
            200,
            json!([
                commit_json("1", Some("x"), "X", "[Easy] fix"),
                commit_json("2", Some("x"), "X", "no tag"),
                commit_json("3", Some("y"), "Y", "[Hard] big"),
            ]),
        )
        .await;

        let (status, body) = get(app(&github, &[]), "/api/leaderboard").await;
        let body: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scores"], json!({ "x": 1, "y": 3 }));
        assert_eq!(body["details"]["x"].as_array().unwrap().len(), 1);
        assert_eq!(body["processedCommits"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_leaderboard_upstream_failure() {
        for status in [404, 500] {
            let github = github_mock(status, json!({ "message": "nope" })).await;
            let (code, body) = get(app(&github, &[]), "/api/leaderboard").await;
            let body: Value = serde_json::from_str(&body).unwrap();

            assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"], LEADERBOARD_FETCH_ERROR);
            assert!(body.get("scores").is_none());
        }
    }

    #[tokio::test]
    async fn test_leaderboard_malformed_payload() {
        let github = github_mock(200, json!({ "not": "a list" })).await;
        let (code, body) = get(app(&github, &[]), "/api/leaderboard").await;

        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains(LEADERBOARD_FETCH_ERROR));
    }

    #[tokio::test]
    async fn test_root_renders_loading() {
        let github = MockServer::start().await;
        let (code, body) = get(app(&github, &[]), "/?debug=1").await;

        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("Loading leaderboard..."));
        assert!(body.contains("url=/board?debug=1"));
    }

    #[tokio::test]
    async fn test_board_renders_failure_with_retry() {
        let github = MockServer::start().await;
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/leaderboard"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": LEADERBOARD_FETCH_ERROR })),
            )
            .mount(&api)
            .await;

        let url = format!("{}/api/leaderboard", api.uri());
        let (code, body) = get(app(&github, &[("LEADERBOARD_URL", url)]), "/board").await;

        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("Error: Error fetching data: 500"));
        assert!(body.contains(">Retry</a>"));
    }

    #[tokio::test]
    async fn test_board_renders_scores() {
        let github = MockServer::start().await;
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/leaderboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "scores": { "tanmay": 1, "kalyani": 3 },
                "details": {}
            })))
            .mount(&api)
            .await;

        let url = format!("{}/api/leaderboard", api.uri());
        let (code, body) = get(app(&github, &[("LEADERBOARD_URL", url)]), "/board").await;

        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("width: 75.00%"));
        assert!(body.contains("/avatars/kalyani.svg"));
        assert!(body.find(">kalyani<").unwrap() < body.find(">tanmay<").unwrap());
    }

    #[tokio::test]
    async fn test_health() {
        let github = MockServer::start().await;
        let (code, body) = get(app(&github, &[]), "/health").await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
