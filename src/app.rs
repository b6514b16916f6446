use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, communities, discover, invites, items, leases, requests, state::AppState, subscriptions,
};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(communities::router())
                .merge(invites::router())
                .merge(items::router())
                .merge(leases::router())
                .merge(subscriptions::router())
                .merge(requests::router())
                .merge(discover::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{
        extract::FromRef,
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn bearer(state: &AppState) -> String {
        let keys = JwtKeys::from_ref(state);
        let token = keys.sign_access(Uuid::new_v4(), "ana").unwrap();
        format!("Bearer {token}")
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = build_app(AppState::fake());
        for path in ["/api/v1/items", "/api/v1/leases", "/api/v1/dashboard", "/api/v1/me"] {
            let res = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
            let json = body_json(res).await;
            assert_eq!(json["error"], "Missing Authorization header", "{path}");
        }
    }

    #[tokio::test]
    async fn bind_addr_comes_from_config() {
        let state = AppState::fake();
        let addr = state.config.bind_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:0");
    }

    #[tokio::test]
    async fn inverted_lease_range_is_rejected_before_touching_the_database() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let app = build_app(state);

        let body = serde_json::json!({
            "item_id": Uuid::new_v4(),
            "lessee_id": Uuid::new_v4(),
            "start_date": "2024-09-29T00:00:00Z",
            "end_date": "2024-09-19T00:00:00Z",
        });
        let res = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/leases")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert!(json["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn empty_borrow_window_is_rejected() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let app = build_app(state);

        let body = serde_json::json!({
            "start_date": "2024-09-19T00:00:00Z",
            "end_date": "2024-09-19T00:00:00Z",
        });
        let res = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/api/v1/items/{}/borrow", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
