// src/middleware/rate_limit.rs
//
// Janela fixa por cliente para a busca pública de pacientes.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use moka::sync::Cache;

use crate::{common::error::AppError, config::AppState};

#[derive(Clone)]
pub struct LookupRateLimiter {
    // A entrada expira com a janela, e o contador recomeça do zero
    hits: Cache<String, Arc<AtomicU32>>,
    max: u32,
    /// Só atrás de um proxy confiável o `X-Forwarded-For` identifica o cliente.
    trust_forwarded: bool,
}

impl LookupRateLimiter {
    pub fn new(max: u32, window: Duration, trust_forwarded: bool) -> Self {
        Self {
            hits: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
            max,
            trust_forwarded,
        }
    }

    /// Conta a requisição; `false` quando a janela já estourou.
    pub fn check(&self, key: &str) -> bool {
        let counter = self
            .hits
            .get_with(key.to_owned(), || Arc::new(AtomicU32::new(0)));
        counter.fetch_add(1, Ordering::Relaxed) < self.max
    }
}

/// Endereço do socket. O primeiro salto do `X-Forwarded-For` só vale com `trust_forwarded`.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let forwarded = if trust_forwarded {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_owned)
    } else {
        None
    };

    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn lookup_rate_limit(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, app_state.lookup_limiter.trust_forwarded);

    if !app_state.lookup_limiter.check(&key) {
        tracing::warn!(client = %key, "Limite de consultas públicas excedido");
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_support::lazy_state;

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer), false), "127.0.0.1");
        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");
        assert_eq!(client_key(&HeaderMap::new(), Some(peer), true), "127.0.0.1");
        assert_eq!(client_key(&HeaderMap::new(), None, false), "unknown");
    }

    #[test]
    fn window_allows_exactly_max_requests() {
        let limiter = LookupRateLimiter::new(3, Duration::from_secs(60), false);
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    fn request(peer: &str, forwarded: &str) -> Request<Body> {
        let addr: SocketAddr = format!("{peer}:5000").parse().unwrap();
        let mut request = Request::builder()
            .uri("/cedula/123")
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    fn app() -> Router {
        // lazy_state: 2 requisições por janela, sem proxy confiável
        let state = lazy_state();
        Router::new()
            .route("/cedula/{cedula}", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state.clone(), lookup_rate_limit))
            .with_state(state)
    }

    #[tokio::test]
    async fn exceeding_the_window_returns_429() {
        let app = app();

        for _ in 0..2 {
            let response = app.clone().oneshot(request("198.51.100.1", "10.0.0.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let blocked = app.clone().oneshot(request("198.51.100.1", "10.0.0.1")).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(request("198.51.100.2", "10.0.0.1")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rotating_forwarded_header_does_not_reset_the_window() {
        let app = app();

        for (i, forwarded) in ["10.0.0.1", "10.0.0.2"].into_iter().enumerate() {
            let response = app.clone().oneshot(request("198.51.100.9", forwarded)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{i}");
        }
        let blocked = app.oneshot(request("198.51.100.9", "10.0.0.3")).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
