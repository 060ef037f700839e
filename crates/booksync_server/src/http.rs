//! HTTP routes.

use crate::error::ServerError;
use crate::handler::{DateParam, RequestHandler};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::any::Any;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::Instrument;

/// Builds the router: the delta endpoint at the configured path plus
/// `/healthz`.
///
/// A panic anywhere below the router, including inside an injected store
/// or verifier, becomes the generic 500 response.
pub fn router(handler: RequestHandler) -> Router {
    let route = handler.context().config.route_path.clone();
    Router::new()
        .route("/healthz", get(healthz))
        .route(&route, get(get_books_after_date))
        .with_state(handler)
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");
    ServerError::Internal(format!("panic: {detail}")).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct BooksAfterDateQuery {
    #[serde(default)]
    date: Option<String>,
}

fn outcome(err: &ServerError) -> &'static str {
    match err {
        ServerError::MissingParameter => "missing_parameter",
        ServerError::InvalidFormat(_) => "invalid_format",
        ServerError::Unauthorized(_) => "unauthorized",
        ServerError::Store(_) => "store_error",
        ServerError::Internal(_) | ServerError::Io(_) => "internal_error",
    }
}

async fn get_books_after_date(
    State(handler): State<RequestHandler>,
    headers: HeaderMap,
    query: Result<Query<BooksAfterDateQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let span = tracing::info_span!(
        "books_after_date",
        auth = handler.context().gate.is_enabled(),
        outcome = tracing::field::Empty,
        created = tracing::field::Empty,
        updated = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    async move {
        let date = match query {
            Ok(Query(q)) => DateParam::from_option(q.date),
            Err(rejection) => {
                tracing::debug!(%rejection, "unreadable query string");
                DateParam::Unreadable
            }
        };

        let result = handler.handle_books_after_date(&headers, date).await;

        let span = tracing::Span::current();
        span.record("latency_ms", started.elapsed().as_millis() as u64);

        match result {
            Ok(body) => {
                span.record("outcome", "ok");
                span.record("created", body.snapshot.count_created_data);
                span.record("updated", body.snapshot.count_updated_data);
                Json(body).into_response()
            }
            Err(err) => {
                span.record("outcome", outcome(&err));
                if err.is_server_error() {
                    tracing::error!(error = %err, "books_after_date failed");
                } else {
                    tracing::info!(
                        error = %err,
                        status = err.status_code().as_u16(),
                        "request rejected"
                    );
                }
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}
