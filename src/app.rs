//! The shared request handler: rewrite table, routes and layers behind one cloneable service.
//! Both the listening process and the per-request invoker drive an `App`.

use crate::config::{load_rewrites, resolve, Settings};
use crate::error::AppError;
use crate::rewrite::RewriteTable;
use crate::routes::{common_routes, resource_routes};
use crate::state::AppState;
use crate::store::Store;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{
        header::{ALLOW, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::convert::Infallible;
use std::sync::Arc;
use tower::{util::BoxCloneService, Layer};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// The complete HTTP service.
pub type App = BoxCloneService<Request<Body>, Response, Infallible>;

/// Options that shape the router independent of where the document lives.
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub read_only: bool,
    pub cors: bool,
    pub body_limit: usize,
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            read_only: settings.read_only,
            cors: settings.cors,
            body_limit: settings.body_limit,
        }
    }
}

/// Load the document and rewrite table named by `settings` and assemble the app.
pub async fn build_app(settings: &Settings) -> Result<App, AppError> {
    let store = Store::open(&settings.db_path, settings.persist).await?;
    let rewrites = RewriteTable::compile(&load_rewrites(settings.routes_path.as_deref()).await?)?;
    let rewrite_count = rewrites.len();
    let app = app_from_store(store, &settings.id_field, rewrites, AppOptions::from(settings)).await?;
    tracing::info!(
        db = %settings.db_path.display(),
        rewrites = rewrite_count,
        persist = settings.persist,
        read_only = settings.read_only,
        "document loaded"
    );
    Ok(app)
}

/// Assemble the app over an already opened store.
pub async fn app_from_store(
    store: Store,
    id_field: &str,
    rewrites: RewriteTable,
    options: AppOptions,
) -> Result<App, AppError> {
    let model = store.read(|doc| resolve(doc, id_field)).await?;
    for resource in &model.resources {
        tracing::info!(resource = %resource.name, kind = ?resource.kind, "route");
    }
    let state = AppState {
        store,
        model: Arc::new(model),
    };
    Ok(assemble(state, rewrites, options))
}

fn assemble(state: AppState, rewrites: RewriteTable, options: AppOptions) -> App {
    let mut router = Router::new()
        .merge(common_routes(state.clone()))
        .merge(resource_routes(state));
    if options.read_only {
        router = router.layer(middleware::from_fn(read_only_guard));
    }
    router = router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(options.body_limit))
        .layer(middleware::from_fn(error_envelope));
    if options.cors {
        router = router.layer(CorsLayer::very_permissive());
    }
    router = router.layer(TraceLayer::new_for_http());

    // Rewriting wraps the router so it runs before route matching.
    let rewrites = Arc::new(rewrites);
    let rewrite = tower::util::MapRequestLayer::new(move |req: Request<Body>| rewrites.rewrite_request(req));
    BoxCloneService::new(rewrite.layer(router))
}

/// Reject every request that could mutate the document.
async fn read_only_guard(req: Request, next: Next) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }
    AppError::Forbidden(format!("{} not allowed in read-only mode", req.method())).into_response()
}

/// Give the router's bare 405 and the body limit's plain-text 413 the JSON error body.
async fn error_envelope(req: Request, next: Next) -> Response {
    let target = format!("{} {}", req.method(), req.uri().path());
    let res = next.run(req).await;
    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return res;
    }
    let err = match res.status() {
        StatusCode::METHOD_NOT_ALLOWED => AppError::MethodNotAllowed(target),
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(target),
        _ => return res,
    };
    let allow = res.headers().get(ALLOW).cloned();
    let mut out = err.into_response();
    if let Some(allow) = allow {
        out.headers_mut().insert(ALLOW, allow);
    }
    out
}
