// File: src/dispatch.rs
// Purpose: Request dispatch pipeline: match, middleware, handle, compose,
// degrade
//
// Per request the pipeline moves through: matching → middleware →
// handling → {composing | error | not-found} → responded. Failures never
// escape: handler errors degrade to the nearest error boundary with a
// correlation id, absence degrades to the nearest not-found boundary, and
// a generic fallback covers routes with no boundary anywhere.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use arc_swap::ArcSwap;
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, error, warn};
use uuid::Uuid;

use asterism_router::{PathParams, RouteEntry, RouteKind, RouteManifest};

use crate::cache::ModuleCache;
use crate::module::{
    ActionResponse, BoundaryContext, CompiledModule, HandlerError, HandlerResult,
    MiddlewareOutcome, ModuleCompiler, PageContext,
};
use crate::request::RequestContext;

/// Request dispatcher over an atomically swappable route manifest.
///
/// The manifest reference is read once per request; rebuilds publish a
/// complete new manifest via [`Dispatcher::install_manifest`] and in-flight
/// requests keep whichever snapshot they started with. The module cache is
/// injected, shared, and safe to hit concurrently.
pub struct Dispatcher {
    manifest: ArcSwap<RouteManifest>,
    compiler: Arc<dyn ModuleCompiler>,
    cache: Arc<ModuleCache>,
}

impl Dispatcher {
    pub fn new(
        manifest: RouteManifest,
        compiler: Arc<dyn ModuleCompiler>,
        cache: Arc<ModuleCache>,
    ) -> Self {
        Self {
            manifest: ArcSwap::from_pointee(manifest),
            compiler,
            cache,
        }
    }

    /// Current manifest snapshot.
    pub fn manifest(&self) -> Arc<RouteManifest> {
        self.manifest.load_full()
    }

    /// Publishes a fully built manifest. Requests already running keep the
    /// previous snapshot; new requests see the new one.
    pub fn install_manifest(&self, manifest: RouteManifest) {
        self.manifest.store(Arc::new(manifest));
    }

    /// Runs one request through the pipeline to a terminal response.
    pub async fn dispatch(&self, ctx: RequestContext) -> Response {
        let manifest = self.manifest.load_full();

        let Some(matched) = manifest.match_path(&ctx.path) else {
            debug!(path = %ctx.path, "no route matched");
            return self.unmatched_not_found(&manifest, &ctx).await;
        };

        let entry = matched.entry;
        let mut ctx = ctx.with_params(decode_params(matched.params));
        debug!(path = %ctx.path, pattern = %entry.url_pattern, "route matched");

        // Middleware chain, outermost first. Any link may short-circuit
        // with a response; the handler runs only if none did.
        for mw_path in &entry.middleware {
            let outcome = match self.middleware_outcome(mw_path, ctx.clone()).await {
                Ok(outcome) => outcome,
                Err(err) => return self.degrade(entry, &ctx, err).await,
            };
            match outcome {
                MiddlewareOutcome::Continue(next) => ctx = next,
                MiddlewareOutcome::Respond(response) => return raw_response(response),
            }
        }

        let handled = match entry.kind {
            RouteKind::Handler => self.run_handler(entry, &ctx).await,
            RouteKind::Page => self.run_page(entry, &ctx).await,
        };

        match handled {
            Ok(response) => response,
            Err(err) => self.degrade(entry, &ctx, err).await,
        }
    }

    async fn middleware_outcome(
        &self,
        path: &PathBuf,
        ctx: RequestContext,
    ) -> HandlerResult<MiddlewareOutcome> {
        let module = self.module(path)?;
        let Some(mw) = module.as_middleware() else {
            return Err(HandlerError::Internal(anyhow!(
                "{} did not compile to a middleware module",
                path.display()
            )));
        };
        (mw.handle)(ctx).await
    }

    /// Page route: loader, render, then layout composition.
    async fn run_page(
        &self,
        entry: &RouteEntry,
        ctx: &RequestContext,
    ) -> HandlerResult<Response> {
        let module = self.module(&entry.absolute_path)?;
        let Some(page) = module.as_page() else {
            return Err(HandlerError::Internal(anyhow!(
                "{} did not compile to a page module",
                entry.absolute_path.display()
            )));
        };

        // Mutation verbs run the page's action for that verb instead of
        // the render path. Action responses are raw, never composed.
        if ctx.method != Method::GET && ctx.method != Method::HEAD {
            return match page.actions.get(ctx.method.as_str()) {
                Some(action) => action(ctx.clone()).await.map(raw_response),
                None => Ok(plain_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "Method Not Allowed",
                )),
            };
        }

        let data = match &page.loader {
            Some(loader) => Some(loader(ctx.clone()).await?),
            None => None,
        };

        let body = (page.render)(PageContext {
            request: ctx.clone(),
            data,
        })
        .await?;

        let body = self.compose_layouts(&entry.layouts, ctx, body).await?;
        Ok(Html(body).into_response())
    }

    /// `route` file: invoke the action registered for the request verb.
    /// HEAD falls back to the GET action; output skips layout composition.
    async fn run_handler(
        &self,
        entry: &RouteEntry,
        ctx: &RequestContext,
    ) -> HandlerResult<Response> {
        let module = self.module(&entry.absolute_path)?;
        let Some(handler) = module.as_handler() else {
            return Err(HandlerError::Internal(anyhow!(
                "{} did not compile to a handler module",
                entry.absolute_path.display()
            )));
        };

        let verb = if ctx.method == Method::HEAD {
            "GET"
        } else {
            ctx.method.as_str()
        };

        match handler.actions.get(verb) {
            Some(action) => action(ctx.clone()).await.map(raw_response),
            None => Ok(plain_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method Not Allowed",
            )),
        }
    }

    /// Wraps rendered output in the route's layout chain, innermost first:
    /// the page body becomes the nearest layout's content, and so on out
    /// to the root layout.
    async fn compose_layouts(
        &self,
        layouts: &[PathBuf],
        ctx: &RequestContext,
        body: String,
    ) -> HandlerResult<String> {
        let mut body = body;
        for path in layouts.iter().rev() {
            let module = self.module(path)?;
            let Some(layout) = module.as_layout() else {
                return Err(HandlerError::Internal(anyhow!(
                    "{} did not compile to a layout module",
                    path.display()
                )));
            };
            body = (layout.render)(ctx.clone(), body).await?;
        }
        Ok(body)
    }

    /// Routes a handler failure to the matching terminal state.
    async fn degrade(
        &self,
        entry: &RouteEntry,
        ctx: &RequestContext,
        err: HandlerError,
    ) -> Response {
        match err {
            HandlerError::NotFound => {
                self.degrade_not_found(
                    entry.not_found_boundary.as_ref(),
                    &entry.layouts,
                    ctx,
                )
                .await
            }
            HandlerError::Internal(err) => self.degrade_error(entry, ctx, err).await,
        }
    }

    /// Terminal `error` state: nearest error boundary wrapped in the same
    /// layout chain, tagged with a correlation id for log lookup. Raw
    /// error detail goes to the log and the boundary component, never to
    /// the generic fallback.
    async fn degrade_error(
        &self,
        entry: &RouteEntry,
        ctx: &RequestContext,
        err: anyhow::Error,
    ) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        error!(
            correlation_id = %correlation_id,
            path = %ctx.path,
            pattern = %entry.url_pattern,
            error = %format!("{err:#}"),
            "request handler failed"
        );

        if let Some(boundary_path) = &entry.error_boundary {
            let boundary_ctx = BoundaryContext {
                path: ctx.path.clone(),
                status: 500,
                correlation_id: Some(correlation_id.clone()),
                detail: format!("{err:#}"),
            };
            match self.render_boundary(boundary_path, boundary_ctx).await {
                Ok(body) => {
                    let composed = self
                        .compose_layouts(&entry.layouts, ctx, body.clone())
                        .await
                        .unwrap_or_else(|layout_err| {
                            warn!(error = %layout_err, "layout failed while degrading; serving bare boundary");
                            body
                        });
                    return (StatusCode::INTERNAL_SERVER_ERROR, Html(composed)).into_response();
                }
                Err(boundary_err) => {
                    warn!(error = %boundary_err, "error boundary failed; using generic fallback");
                }
            }
        }

        generic_error_page(&correlation_id)
    }

    /// Terminal `not-found` state.
    async fn degrade_not_found(
        &self,
        boundary: Option<&PathBuf>,
        layouts: &[PathBuf],
        ctx: &RequestContext,
    ) -> Response {
        if let Some(boundary_path) = boundary {
            let boundary_ctx = BoundaryContext {
                path: ctx.path.clone(),
                status: 404,
                correlation_id: None,
                detail: "no route matched".to_string(),
            };
            match self.render_boundary(boundary_path, boundary_ctx).await {
                Ok(body) => {
                    let composed = self
                        .compose_layouts(layouts, ctx, body.clone())
                        .await
                        .unwrap_or_else(|layout_err| {
                            warn!(error = %layout_err, "layout failed while degrading; serving bare boundary");
                            body
                        });
                    return (StatusCode::NOT_FOUND, Html(composed)).into_response();
                }
                Err(boundary_err) => {
                    warn!(error = %boundary_err, "not-found boundary failed; using generic fallback");
                }
            }
        }

        generic_not_found_page()
    }

    /// No route matched at all. There is no entry to anchor the boundary
    /// walk, so the manifest picks the deepest boundary along the URL's
    /// static prefix and the root layout (if any) wraps the result.
    async fn unmatched_not_found(
        &self,
        manifest: &RouteManifest,
        ctx: &RequestContext,
    ) -> Response {
        let boundary = manifest.not_found_boundary_for_path(&ctx.path).cloned();
        let layouts: Vec<PathBuf> = manifest.layouts.get("").cloned().into_iter().collect();
        self.degrade_not_found(boundary.as_ref(), &layouts, ctx)
            .await
    }

    async fn render_boundary(
        &self,
        path: &PathBuf,
        boundary_ctx: BoundaryContext,
    ) -> HandlerResult<String> {
        let module = self.module(path)?;
        let Some(boundary) = module.as_boundary() else {
            return Err(HandlerError::Internal(anyhow!(
                "{} did not compile to a boundary module",
                path.display()
            )));
        };
        (boundary.render)(boundary_ctx).await
    }

    fn module(&self, path: &std::path::Path) -> HandlerResult<Arc<CompiledModule>> {
        self.cache
            .get_or_compile(path, self.compiler.as_ref())
            .map_err(HandlerError::Internal)
    }
}

/// Percent-decodes captured parameter values; undecodable values are kept
/// as captured.
fn decode_params(params: PathParams) -> PathParams {
    params
        .into_iter()
        .map(|(name, value)| {
            let decoded = urlencoding::decode(&value)
                .map(|cow| cow.into_owned())
                .unwrap_or(value);
            (name, decoded)
        })
        .collect()
}

fn raw_response(action: ActionResponse) -> Response {
    let status = StatusCode::from_u16(action.status).unwrap_or(StatusCode::OK);
    (
        status,
        [(header::CONTENT_TYPE, action.content_type)],
        action.body,
    )
        .into_response()
}

fn plain_response(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}

fn generic_error_page(correlation_id: &str) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Something went wrong</title></head>
<body>
  <h1>500 Something went wrong</h1>
  <p>The server hit an unexpected error handling this request.</p>
  <p>Reference: <code>{correlation_id}</code></p>
  <a href="/">Go Home</a>
</body>
</html>"#
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
}

fn generic_not_found_page() -> Response {
    let html = r#"<!DOCTYPE html>
<html>
<head><title>Page Not Found</title></head>
<body>
  <h1>404 Page Not Found</h1>
  <p>There is nothing at this address.</p>
  <a href="/">Go Home</a>
</body>
</html>"#
        .to_string();
    (StatusCode::NOT_FOUND, Html(html)).into_response()
}
