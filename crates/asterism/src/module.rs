// File: src/module.rs
// Purpose: Compiled-module contract between the component compiler and the
// dispatcher, plus typed per-route configuration

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::request::RequestContext;

/// Boxed future returned by all module callbacks.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Failure surfaced by a loader, render, or action during a live request.
///
/// These are values, not panics: the dispatcher converts them into the
/// nearest boundary render and the process keeps serving.
#[derive(Debug)]
pub enum HandlerError {
    /// The handler explicitly signalled that the resource does not exist.
    NotFound,
    /// Anything else. Degrades to the nearest error boundary.
    Internal(anyhow::Error),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::NotFound => write!(f, "not found"),
            HandlerError::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Internal(err)
    }
}

pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Context handed to a page render function.
pub struct PageContext {
    pub request: RequestContext,
    /// Output of the route's data loader, when one exists.
    pub data: Option<JsonValue>,
}

/// Context handed to a boundary render function.
///
/// `correlation_id` is set for error boundaries so a degraded page can be
/// matched to server logs; `detail` carries the handler failure text for
/// the boundary to use or ignore. Neither reaches the wire unless the
/// boundary component puts it there.
pub struct BoundaryContext {
    pub path: String,
    pub status: u16,
    pub correlation_id: Option<String>,
    pub detail: String,
}

/// Default render function of a page module.
pub type RenderFn = Arc<dyn Fn(PageContext) -> BoxFuture<HandlerResult<String>> + Send + Sync>;

/// Optional data loader, run before the render.
pub type LoaderFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<HandlerResult<JsonValue>> + Send + Sync>;

/// Mutation/action handler, keyed by HTTP verb.
pub type ActionFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<HandlerResult<ActionResponse>> + Send + Sync>;

/// Layout render function: wraps already-rendered child output.
pub type LayoutRenderFn =
    Arc<dyn Fn(RequestContext, String) -> BoxFuture<HandlerResult<String>> + Send + Sync>;

/// Boundary render function.
pub type BoundaryRenderFn =
    Arc<dyn Fn(BoundaryContext) -> BoxFuture<HandlerResult<String>> + Send + Sync>;

/// What one middleware link decided.
pub enum MiddlewareOutcome {
    /// Pass control to the next link (or the handler), possibly with an
    /// amended request context.
    Continue(RequestContext),
    /// Short-circuit with a response; the handler never runs.
    Respond(ActionResponse),
}

/// Middleware entry point.
pub type MiddlewareFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<HandlerResult<MiddlewareOutcome>> + Send + Sync>;

/// Raw response produced by actions, `route` handlers, and short-circuiting
/// middleware. Not composed into layouts.
#[derive(Debug, Clone)]
pub struct ActionResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl ActionResponse {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.into(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.into(),
        }
    }

    pub fn json(value: &JsonValue) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: value.to_string(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// A compiled page component: default render, optional loader, optional
/// per-verb actions, and its validated route configuration.
pub struct PageModule {
    pub render: RenderFn,
    pub loader: Option<LoaderFn>,
    pub actions: HashMap<String, ActionFn>,
    pub config: RouteConfig,
}

/// A compiled `route` handler: per-verb actions only, never composed into
/// layouts.
pub struct HandlerModule {
    pub actions: HashMap<String, ActionFn>,
    pub config: RouteConfig,
}

/// A compiled layout component.
pub struct LayoutModule {
    pub render: LayoutRenderFn,
}

/// A compiled middleware component.
pub struct MiddlewareModule {
    pub handle: MiddlewareFn,
}

/// A compiled boundary component (error, not-found, or loading).
pub struct BoundaryModule {
    pub render: BoundaryRenderFn,
}

/// Everything the out-of-scope component compiler can hand back.
pub enum CompiledModule {
    Page(PageModule),
    Handler(HandlerModule),
    Layout(LayoutModule),
    Middleware(MiddlewareModule),
    Boundary(BoundaryModule),
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            CompiledModule::Page(_) => "Page",
            CompiledModule::Handler(_) => "Handler",
            CompiledModule::Layout(_) => "Layout",
            CompiledModule::Middleware(_) => "Middleware",
            CompiledModule::Boundary(_) => "Boundary",
        };
        write!(f, "CompiledModule::{variant}")
    }
}

impl CompiledModule {
    pub fn as_page(&self) -> Option<&PageModule> {
        match self {
            CompiledModule::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&HandlerModule> {
        match self {
            CompiledModule::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_layout(&self) -> Option<&LayoutModule> {
        match self {
            CompiledModule::Layout(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_middleware(&self) -> Option<&MiddlewareModule> {
        match self {
            CompiledModule::Middleware(mw) => Some(mw),
            _ => None,
        }
    }

    pub fn as_boundary(&self) -> Option<&BoundaryModule> {
        match self {
            CompiledModule::Boundary(boundary) => Some(boundary),
            _ => None,
        }
    }
}

/// The component compiler, seen only through this seam. Implementations
/// turn a source file into an executable module; the reference server
/// ships a file-content implementation and real deployments inject their
/// own.
pub trait ModuleCompiler: Send + Sync {
    fn compile(&self, path: &Path) -> Result<CompiledModule>;
}

/// Cache policy for a route's rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CachePolicy {
    pub max_age_secs: u64,
    #[serde(default)]
    pub revalidate: bool,
}

/// Rate-limit policy attached to a route for enforcement middleware.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitPolicy {
    pub burst: u32,
    pub per_secs: u64,
}

/// Typed per-route configuration.
///
/// The compiler's raw config object is validated eagerly at compile time:
/// recognized keys must have the right shape, and everything else passes
/// through untouched in `extensions` for downstream middleware to
/// interpret.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteConfig {
    pub require_auth: Option<bool>,
    pub cache: Option<CachePolicy>,
    pub rate_limit: Option<RateLimitPolicy>,
    /// Unrecognized keys, preserved verbatim.
    pub extensions: Map<String, JsonValue>,
}

impl RouteConfig {
    /// Validates a raw config object. Errors carry the file path so a bad
    /// key is reported against the component that declared it.
    pub fn from_raw(raw: &JsonValue, file: &Path) -> Result<Self> {
        let object = match raw {
            JsonValue::Null => return Ok(Self::default()),
            JsonValue::Object(object) => object,
            other => bail!(
                "{}: route config must be an object, got {other}",
                file.display()
            ),
        };

        let mut config = Self::default();
        for (key, value) in object {
            match key.as_str() {
                "require_auth" => {
                    let Some(flag) = value.as_bool() else {
                        bail!(
                            "{}: route config key `require_auth` must be a boolean",
                            file.display()
                        );
                    };
                    config.require_auth = Some(flag);
                }
                "cache" => {
                    config.cache = Some(
                        serde_json::from_value(value.clone()).with_context(|| {
                            format!("{}: invalid `cache` route config", file.display())
                        })?,
                    );
                }
                "rate_limit" => {
                    config.rate_limit = Some(
                        serde_json::from_value(value.clone()).with_context(|| {
                            format!("{}: invalid `rate_limit` route config", file.display())
                        })?,
                    );
                }
                _ => {
                    config.extensions.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file() -> &'static Path {
        Path::new("app/admin/page.rsx")
    }

    #[test]
    fn null_config_is_default() {
        let config = RouteConfig::from_raw(&JsonValue::Null, file()).unwrap();
        assert_eq!(config, RouteConfig::default());
    }

    #[test]
    fn recognized_keys_are_typed() {
        let raw = json!({
            "require_auth": true,
            "cache": { "max_age_secs": 60, "revalidate": true },
            "rate_limit": { "burst": 10, "per_secs": 1 },
        });
        let config = RouteConfig::from_raw(&raw, file()).unwrap();
        assert_eq!(config.require_auth, Some(true));
        assert_eq!(
            config.cache,
            Some(CachePolicy {
                max_age_secs: 60,
                revalidate: true
            })
        );
        assert_eq!(
            config.rate_limit,
            Some(RateLimitPolicy {
                burst: 10,
                per_secs: 1
            })
        );
    }

    #[test]
    fn unrecognized_keys_pass_through() {
        let raw = json!({ "edge_region": "fra1", "require_auth": false });
        let config = RouteConfig::from_raw(&raw, file()).unwrap();
        assert_eq!(config.require_auth, Some(false));
        assert_eq!(config.extensions.get("edge_region"), Some(&json!("fra1")));
    }

    #[test]
    fn bad_shapes_fail_with_the_file_in_the_message() {
        let raw = json!({ "require_auth": "yes" });
        let err = RouteConfig::from_raw(&raw, file()).unwrap_err();
        assert!(err.to_string().contains("app/admin/page.rsx"));

        let raw = json!({ "cache": { "max_age_secs": "soon" } });
        let err = RouteConfig::from_raw(&raw, file()).unwrap_err();
        assert!(format!("{err:#}").contains("cache"));
    }
}
