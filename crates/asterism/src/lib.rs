// Asterism - file-based routing and request composition
// Compiles a routes directory into an immutable manifest and serves it
// through a match → middleware → handle → compose → degrade pipeline

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod module;
pub mod request;

// Re-export the route table compiler
pub use asterism_router as router;
pub use asterism_router::{ManifestBuilder, RouteEntry, RouteKind, RouteManifest};

// Re-export framework types
pub use cache::ModuleCache;
pub use config::Config;
pub use dispatch::Dispatcher;
pub use module::{
    ActionFn, ActionResponse, BoundaryContext, BoundaryModule, BoxFuture, CachePolicy,
    CompiledModule, HandlerError, HandlerModule, HandlerResult, LayoutModule, LoaderFn,
    MiddlewareModule, MiddlewareOutcome, ModuleCompiler, PageContext, PageModule,
    RateLimitPolicy, RenderFn, RouteConfig,
};
pub use request::{QueryParams, RequestContext};

// Re-export commonly used types from dependencies
pub use axum;
pub use axum::http::StatusCode;
