//! Integration tests for the dispatch pipeline.
//!
//! A small test compiler turns route files into modules driven by the
//! file's contents: pages echo their content plus captured parameters,
//! layouts bracket their children, middleware blocks when told to, and
//! the magic words FAIL/ABSENT make a page fail or signal absence. That
//! is enough to exercise matching, composition, short-circuiting, and
//! both degradation paths end to end.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use asterism::axum::body::{to_bytes, Bytes};
use asterism::axum::http::{HeaderMap, Method};
use asterism::axum::response::Response;
use asterism::{
    ActionResponse, BoundaryModule, CompiledModule, Dispatcher, HandlerError, HandlerModule,
    LayoutModule, ManifestBuilder, MiddlewareModule, MiddlewareOutcome, ModuleCache,
    ModuleCompiler, PageModule, QueryParams, RequestContext, RouteConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

struct TestCompiler;

impl ModuleCompiler for TestCompiler {
    fn compile(&self, path: &Path) -> Result<CompiledModule> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?
            .trim()
            .to_string();
        let base = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("bad file name"))?
            .to_string();

        let module = match base.as_str() {
            "page" | "index" => CompiledModule::Page(PageModule {
                render: Arc::new(move |page_ctx| {
                    let content = content.clone();
                    Box::pin(async move {
                        if content.contains("FAIL") {
                            return Err(HandlerError::Internal(anyhow!("render exploded")));
                        }
                        if content.contains("ABSENT") {
                            return Err(HandlerError::NotFound);
                        }
                        let mut params: Vec<_> = page_ctx.request.params.iter().collect();
                        params.sort();
                        let suffix: String = params
                            .iter()
                            .map(|(k, v)| format!(" {k}={v}"))
                            .collect();
                        Ok(format!("{content}{suffix}"))
                    })
                }),
                loader: None,
                actions: HashMap::new(),
                config: RouteConfig::default(),
            }),
            "layout" => CompiledModule::Layout(LayoutModule {
                render: Arc::new(move |_ctx, children| {
                    let content = content.clone();
                    Box::pin(async move { Ok(format!("{content}[{children}]")) })
                }),
            }),
            "middleware" => CompiledModule::Middleware(MiddlewareModule {
                handle: Arc::new(move |ctx| {
                    let content = content.clone();
                    Box::pin(async move {
                        if content.contains("BLOCK") {
                            return Ok(MiddlewareOutcome::Respond(
                                ActionResponse::text("blocked").with_status(403),
                            ));
                        }
                        Ok(MiddlewareOutcome::Continue(ctx))
                    })
                }),
            }),
            "error" | "not-found" | "loading" => CompiledModule::Boundary(BoundaryModule {
                render: Arc::new(move |boundary_ctx| {
                    let content = content.clone();
                    Box::pin(async move {
                        let reference = boundary_ctx
                            .correlation_id
                            .map(|id| format!(" ref={id}"))
                            .unwrap_or_default();
                        Ok(format!("{content}!{}{reference}", boundary_ctx.status))
                    })
                }),
            }),
            "route" => {
                let mut actions: HashMap<String, asterism::ActionFn> = HashMap::new();
                let get_content = content.clone();
                actions.insert(
                    "GET".to_string(),
                    Arc::new(move |_ctx| {
                        let content = get_content.clone();
                        Box::pin(async move {
                            Ok(ActionResponse::json(&json!({ "ok": content })))
                        })
                    }),
                );
                actions.insert(
                    "POST".to_string(),
                    Arc::new(|_ctx| {
                        Box::pin(async { Ok(ActionResponse::text("posted").with_status(201)) })
                    }),
                );
                CompiledModule::Handler(HandlerModule {
                    actions,
                    config: RouteConfig::default(),
                })
            }
            other => return Err(anyhow!("unexpected route file `{other}`")),
        };

        Ok(module)
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn dispatcher(root: &Path) -> Dispatcher {
    let manifest = ManifestBuilder::new(root).build();
    assert!(
        manifest.errors.is_empty(),
        "unexpected build errors: {:?}",
        manifest.errors
    );
    Dispatcher::new(
        manifest,
        Arc::new(TestCompiler),
        Arc::new(ModuleCache::new()),
    )
}

fn request(method: Method, path: &str) -> RequestContext {
    RequestContext::new(
        method,
        path.to_string(),
        QueryParams::default(),
        HeaderMap::new(),
        Bytes::new(),
    )
}

async fn body_of(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn renders_a_page_inside_its_layout_chain() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "layout.rsx", "ROOT");
    write(root, "users/[id]/layout.rsx", "USERS");
    write(root, "users/[id]/profile/page.rsx", "PROFILE");

    let dispatcher = dispatcher(root);
    let response = dispatcher
        .dispatch(request(Method::GET, "/users/42/profile"))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(body_of(response).await, "ROOT[USERS[PROFILE id=42]]");
}

#[tokio::test]
async fn captured_parameters_are_percent_decoded() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "tags/[name]/page.rsx", "TAG");

    let dispatcher = dispatcher(root);
    let response = dispatcher
        .dispatch(request(Method::GET, "/tags/caf%C3%A9"))
        .await;

    assert_eq!(body_of(response).await, "TAG name=café");
}

#[tokio::test]
async fn handler_routes_answer_per_verb_and_skip_layouts() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "layout.rsx", "ROOT");
    write(root, "api/items/route.rs", "ITEMS");

    let dispatcher = dispatcher(root);

    let get = dispatcher.dispatch(request(Method::GET, "/api/items")).await;
    assert_eq!(get.status(), 200);
    // Raw handler output, not wrapped in ROOT[...]
    assert_eq!(body_of(get).await, r#"{"ok":"ITEMS"}"#);

    let post = dispatcher
        .dispatch(request(Method::POST, "/api/items"))
        .await;
    assert_eq!(post.status(), 201);

    let delete = dispatcher
        .dispatch(request(Method::DELETE, "/api/items"))
        .await;
    assert_eq!(delete.status(), 405);
}

#[tokio::test]
async fn middleware_can_short_circuit_the_handler() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "admin/middleware.rsx", "BLOCK");
    write(root, "admin/page.rsx", "ADMIN");

    let dispatcher = dispatcher(root);
    let response = dispatcher.dispatch(request(Method::GET, "/admin")).await;

    assert_eq!(response.status(), 403);
    assert_eq!(body_of(response).await, "blocked");
}

#[tokio::test]
async fn crash_degrades_to_the_nearest_error_boundary() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "error.rsx", "ROOTERR");
    write(root, "dashboard/error.rsx", "DASHERR");
    write(root, "dashboard/crash/page.rsx", "FAIL");
    write(root, "other/crash/page.rsx", "FAIL");

    let dispatcher = dispatcher(root);

    let response = dispatcher
        .dispatch(request(Method::GET, "/dashboard/crash"))
        .await;
    assert_eq!(response.status(), 500);
    let body = body_of(response).await;
    assert!(body.starts_with("DASHERR!500"), "body: {body}");
    assert!(body.contains("ref="), "correlation id missing: {body}");

    let response = dispatcher
        .dispatch(request(Method::GET, "/other/crash"))
        .await;
    assert_eq!(response.status(), 500);
    assert!(body_of(response).await.starts_with("ROOTERR!500"));
}

#[tokio::test]
async fn crash_without_any_boundary_gets_the_generic_fallback() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "crash/page.rsx", "FAIL");

    let dispatcher = dispatcher(root);
    let response = dispatcher.dispatch(request(Method::GET, "/crash")).await;

    assert_eq!(response.status(), 500);
    let body = body_of(response).await;
    assert!(body.contains("Reference:"), "body: {body}");
    // Raw error detail never reaches the generic fallback.
    assert!(!body.contains("render exploded"));
}

#[tokio::test]
async fn explicit_absence_uses_the_not_found_boundary() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "not-found.rsx", "NF");
    write(root, "ghost/page.rsx", "ABSENT");

    let dispatcher = dispatcher(root);
    let response = dispatcher.dispatch(request(Method::GET, "/ghost")).await;

    assert_eq!(response.status(), 404);
    assert!(body_of(response).await.starts_with("NF!404"));
}

#[tokio::test]
async fn unmatched_path_degrades_through_not_found() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "not-found.rsx", "NF");
    write(root, "page.rsx", "HOME");

    let dispatcher = dispatcher(root);
    let response = dispatcher.dispatch(request(Method::GET, "/nowhere")).await;

    assert_eq!(response.status(), 404);
    assert!(body_of(response).await.starts_with("NF!404"));
}

#[tokio::test]
async fn unmatched_path_without_boundary_gets_the_generic_fallback() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "page.rsx", "HOME");

    let dispatcher = dispatcher(root);
    let response = dispatcher.dispatch(request(Method::GET, "/nowhere")).await;

    assert_eq!(response.status(), 404);
    assert!(body_of(response).await.contains("404"));
}

#[tokio::test]
async fn installing_a_new_manifest_serves_new_routes() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "page.rsx", "HOME");

    let dispatcher = dispatcher(root);
    assert_eq!(
        dispatcher
            .dispatch(request(Method::GET, "/late"))
            .await
            .status(),
        404
    );

    write(root, "late/page.rsx", "LATE");
    dispatcher.install_manifest(ManifestBuilder::new(root).build());

    let response = dispatcher.dispatch(request(Method::GET, "/late")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_of(response).await, "LATE");
}
