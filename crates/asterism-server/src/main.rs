mod compile;
mod hot_reload;

use axum::{
    body::Bytes,
    extract::{Query as AxumQuery, State},
    http::{HeaderMap, Method},
    response::{Html, IntoResponse, Response},
    routing::any,
    Router,
};

use asterism::{
    Config, Dispatcher, ManifestBuilder, ModuleCache, QueryParams, RequestContext, RouteManifest,
};

use crate::compile::FileContentCompiler;
use crate::hot_reload::RouteWatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_livereload::LiveReloadLayer;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    println!("asterism starting...");

    let config = Config::load_default().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    println!(
        "Port: {}, Routes dir: {}",
        config.server.port, config.routing.routes_dir
    );

    let hot_reload_enabled = std::env::var("HOT_RELOAD")
        .map(|v| v.parse::<bool>().unwrap_or(config.dev.hot_reload))
        .unwrap_or(config.dev.hot_reload);

    // Compile the route table from the routes directory
    let manifest = ManifestBuilder::new(&config.routing.routes_dir).build();
    report_manifest(&manifest);

    let cache = Arc::new(ModuleCache::new());
    let dispatcher = Arc::new(Dispatcher::new(
        manifest,
        Arc::new(FileContentCompiler::new()),
        cache.clone(),
    ));

    // Hot reload: rebuild the manifest and swap it in whole on changes
    if hot_reload_enabled {
        println!("Hot reload: enabled");
        let mut watch_paths: Vec<PathBuf> =
            config.dev.watch_paths.iter().map(PathBuf::from).collect();
        if watch_paths.is_empty() {
            watch_paths.push(PathBuf::from(&config.routing.routes_dir));
        }

        match RouteWatcher::new(watch_paths) {
            Ok(watcher) => {
                let mut reload_rx = watcher.subscribe();
                let dispatcher = dispatcher.clone();
                let cache = cache.clone();
                let routes_dir = config.routing.routes_dir.clone();

                tokio::spawn(async move {
                    let _watcher = watcher;
                    while let Ok(change) = reload_rx.recv().await {
                        cache.invalidate(&change.path);

                        // Build completely before publishing; in-flight
                        // requests keep the snapshot they started with.
                        let manifest = ManifestBuilder::new(&routes_dir).build();
                        for error in &manifest.errors {
                            warn!(files = ?error.files, "{}", error.message);
                        }
                        let count = manifest.routes.len();
                        dispatcher.install_manifest(manifest);
                        info!(routes = count, "manifest rebuilt");
                    }
                });
            }
            Err(e) => eprintln!("Failed to create file watcher: {}", e),
        }
    }

    let state = AppState { dispatcher };

    let app = Router::new()
        .route("/", any(root_handler))
        .route("/*path", any(path_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let app = if hot_reload_enabled {
        app.layer(LiveReloadLayer::new())
    } else {
        app
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    println!("Server running at http://{}", addr);
    axum::serve(listener, app).await.unwrap();
}

fn report_manifest(manifest: &RouteManifest) {
    println!("Discovered {} routes", manifest.routes.len());
    for route in &manifest.routes {
        println!("  {} -> {}", route.url_pattern, route.file_path);
    }
    for error in &manifest.errors {
        eprintln!("route error: {} ({:?})", error.message, error.files);
    }
    for warning in &manifest.warnings {
        eprintln!("route warning: {}", warning.message);
    }
    if manifest.routes.is_empty() {
        println!("No routes found — serving the welcome page at /");
    }
}

async fn root_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    query: AxumQuery<std::collections::HashMap<String, String>>,
    body: Bytes,
) -> Response {
    serve(state, "/".to_string(), method, headers, query.0, body).await
}

async fn path_handler(
    State(state): State<AppState>,
    axum::extract::Path(path): axum::extract::Path<String>,
    method: Method,
    headers: HeaderMap,
    query: AxumQuery<std::collections::HashMap<String, String>>,
    body: Bytes,
) -> Response {
    serve(state, format!("/{}", path), method, headers, query.0, body).await
}

async fn serve(
    state: AppState,
    path: String,
    method: Method,
    headers: HeaderMap,
    query: std::collections::HashMap<String, String>,
    body: Bytes,
) -> Response {
    if path == "/" && state.dispatcher.manifest().routes.is_empty() {
        return welcome_page();
    }

    let ctx = RequestContext::new(method, path, QueryParams::new(query), headers, body);
    state.dispatcher.dispatch(ctx).await
}

/// Served when the routes directory produced no servable routes
fn welcome_page() -> Response {
    let markup = maud::html! {
        (maud::DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Asterism" }
            }
            body {
                h1 { "Welcome to Asterism" }
                p { "File-based routing for Rust. Add a " code { "page.rsx" }
                    " to your routes directory to get started." }
            }
        }
    };
    Html(markup.into_string()).into_response()
}
