// File: src/compile.rs
// Purpose: Default file-content module compiler for the reference server
//
// The real component compiler lives outside this system; the server only
// needs *a* ModuleCompiler to be useful out of the box. This one serves a
// route file's contents as its rendered output: pages return their body
// as HTML, layouts substitute `{slots.content}` with their children, and
// boundaries append a reference comment. Deployments with a real compiler
// inject it in place of this one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use asterism::{
    ActionResponse, BoundaryModule, CompiledModule, HandlerModule, LayoutModule,
    MiddlewareModule, MiddlewareOutcome, PageModule, RouteConfig,
};

/// Marker a layout file uses to place its children.
const CONTENT_SLOT: &str = "{slots.content}";

/// Leading comment that carries a route's raw config object:
/// `<!-- config: {"require_auth": true} -->`
const CONFIG_PREFIX: &str = "<!-- config:";

pub struct FileContentCompiler;

impl FileContentCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileContentCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits an optional config comment off the top of a file and validates
/// it eagerly, so a bad config fails at compile time with the file named.
fn parse_config(content: &str, path: &Path) -> Result<(RouteConfig, String)> {
    let trimmed = content.trim_start();
    if let Some(rest) = trimmed.strip_prefix(CONFIG_PREFIX) {
        if let Some((raw, body)) = rest.split_once("-->") {
            let value: serde_json::Value = serde_json::from_str(raw.trim())
                .with_context(|| format!("{}: invalid config comment", path.display()))?;
            let config = RouteConfig::from_raw(&value, path)?;
            return Ok((config, body.trim_start().to_string()));
        }
    }
    Ok((RouteConfig::default(), content.to_string()))
}

impl asterism::ModuleCompiler for FileContentCompiler {
    fn compile(&self, path: &Path) -> Result<CompiledModule> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read route file: {}", path.display()))?;
        let base = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("route file has no usable name: {}", path.display()))?;

        let (config, body) = parse_config(&content, path)?;

        let module = match base {
            "page" | "index" => CompiledModule::Page(PageModule {
                render: Arc::new(move |_ctx| {
                    let body = body.clone();
                    Box::pin(async move { Ok(body) })
                }),
                loader: None,
                actions: HashMap::new(),
                config,
            }),
            "route" => {
                let mut actions: HashMap<String, asterism::ActionFn> = HashMap::new();
                actions.insert(
                    "GET".to_string(),
                    Arc::new(move |_ctx| {
                        let body = body.clone();
                        Box::pin(async move { Ok(ActionResponse::text(body)) })
                    }),
                );
                CompiledModule::Handler(HandlerModule { actions, config })
            }
            "layout" => CompiledModule::Layout(LayoutModule {
                render: Arc::new(move |_ctx, children| {
                    let body = body.clone();
                    Box::pin(async move {
                        if body.contains(CONTENT_SLOT) {
                            Ok(body.replace(CONTENT_SLOT, &children))
                        } else {
                            // No slot declared: children follow the shell.
                            Ok(format!("{body}\n{children}"))
                        }
                    })
                }),
            }),
            "middleware" => CompiledModule::Middleware(MiddlewareModule {
                handle: Arc::new(|ctx| Box::pin(async move { Ok(MiddlewareOutcome::Continue(ctx)) })),
            }),
            "error" | "not-found" | "loading" => CompiledModule::Boundary(BoundaryModule {
                render: Arc::new(move |boundary_ctx| {
                    let body = body.clone();
                    Box::pin(async move {
                        match boundary_ctx.correlation_id {
                            Some(id) => Ok(format!("{body}\n<!-- ref: {id} -->")),
                            None => Ok(body),
                        }
                    })
                }),
            }),
            other => {
                return Err(anyhow!(
                    "{}: `{other}` is not a recognized route file",
                    path.display()
                ))
            }
        };

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asterism::ModuleCompiler;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn page_compiles_with_config_comment_stripped() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(
            &tmp,
            "page.rsx",
            "<!-- config: {\"require_auth\": true} -->\n<h1>Hi</h1>",
        );

        let module = FileContentCompiler::new().compile(&path).unwrap();
        let page = module.as_page().unwrap();
        assert_eq!(page.config.require_auth, Some(true));
    }

    #[test]
    fn invalid_config_comment_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(
            &tmp,
            "page.rsx",
            "<!-- config: {\"require_auth\": \"yes\"} -->\nbody",
        );

        let err = FileContentCompiler::new().compile(&path).unwrap_err();
        assert!(err.to_string().contains("page.rsx"));
    }

    #[test]
    fn unrecognized_base_name_is_a_compile_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(&tmp, "helpers.rsx", "x");
        assert!(FileContentCompiler::new().compile(&path).is_err());
    }
}
