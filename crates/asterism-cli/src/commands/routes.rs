use anyhow::Result;
use colored::Colorize;

/// Print the compiled route table
pub fn execute(dir: Option<&str>, json: bool) -> Result<()> {
    let manifest = super::build_manifest(dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!();
    println!("{}", "Routes:".cyan().bold());
    for route in &manifest.routes {
        let wraps = if route.layouts.is_empty() {
            String::new()
        } else {
            format!("  ({} layouts)", route.layouts.len())
        };
        println!(
            "  {} {} -> {}{}",
            "→".green(),
            route.url_pattern.bold(),
            route.file_path,
            wraps.dimmed()
        );
    }
    if manifest.routes.is_empty() {
        println!("  {}", "(no servable routes)".dimmed());
    }

    for warning in &manifest.warnings {
        println!("  {} {}", "⚠".yellow(), warning.message);
    }
    for error in &manifest.errors {
        println!("  {} {}", "✗".red(), error.message);
    }
    println!();

    Ok(())
}
