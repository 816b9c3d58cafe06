use anyhow::Result;
use colored::Colorize;

/// Build-mode validation: report every problem, exit non-zero on errors.
/// Warnings alone do not fail the check.
pub fn execute(dir: Option<&str>) -> Result<()> {
    let manifest = super::build_manifest(dir)?;

    for warning in &manifest.warnings {
        println!("{} {} {:?}", "⚠".yellow(), warning.message, warning.files);
    }
    for error in &manifest.errors {
        println!("{} {} {:?}", "✗".red(), error.message, error.files);
    }

    if manifest.has_errors() {
        println!(
            "{}",
            format!(
                "route table has {} error(s); {} route(s) servable",
                manifest.errors.len(),
                manifest.routes.len()
            )
            .red()
        );
        std::process::exit(1);
    }

    println!(
        "{}",
        format!("✓ route table OK ({} routes)", manifest.routes.len()).green()
    );

    Ok(())
}
