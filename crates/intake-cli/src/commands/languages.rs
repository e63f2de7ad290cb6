//! Languages command - verify the recognition backend.

use console::style;

use super::{build_engine, load_config};

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;

    match engine.verify() {
        Ok(info) => {
            println!("Backend: {}", style(info.backend).cyan());
            println!("Active languages: {}", info.active_languages.join("+"));
            println!();
            println!("Installed languages:");
            for lang in &info.available_languages {
                let marker = if info.active_languages.contains(lang) {
                    style("✓").green()
                } else {
                    style(" ").dim()
                };
                println!("  {} {}", marker, lang);
            }
            Ok(())
        }
        Err(e) => {
            println!("Backend: {}", style(engine.name()).cyan());
            println!("{} {}", style("✗").red(), e);
            anyhow::bail!("recognition backend '{}' is not usable", engine.name())
        }
    }
}
