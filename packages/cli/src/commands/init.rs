use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::PathBuf;

const EXAMPLE_DOCUMENT: &str = "document.html";
const EXAMPLE_SCRIPT: &str = "edit.script";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// History server to replicate through
    #[arg(long)]
    pub history_endpoint: Option<String>,

    /// Non-breaking spaces inserted by tab outside lists
    #[arg(long, default_value_t = 4)]
    pub tab_width: usize,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Scribe project...".bright_blue().bold());

    let config = EditorConfig {
        history_endpoint: args.history_endpoint,
        tab_width: args.tab_width,
        ..EditorConfig::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let document = PathBuf::from(cwd).join(EXAMPLE_DOCUMENT);
    if !document.exists() {
        fs::write(&document, "<p>[]<br></p>\n")?;
        println!("  {} Created {}", "✓".green(), EXAMPLE_DOCUMENT);
    }

    let script = PathBuf::from(cwd).join(EXAMPLE_SCRIPT);
    if !script.exists() {
        fs::write(&script, "type Hello\nenter\ntype world\ncommit\n")?;
        println!("  {} Created {}", "✓".green(), EXAMPLE_SCRIPT);
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  Run: scribe apply {} --script {}", EXAMPLE_DOCUMENT, EXAMPLE_SCRIPT);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        init(
            InitArgs {
                history_endpoint: Some("http://localhost:8069".to_string()),
                tab_width: 2,
                force: false,
            },
            cwd,
        )
        .unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.history_endpoint.as_deref(), Some("http://localhost:8069"));
        assert_eq!(config.tab_width, 2);
        assert!(dir.path().join(EXAMPLE_DOCUMENT).exists());
        assert!(dir.path().join(EXAMPLE_SCRIPT).exists());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{\"tabWidth\": 8}").unwrap();
        let args = InitArgs {
            history_endpoint: None,
            tab_width: 4,
            force: false,
        };
        init(args, dir.path().to_str().unwrap()).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap().tab_width, 8);
    }
}
