use anyhow::{Context, Result};
use markdown_autoformat_config::AutoformatConfig;
use markdown_autoformat_engine::{ModelEditor, RenameBlockCommand};
use std::io::{self, BufRead, Write};
use std::{env, path::PathBuf, process};

/// Type `line` into an empty paragraph, one keystroke at a time, and return
/// the resulting document as markup.
fn format_line(config: &AutoformatConfig, line: &str) -> Result<String> {
    let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>")?;
    for name in config.command_names() {
        editor.register_command(name, RenameBlockCommand::new(name));
    }
    config.install(&mut editor)?;
    editor.type_text(line)?;
    Ok(editor.data())
}

fn load_config(args: &[String]) -> Result<AutoformatConfig> {
    if let Some(path) = args.get(1) {
        let config_path = PathBuf::from(path);
        log::info!("Using config from CLI argument: {}", config_path.display());
        return AutoformatConfig::load_from_path(&config_path)?
            .with_context(|| format!("No config file at {}", config_path.display()));
    }

    log::info!("Config path: {}", AutoformatConfig::config_path().display());
    match AutoformatConfig::load()? {
        Some(config) => Ok(config),
        None => {
            log::info!("No config file found, using the markdown preset");
            Ok(AutoformatConfig::markdown())
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [config.toml | --init]", args[0]);
        process::exit(1);
    }

    if args.get(1).map(String::as_str) == Some("--init") {
        let config_path = AutoformatConfig::config_path();
        AutoformatConfig::markdown().save()?;
        println!("Wrote markdown preset to {}", config_path.display());
        return Ok(());
    }

    let config = load_config(&args)?;
    log::info!(
        "{} block and {} inline rule(s) loaded",
        config.block.len(),
        config.inline.len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        writeln!(stdout, "{}", format_line(&config, &line)?)?;
    }
    Ok(())
}
