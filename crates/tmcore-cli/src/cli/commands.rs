use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tmcore::config::CoreConfig;
use tmcore::dirty::DirtyFlag;
use tmcore::generation::Generator;
use tmcore::logging::init_logging;
use tmcore::store::ModelDocument;

use super::render;
use super::setup::{Cli, Commands};

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = CoreConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    match &cli.command {
        Commands::Rules { model } => handle_rules(model, cli.json),
        Commands::Search { model, filter } => handle_search(model, filter, cli.json),
        Commands::Generate { model, write } => handle_generate(model, *write, cli.json, &config),
    }
}

fn open(path: &Path) -> Result<ModelDocument> {
    ModelDocument::read(path, DirtyFlag::global())
        .with_context(|| format!("cannot open model {}", path.display()))
}

fn handle_rules(path: &Path, json: bool) -> Result<()> {
    let doc = open(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&render::rules_json(&doc.model))?);
    } else {
        print!("{}", render::rules_text(&doc.model));
    }
    Ok(())
}

fn handle_search(path: &Path, filter: &str, json: bool) -> Result<()> {
    let doc = open(path)?;
    let hits = doc.model.search(filter);
    if json {
        println!("{}", serde_json::to_string_pretty(&render::search_json(&hits))?);
    } else {
        print!("{}", render::search_text(&hits));
    }
    Ok(())
}

fn handle_generate(path: &Path, write: bool, json: bool, config: &CoreConfig) -> Result<()> {
    let mut doc = open(path)?;
    let report = Generator::new(&config.generation).run(&mut doc.model)?;

    if write && !report.created.is_empty() {
        doc.write(path, config.lists.cache_snapshots)
            .with_context(|| format!("cannot save model {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::report_text(&report, write));
    }
    for failure in &report.failures {
        eprintln!("warning: {}", failure.message);
    }
    Ok(())
}
