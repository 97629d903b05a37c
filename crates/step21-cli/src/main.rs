//! step21 CLI - inspect and normalize STEP files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use step21::{read_step, write_step, StepDocument};

#[derive(Parser)]
#[command(name = "step21")]
#[command(about = "Inspect and normalize ISO 10303-21 (STEP) files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display summary information about a STEP file
    Info {
        /// Path to the STEP file (.step or .stp)
        file: PathBuf,
        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rewrite a STEP file in canonical form (deduplicated, renumbered)
    Normalize {
        /// Input STEP file
        input: PathBuf,
        /// Output STEP file
        output: PathBuf,
    },
    /// Print the HEADER section fields of a STEP file
    Header {
        /// Path to the STEP file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file, json } => info(&file, json),
        Commands::Normalize { input, output } => normalize(&input, &output),
        Commands::Header { file } => header(&file),
    }
}

#[derive(Serialize)]
struct Summary {
    file: String,
    schemas: Vec<String>,
    entities: usize,
    roots: usize,
    types: BTreeMap<String, usize>,
}

fn summarize(path: &Path, doc: &StepDocument) -> Summary {
    let mut types = BTreeMap::new();
    for (_, entity) in doc.store.iter() {
        *types.entry(entity.type_name.clone()).or_insert(0) += 1;
    }
    Summary {
        file: path.display().to_string(),
        schemas: doc.header.schemas.clone(),
        entities: doc.store.len(),
        roots: doc.roots.len(),
        types,
    }
}

fn info(file: &Path, json: bool) -> Result<()> {
    let doc = read_step(file).with_context(|| format!("reading {}", file.display()))?;
    let summary = summarize(file, &doc);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("File:     {}", summary.file);
    println!("Schemas:  {}", summary.schemas.join(", "));
    println!("Entities: {} ({} roots)", summary.entities, summary.roots);
    for (type_name, count) in &summary.types {
        println!("  {count:>6}  {type_name}");
    }
    Ok(())
}

fn normalize(input: &Path, output: &Path) -> Result<()> {
    let doc = read_step(input).with_context(|| format!("reading {}", input.display()))?;
    write_step(&doc, output).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn header(file: &Path) -> Result<()> {
    let doc = read_step(file).with_context(|| format!("reading {}", file.display()))?;
    let h = &doc.header;
    println!("Description:   {}", h.description.join(", "));
    println!("File name:     {}", h.file_name);
    println!("Timestamp:     {}", h.timestamp);
    println!("Authors:       {}", h.authors.join(", "));
    println!("Organizations: {}", h.organizations.join(", "));
    println!("Preprocessor:  {}", h.preprocessor_version);
    println!("System:        {}", h.originating_system);
    println!("Authorization: {}", h.authorization);
    println!("Schemas:       {}", h.schemas.join(", "));
    Ok(())
}
