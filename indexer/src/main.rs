use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use neardup_core::tokenizer::tokenize;
use neardup_core::{
    DocId, Document, DuplicateGroupBuilder, DuplicateResultCache, IdfMode, MemoryStore, SimilarityConfig,
    SimilarityEngine,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: Option<DocId>,
    #[serde(alias = "body")]
    content: String,
}

#[derive(Parser)]
#[command(name = "neardup-indexer")]
#[command(about = "Bulk near-duplicate detection over JSON/JSONL documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every document and report duplicate groups
    Scan {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<String>,
        /// Minimum similarity score for duplicates
        #[arg(long)]
        threshold: Option<f64>,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
    },
    /// Report which input documents duplicate a piece of text
    Check {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Text to check
        #[arg(long)]
        text: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
struct ScanReport {
    generated_at: String,
    documents: usize,
    threshold: f64,
    duplicate_groups: Vec<Vec<DocId>>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { input, output, threshold, smoothed_idf } => {
            let config = config_from(threshold, smoothed_idf);
            let report = scan(Path::new(&input), config)?;
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    tracing::info!(output = %path, groups = report.duplicate_groups.len(), "report written");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Commands::Check { input, text, threshold } => {
            let ids = check(Path::new(&input), &text, config_from(threshold, false))?;
            println!("{}", serde_json::to_string(&ids)?);
            Ok(())
        }
    }
}

fn config_from(threshold: Option<f64>, smoothed_idf: bool) -> SimilarityConfig {
    let mut config = SimilarityConfig::from_env();
    if let Some(t) = threshold {
        config = config.with_threshold(t);
    }
    if smoothed_idf {
        config = config.with_idf(IdfMode::Smoothed);
    }
    config
}

fn scan(input: &Path, config: SimilarityConfig) -> Result<ScanReport> {
    let threshold = config.matching_threshold;
    let documents = load_documents(input)?;
    let duplicates = build_index(documents.clone(), config)?;

    let groups = DuplicateGroupBuilder::new(&duplicates).build_groups(&documents)?;
    tracing::info!(num_docs = documents.len(), groups = groups.len(), "scan complete");
    Ok(ScanReport {
        generated_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        documents: documents.len(),
        threshold,
        duplicate_groups: groups.into_iter().map(|g| g.into_iter().collect()).collect(),
    })
}

fn check(input: &Path, text: &str, config: SimilarityConfig) -> Result<Vec<DocId>> {
    let documents = load_documents(input)?;
    let duplicates = build_index(documents, config)?;
    Ok(duplicates.check(&tokenize(text))?)
}

fn build_index(documents: Vec<Document>, config: SimilarityConfig) -> Result<DuplicateResultCache> {
    let engine = Arc::new(SimilarityEngine::new(Arc::new(MemoryStore::new()), config));
    engine.init(documents)?;
    Ok(DuplicateResultCache::new(engine))
}

/// Read every `.json`/`.jsonl` file under `input`. Documents without an id are
/// numbered after the largest explicit id, in file order. Repeated explicit ids are
/// rejected.
fn load_documents(input: &Path) -> Result<Vec<Document>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }

    let mut raw: Vec<InputDoc> = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut raw)?;
        } else {
            read_json(&file, &mut raw)?;
        }
    }

    let mut seen = BTreeSet::new();
    for id in raw.iter().filter_map(|d| d.id) {
        if !seen.insert(id) {
            bail!("document id {id} appears more than once in {}", input.display());
        }
    }

    let mut next_id = seen.last().copied().unwrap_or(0) + 1;
    let documents = raw
        .into_iter()
        .map(|d| {
            let id = d.id.unwrap_or_else(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            let tokens = tokenize(&d.content);
            Document::new(id, d.content, tokens)
        })
        .collect::<Vec<_>>();
    tracing::info!(num_docs = documents.len(), "ingested documents");
    Ok(documents)
}

fn read_jsonl(file: &Path, out: &mut Vec<InputDoc>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<InputDoc>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping file without document objects"),
    }
    Ok(())
}
