use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quarry_core::persist::{index_exists, load_corpus, load_index, save_corpus, save_index, IndexFormat, IndexPaths, MetaFile, FORMAT_VERSION};
use quarry_core::scoring::IdfMode;
use quarry_core::tokenizer::{Tokenizer, TokenizerConfig};
use quarry_core::{Corpus, QueryEngine, ScoredDoc, SearchConfig, SearchIndex};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const EXIT_COMMAND: &str = "$exit$";

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    body: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a TF-IDF inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Bincode,
}

impl From<Format> for IndexFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => IndexFormat::Json,
            Format::Bincode => IndexFormat::Bincode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize .txt/.md files and JSON/JSONL records into a processed corpus
    Preprocess {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output processed_docs.json
        #[arg(long)]
        output: String,
        /// Keep words unstemmed
        #[arg(long, default_value_t = false)]
        no_stem: bool,
        /// Extra stopwords, comma separated
        #[arg(long, value_delimiter = ',')]
        stopwords: Vec<String>,
    },
    /// Build the index from a processed corpus
    Build {
        /// processed_docs.json written by `preprocess`
        #[arg(long)]
        docs: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Rebuild even if an index already exists
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Query an index; reads queries from stdin when none is given
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Maximum results to print
        #[arg(short, long, default_value_t = 10)]
        k: usize,
        #[arg(long, default_value_t = 1.5)]
        phrase_boost: f64,
        #[arg(long, default_value_t = 1.0)]
        score_scale: f64,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
        /// Hide documents that score zero
        #[arg(long, default_value_t = false)]
        hide_zero: bool,
        query: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess { input, output, no_stem, stopwords } => {
            let config = TokenizerConfig { stem: !no_stem, extra_stopwords: stopwords, ..Default::default() };
            preprocess(Path::new(&input), Path::new(&output), &Tokenizer::new(config))
        }
        Commands::Build { docs, output, format, force } => build_index(Path::new(&docs), &output, format.into(), force),
        Commands::Search { index, k, phrase_boost, score_scale, smoothed_idf, hide_zero, query } => {
            let config = SearchConfig {
                phrase_boost,
                score_scale,
                idf_mode: if smoothed_idf { IdfMode::Smoothed } else { IdfMode::Standard },
                keep_zero_scores: !hide_zero,
            };
            search(&index, config, k, query)
        }
    }
}

fn preprocess(input: &Path, output: &Path, tokenizer: &Tokenizer) -> Result<()> {
    // earlier runs may have left their output inside the input tree
    let own_files = [output.to_path_buf(), tokenizer_config_path(output)];
    let corpus = read_corpus(input, tokenizer, &own_files)?;
    save_corpus(output, &corpus)?;
    // the build step reads the tokenizer settings from here
    save_tokenizer_config(output, tokenizer.config())?;
    tracing::info!(num_docs = corpus.len(), output = %output.display(), "processed documents saved");
    Ok(())
}

fn tokenizer_config_path(corpus_path: &Path) -> PathBuf { corpus_path.with_extension("tokenizer.json") }

fn save_tokenizer_config(corpus_path: &Path, config: &TokenizerConfig) -> Result<()> {
    fs::write(tokenizer_config_path(corpus_path), serde_json::to_string_pretty(config)?)?;
    Ok(())
}

fn load_tokenizer_config(corpus_path: &Path) -> TokenizerConfig {
    let path = tokenizer_config_path(corpus_path);
    match fs::read_to_string(&path).ok().map(|s| serde_json::from_str(&s)) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            tracing::warn!(%err, path = %path.display(), "ignoring unreadable tokenizer config");
            TokenizerConfig::default()
        }
        None => TokenizerConfig::default(),
    }
}

fn read_corpus(input: &Path, tokenizer: &Tokenizer, skip: &[PathBuf]) -> Result<Corpus> {
    let skip: Vec<PathBuf> = skip.iter().filter_map(|p| p.canonicalize().ok()).collect();
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if !p.is_file() || input_kind(p).is_none() { continue; }
            if p.canonicalize().map(|c| skip.contains(&c)).unwrap_or(false) {
                tracing::debug!(file = %p.display(), "skipping preprocess output");
                continue;
            }
            files.push(p.to_path_buf());
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }

    let mut corpus = Corpus::new();
    for file in files {
        match input_kind(&file) {
            Some(InputKind::Text) => ingest_text(&file, tokenizer, &mut corpus)?,
            Some(InputKind::Jsonl) => index_jsonl(&file, tokenizer, &mut corpus)?,
            Some(InputKind::Json) => index_json(&file, tokenizer, &mut corpus)?,
            None => tracing::warn!(file = %file.display(), "skipping unsupported file"),
        }
    }
    Ok(corpus)
}

enum InputKind {
    Text,
    Json,
    Jsonl,
}

fn input_kind(p: &Path) -> Option<InputKind> {
    match p.extension().and_then(|s| s.to_str())? {
        "txt" | "md" => Some(InputKind::Text),
        "json" => Some(InputKind::Json),
        "jsonl" => Some(InputKind::Jsonl),
        _ => None,
    }
}

fn ingest_text(file: &Path, tokenizer: &Tokenizer, corpus: &mut Corpus) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let doc_id = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    insert_doc(corpus, doc_id, tokenizer.tokenize_bytes(&bytes));
    Ok(())
}

fn index_jsonl(file: &Path, tokenizer: &Tokenizer, corpus: &mut Corpus) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).with_context(|| format!("parsing record in {}", file.display()))?;
        ingest_doc(doc, tokenizer, corpus);
    }
    Ok(())
}

fn index_json(file: &Path, tokenizer: &Tokenizer, corpus: &mut Corpus) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                ingest_doc(doc, tokenizer, corpus);
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            ingest_doc(doc, tokenizer, corpus);
        }
        _ => tracing::warn!(file = %file.display(), "expected a JSON object or array"),
    }
    Ok(())
}

fn ingest_doc(doc: InputDoc, tokenizer: &Tokenizer, corpus: &mut Corpus) {
    let text = match &doc.title {
        Some(title) => format!("{title}\n{}", doc.body),
        None => doc.body,
    };
    insert_doc(corpus, doc.id, tokenizer.tokenize(&text));
}

fn insert_doc(corpus: &mut Corpus, doc_id: String, tokens: Vec<String>) {
    if corpus.insert(doc_id.clone(), tokens).is_some() {
        tracing::warn!(%doc_id, "duplicate document id, keeping the last one");
    }
}

fn build_index(docs: &Path, output: &str, format: IndexFormat, force: bool) -> Result<()> {
    let out_paths = IndexPaths::new(output);
    if index_exists(&out_paths) && !force {
        tracing::info!(output, "index files found, skipping build (use --force to rebuild)");
        return Ok(());
    }

    let corpus = load_corpus(docs)?;
    let index = SearchIndex::build(&corpus);
    tracing::info!(num_docs = index.num_docs(), num_terms = index.inverted.num_terms(), "indexed documents");

    let meta = MetaFile {
        num_docs: index.num_docs(),
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
        format,
        tokenizer: load_tokenizer_config(docs),
    };
    save_index(&out_paths, &index, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn search(index_dir: &str, config: SearchConfig, k: usize, query: Option<String>) -> Result<()> {
    let (index, meta) = load_index(&IndexPaths::new(index_dir))?;
    let engine = QueryEngine::new(index, Tokenizer::new(meta.tokenizer), config);
    let stdout = io::stdout();

    if let Some(q) = query {
        return display_results(&mut stdout.lock(), &engine.search(&q, k));
    }

    run_loop(&engine, k, io::stdin().lock(), stdout.lock())
}

/// Answer one query per input line until `$exit$` or end of input.
fn run_loop<R: BufRead, W: Write>(engine: &QueryEngine, k: usize, input: R, mut out: W) -> Result<()> {
    writeln!(out, "Type your search query below, or type '{EXIT_COMMAND}' to quit.\n")?;
    let mut lines = input.lines();
    loop {
        write!(out, "Enter your search query: ")?;
        out.flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().eq_ignore_ascii_case(EXIT_COMMAND) { break; }
        display_results(&mut out, &engine.search(&line, k))?;
    }
    writeln!(out, "Goodbye!")?;
    Ok(())
}

fn display_results<W: Write>(out: &mut W, ranked: &[ScoredDoc]) -> Result<()> {
    if ranked.is_empty() {
        writeln!(out, "No results found.")?;
        return Ok(());
    }
    writeln!(out, "\nSearch Results:")?;
    for hit in ranked {
        let marker = if hit.phrase_match { " [phrase]" } else { "" };
        writeln!(out, "Document: {} | Score: {:.4}{}", hit.doc_id, hit.score, marker)?;
    }
    Ok(())
}
