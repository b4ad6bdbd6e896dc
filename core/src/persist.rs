use crate::tokenizer::TokenizerConfig;
use crate::{Corpus, DocumentFrequencyTable, InvertedIndex, SearchIndex, TermFrequencyTable};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    #[default]
    Json,
    Bincode,
}

impl IndexFormat {
    fn extension(self) -> &'static str {
        match self {
            IndexFormat::Json => "json",
            IndexFormat::Bincode => "bin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub created_at: String,
    pub version: u32,
    #[serde(default)]
    pub format: IndexFormat,
    /// Tokenizer the index was built with; queries must use the same one.
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self) -> PathBuf { self.root.join("processed_docs.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn inverted_index(&self, format: IndexFormat) -> PathBuf { self.root.join(format!("inverted_index.{}", format.extension())) }
    fn term_frequency(&self, format: IndexFormat) -> PathBuf { self.root.join(format!("term_frequency.{}", format.extension())) }
    fn document_frequency(&self, format: IndexFormat) -> PathBuf { self.root.join(format!("document_frequency.{}", format.extension())) }
}

fn write_file<T: Serialize>(path: &Path, value: &T, format: IndexFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    match format {
        IndexFormat::Json => serde_json::to_writer_pretty(&mut w, value)?,
        IndexFormat::Bincode => bincode::serialize_into(&mut w, value)?,
    }
    w.flush()?;
    tracing::debug!(path = %path.display(), "wrote index file");
    Ok(())
}

fn read_file<T: DeserializeOwned>(path: &Path, format: IndexFormat) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let r = BufReader::new(f);
    let value = match format {
        IndexFormat::Json => serde_json::from_reader(r).with_context(|| format!("decoding {}", path.display()))?,
        IndexFormat::Bincode => bincode::deserialize_from(r).with_context(|| format!("decoding {}", path.display()))?,
    };
    Ok(value)
}

/// Save document id -> tokens, always as JSON.
pub fn save_corpus(path: &Path, corpus: &Corpus) -> Result<()> {
    write_file(path, corpus, IndexFormat::Json)
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    read_file(path, IndexFormat::Json)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    write_file(&paths.meta(), meta, IndexFormat::Json)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    read_file(&paths.meta(), IndexFormat::Json)
}

/// Persist the three index structures in the format named by `meta`, then `meta.json`.
pub fn save_index(paths: &IndexPaths, index: &SearchIndex, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_file(&paths.inverted_index(meta.format), &index.inverted, meta.format)?;
    write_file(&paths.term_frequency(meta.format), &index.term_frequency, meta.format)?;
    write_file(&paths.document_frequency(meta.format), &index.document_frequency, meta.format)?;
    save_meta(paths, meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, format = ?meta.format, "index saved");
    Ok(())
}

/// Load `meta.json` and the three structures it describes.
pub fn load_index(paths: &IndexPaths) -> Result<(SearchIndex, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        anyhow::bail!("unsupported index version {} (expected {})", meta.version, FORMAT_VERSION);
    }
    let inverted: InvertedIndex = read_file(&paths.inverted_index(meta.format), meta.format)?;
    let term_frequency: TermFrequencyTable = read_file(&paths.term_frequency(meta.format), meta.format)?;
    let document_frequency: DocumentFrequencyTable = read_file(&paths.document_frequency(meta.format), meta.format)?;
    let index = SearchIndex::new(inverted, term_frequency, document_frequency);
    if index.num_docs() != meta.num_docs {
        tracing::warn!(meta = meta.num_docs, actual = index.num_docs(), "document count in meta.json is stale");
    }
    Ok((index, meta))
}

/// True when `meta.json` and every structure it names are present.
pub fn index_exists(paths: &IndexPaths) -> bool {
    match load_meta(paths) {
        Ok(meta) => [
            paths.inverted_index(meta.format),
            paths.term_frequency(meta.format),
            paths.document_frequency(meta.format),
        ]
        .iter()
        .all(|p| p.exists()),
        Err(_) => false,
    }
}
