//! On-disk index produced by the indexer and loaded whole at startup.
//!
//! Layout of an index directory:
//! - `manifest.json`: model name, vector dimension, document count
//! - `documents.jsonl`: one `{content, metadata, embedding}` record per line

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::VectorRepository;
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{Document, SearchHit, SearchQuery};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DOCUMENTS_FILE: &str = "documents.jsonl";

const FORMAT_VERSION: u32 = 1;

/// Describes the contents of an index directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub model: String,
    pub dimension: usize,
    pub document_count: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn read(index_path: &Path) -> RecommendationResult<Self> {
        let path = index_path.join(MANIFEST_FILE);
        let file = File::open(&path).map_err(|e| {
            RecommendationError::Index(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let manifest: IndexManifest = serde_json::from_reader(BufReader::new(file))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(RecommendationError::Index(format!(
                "Unsupported index format version {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    content: String,
    #[serde(default)]
    metadata: std::collections::BTreeMap<String, String>,
    embedding: Vec<f32>,
}

struct Entry {
    document: Document,
    /// Unit length, or all zeros for a zero embedding
    vector: Vec<f32>,
}

/// Brute-force cosine search over an index held in memory
pub struct LocalIndexRepository {
    path: PathBuf,
    manifest: IndexManifest,
    entries: Arc<Vec<Entry>>,
}

impl std::fmt::Debug for LocalIndexRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIndexRepository")
            .field("path", &self.path)
            .field("manifest", &self.manifest)
            .finish()
    }
}

impl LocalIndexRepository {
    /// Load the index at `path`, checking every vector against the manifest.
    pub fn open(path: impl Into<PathBuf>) -> RecommendationResult<Self> {
        let path = path.into();
        let manifest = IndexManifest::read(&path)?;

        let documents_path = path.join(DOCUMENTS_FILE);
        let file = File::open(&documents_path).map_err(|e| {
            RecommendationError::Index(format!("Cannot open {}: {}", documents_path.display(), e))
        })?;

        let mut entries = Vec::with_capacity(manifest.document_count);
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| RecommendationError::Index(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            let record: IndexRecord = serde_json::from_str(&line).map_err(|e| {
                RecommendationError::Index(format!("{}:{}: {}", DOCUMENTS_FILE, line_no + 1, e))
            })?;

            if record.embedding.len() != manifest.dimension {
                return Err(RecommendationError::Index(format!(
                    "{}:{}: expected dimension {}, found {}",
                    DOCUMENTS_FILE,
                    line_no + 1,
                    manifest.dimension,
                    record.embedding.len()
                )));
            }
            if !record.embedding.iter().all(|v| v.is_finite()) {
                return Err(RecommendationError::Index(format!(
                    "{}:{}: embedding contains non-finite values",
                    DOCUMENTS_FILE,
                    line_no + 1
                )));
            }

            entries.push(Entry {
                document: Document {
                    content: record.content,
                    metadata: record.metadata,
                },
                vector: normalize(record.embedding),
            });
        }

        if entries.len() != manifest.document_count {
            return Err(RecommendationError::Index(format!(
                "Manifest lists {} documents but {} were found",
                manifest.document_count,
                entries.len()
            )));
        }

        info!(
            path = %path.display(),
            documents = entries.len(),
            dimension = manifest.dimension,
            model = %manifest.model,
            "Loaded local index"
        );

        Ok(Self {
            path,
            manifest,
            entries: Arc::new(entries),
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Highest score first; equal scores keep index order.
fn rank(entries: &[Entry], query: &[f32], limit: usize) -> Vec<SearchHit> {
    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (i, dot(&entry.vector, query)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(i, score)| SearchHit {
            document: entries[i].document.clone(),
            score,
        })
        .collect()
}

#[async_trait]
impl VectorRepository for LocalIndexRepository {
    #[instrument(skip(self, query), fields(limit = query.limit))]
    async fn search(&self, query: SearchQuery) -> RecommendationResult<Vec<SearchHit>> {
        if query.vector.len() != self.manifest.dimension {
            return Err(RecommendationError::Index(format!(
                "Query dimension {} does not match index dimension {}",
                query.vector.len(),
                self.manifest.dimension
            )));
        }

        let entries = Arc::clone(&self.entries);
        let hits = tokio::task::spawn_blocking(move || {
            let vector = normalize(query.vector);
            rank(&entries, &vector, query.limit)
        })
        .await?;

        Ok(hits)
    }

    async fn health_check(&self) -> RecommendationResult<()> {
        if self.path.join(MANIFEST_FILE).is_file() {
            Ok(())
        } else {
            Err(RecommendationError::Index(format!(
                "Index at {} is no longer present",
                self.path.display()
            )))
        }
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.manifest.dimension)
    }
}

/// Streams documents into a new index directory
///
/// The manifest is written last, so an interrupted build never looks like
/// a loadable index.
pub struct IndexWriter {
    path: PathBuf,
    model: String,
    dimension: usize,
    count: usize,
    documents: BufWriter<File>,
}

impl IndexWriter {
    pub fn create(
        path: impl Into<PathBuf>,
        model: impl Into<String>,
        dimension: usize,
        force: bool,
    ) -> RecommendationResult<Self> {
        let path = path.into();
        if path.join(MANIFEST_FILE).exists() {
            if !force {
                return Err(RecommendationError::Config(format!(
                    "An index already exists at {}, use --force to overwrite it",
                    path.display()
                )));
            }
            fs::remove_file(path.join(MANIFEST_FILE))
                .map_err(|e| RecommendationError::Index(e.to_string()))?;
        }

        fs::create_dir_all(&path).map_err(|e| {
            RecommendationError::Index(format!("Cannot create {}: {}", path.display(), e))
        })?;
        let file = File::create(path.join(DOCUMENTS_FILE))
            .map_err(|e| RecommendationError::Index(e.to_string()))?;

        Ok(Self {
            path,
            model: model.into(),
            dimension,
            count: 0,
            documents: BufWriter::new(file),
        })
    }

    pub fn push(&mut self, document: Document, embedding: Vec<f32>) -> RecommendationResult<()> {
        if embedding.len() != self.dimension {
            return Err(RecommendationError::Embedding(format!(
                "Expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        if !embedding.iter().all(|v| v.is_finite()) {
            return Err(RecommendationError::Embedding(
                "Embedding contains non-finite values".to_string(),
            ));
        }

        let record = IndexRecord {
            content: document.content,
            metadata: document.metadata,
            embedding,
        };
        serde_json::to_writer(&mut self.documents, &record)?;
        self.documents
            .write_all(b"\n")
            .map_err(|e| RecommendationError::Index(e.to_string()))?;
        self.count += 1;
        Ok(())
    }

    pub fn finish(mut self) -> RecommendationResult<IndexManifest> {
        self.documents
            .flush()
            .map_err(|e| RecommendationError::Index(e.to_string()))?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            model: self.model,
            dimension: self.dimension,
            document_count: self.count,
            created_at: Utc::now(),
        };

        let file = File::create(self.path.join(MANIFEST_FILE))
            .map_err(|e| RecommendationError::Index(e.to_string()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &manifest)?;

        Ok(manifest)
    }
}
