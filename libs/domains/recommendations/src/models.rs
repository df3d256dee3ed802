use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{RecommendationError, RecommendationResult};

/// Title shown when a document carries no `title` metadata
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Metadata key holding a book's title
pub const TITLE_KEY: &str = "title";

pub const MIN_RESULTS: i64 = 1;
pub const MAX_RESULTS: i64 = 10;
pub const DEFAULT_RESULTS: i64 = 3;

pub const EMPTY_QUERY_MESSAGE: &str = "Query cannot be empty";
pub const RESULT_COUNT_MESSAGE: &str = "Number of recommendations must be between 1 and 10";

// ===== Request / validated inputs =====

/// Raw form submitted to `POST /recommendations`
///
/// `k` is kept signed and unclamped so out-of-range values reach validation
/// instead of failing deserialization. A blank `k` means the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationForm {
    pub query: String,
    #[serde(default = "default_k", deserialize_with = "deserialize_k")]
    pub k: i64,
}

fn default_k() -> i64 {
    DEFAULT_RESULTS
}

/// Accepts form text or a JSON integer.
///
/// Integers beyond `i64` saturate, so they still fail the range check rather
/// than the extractor.
fn deserialize_k<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl Visitor<'_> for CountVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer number of recommendations")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(i64::MAX))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            parse_k(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

fn parse_k(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(DEFAULT_RESULTS);
    }
    if let Ok(k) = raw.parse::<i64>() {
        return Some(k);
    }

    let (negative, digits) = match raw.as_bytes()[0] {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

/// Free-text query with at least one non-whitespace character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// The caller's text is kept as typed; only emptiness is judged on the trimmed form.
    pub fn parse(raw: &str) -> RecommendationResult<Self> {
        if raw.trim().is_empty() {
            return Err(RecommendationError::Validation(
                EMPTY_QUERY_MESSAGE.to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of results requested, always within `MIN_RESULTS..=MAX_RESULTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCount(usize);

impl ResultCount {
    pub fn new(k: i64) -> RecommendationResult<Self> {
        if !(MIN_RESULTS..=MAX_RESULTS).contains(&k) {
            return Err(RecommendationError::Validation(
                RESULT_COUNT_MESSAGE.to_string(),
            ));
        }
        Ok(Self(k as usize))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ResultCount {
    fn default() -> Self {
        Self(DEFAULT_RESULTS as usize)
    }
}

/// Query and count that passed validation, in that order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub query: Query,
    pub k: ResultCount,
}

// ===== Retrieval =====

/// A stored item as returned by the retriever: raw content plus string metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get(TITLE_KEY).map(String::as_str)
    }
}

/// Document with its similarity score, best first in result lists
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Similarity search against a vector repository
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self { vector, limit }
    }
}

// ===== Presentation =====

/// One rendered recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub title: String,
    pub description: String,
}

impl From<Document> for RecommendationItem {
    fn from(document: Document) -> Self {
        let title = document
            .title()
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();
        Self {
            title,
            description: document.content,
        }
    }
}

// ===== Embeddings =====

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// In-process ONNX model
    #[default]
    Local,
    /// OpenAI-compatible HTTP API
    OpenAI,
}

impl FromStr for EmbeddingProviderType {
    type Err = RecommendationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "fastembed" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAI),
            other => Err(RecommendationError::Config(format!(
                "Unknown embedding provider '{}', expected 'local' or 'openai'",
                other
            ))),
        }
    }
}

/// Embedding models known to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// sentence-transformers/all-MiniLM-L6-v2 (384 dimensions)
    #[default]
    AllMiniLmL6V2,
    /// BAAI/bge-small-en-v1.5 (384 dimensions)
    BgeSmallEnV15,
    /// OpenAI text-embedding-3-small (1536 dimensions)
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
}

impl EmbeddingModel {
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::TextEmbedding3Small => "text-embedding-3-small",
            Self::TextEmbedding3Large => "text-embedding-3-large",
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::AllMiniLmL6V2 | Self::BgeSmallEnV15 => 384,
            Self::TextEmbedding3Small => 1536,
            Self::TextEmbedding3Large => 3072,
        }
    }

    pub fn provider_type(&self) -> EmbeddingProviderType {
        match self {
            Self::AllMiniLmL6V2 | Self::BgeSmallEnV15 => EmbeddingProviderType::Local,
            Self::TextEmbedding3Small | Self::TextEmbedding3Large => EmbeddingProviderType::OpenAI,
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

impl FromStr for EmbeddingModel {
    type Err = RecommendationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .trim()
            .trim_start_matches("sentence-transformers/")
            .trim_start_matches("BAAI/");
        [
            Self::AllMiniLmL6V2,
            Self::BgeSmallEnV15,
            Self::TextEmbedding3Small,
            Self::TextEmbedding3Large,
        ]
        .into_iter()
        .find(|model| model.model_name().eq_ignore_ascii_case(name))
        .ok_or_else(|| RecommendationError::Config(format!("Unknown embedding model '{}'", s)))
    }
}

/// Result of embedding one text
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub values: Vec<f32>,
    pub dimension: usize,
}

impl EmbeddingResult {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            dimension: values.len(),
            values,
        }
    }
}

// ===== Device selection =====

/// Compute device the local model runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => f.write_str("cuda"),
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

/// Requested device; `Auto` probes for an NVIDIA driver at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    #[default]
    Auto,
    Cuda,
    Cpu,
}

impl DeviceSelector {
    pub fn resolve(self) -> Device {
        match self {
            DeviceSelector::Cuda => Device::Cuda,
            DeviceSelector::Cpu => Device::Cpu,
            DeviceSelector::Auto => {
                let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
                let driver_present =
                    std::path::Path::new("/proc/driver/nvidia/version").exists();
                detect_device(visible.as_deref(), driver_present)
            }
        }
    }
}

/// `CUDA_VISIBLE_DEVICES` set to empty or `-1` hides every GPU.
fn detect_device(cuda_visible_devices: Option<&str>, driver_present: bool) -> Device {
    let hidden = matches!(cuda_visible_devices.map(str::trim), Some("") | Some("-1"));
    if driver_present && !hidden {
        Device::Cuda
    } else {
        Device::Cpu
    }
}

impl FromStr for DeviceSelector {
    type Err = RecommendationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "cpu" => Ok(Self::Cpu),
            other => Err(RecommendationError::Config(format!(
                "Unknown device '{}', expected auto, cuda or cpu",
                other
            ))),
        }
    }
}
