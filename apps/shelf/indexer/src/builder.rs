use domain_recommendations::{Document, EmbeddingProvider, IndexManifest, IndexWriter};
use eyre::{Result, eyre};
use tracing::info;

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Embeds `documents` batch by batch and streams them into `writer`.
///
/// Document order is preserved, so equal-scoring books rank in catalogue order.
pub async fn build_index(
    documents: Vec<Document>,
    embedder: &dyn EmbeddingProvider,
    mut writer: IndexWriter,
    batch_size: usize,
) -> Result<IndexManifest> {
    let total = documents.len();
    let batch_size = batch_size.max(1);
    let mut written = 0;

    let mut documents = documents.into_iter().peekable();
    while documents.peek().is_some() {
        let batch: Vec<Document> = documents.by_ref().take(batch_size).collect();
        let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();

        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(eyre!(
                "Embedding provider returned {} vectors for {} documents",
                embeddings.len(),
                batch.len()
            ));
        }

        for (document, embedding) in batch.into_iter().zip(embeddings) {
            writer.push(document, embedding.values)?;
        }

        written += texts.len();
        info!(written, total, "Embedded batch");
    }

    Ok(writer.finish()?)
}
