//! Shelf Indexer
//!
//! Builds the local book index read by the Shelf web service from a
//! JSON-lines catalogue, and inspects existing indexes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, env_or_default};
use domain_recommendations::{EmbeddingSettings, IndexManifest, IndexWriter};
use eyre::Result;
use tracing::info;

mod builder;
mod catalogue;

use builder::{DEFAULT_BATCH_SIZE, build_index};
use catalogue::{FieldMapping, read_catalogue};

const DEFAULT_INDEX_PATH: &str = "./chroma_books_data";

#[derive(Parser)]
#[command(name = "shelf-indexer")]
#[command(about = "Build and inspect the Shelf book index")]
struct Cli {
    /// Index directory. Defaults to SHELF_INDEX_PATH or ./chroma_books_data
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a JSON-lines catalogue and write a new index
    Build {
        /// Catalogue file, one JSON object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Field holding the book title
        #[arg(long, default_value = "title")]
        title_field: String,

        /// Field holding the text to embed
        #[arg(long, default_value = "description")]
        content_field: String,

        /// Documents embedded per provider call
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Replace an existing index
        #[arg(short, long)]
        force: bool,
    },

    /// Print the manifest of an existing index
    Inspect,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    let index_path = cli
        .index_path
        .unwrap_or_else(|| PathBuf::from(env_or_default("SHELF_INDEX_PATH", DEFAULT_INDEX_PATH)));

    match cli.command {
        Commands::Build {
            input,
            title_field,
            content_field,
            batch_size,
            force,
        } => {
            let fields = FieldMapping {
                title_field,
                content_field,
            };
            let catalogue = read_catalogue(&input, &fields)?;
            info!(
                documents = catalogue.documents.len(),
                skipped = catalogue.skipped,
                "Catalogue loaded from {}",
                input.display()
            );

            let settings = EmbeddingSettings::from_env()?;
            let embedder = tokio::task::spawn_blocking(move || settings.build()).await??;

            let model = embedder.model();
            let writer =
                IndexWriter::create(&index_path, model.model_name(), model.dimension(), force)?;

            let manifest =
                build_index(catalogue.documents, embedder.as_ref(), writer, batch_size).await?;

            info!(
                "Index complete: {} documents, {} dimensions, written to {}",
                manifest.document_count,
                manifest.dimension,
                index_path.display()
            );
        }

        Commands::Inspect => {
            let manifest = IndexManifest::read(&index_path)?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
    }

    Ok(())
}
