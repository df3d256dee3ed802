use std::path::PathBuf;

use core_config::{AppInfo, FromEnv, app_info, env_or_default, server::ServerConfig};
use domain_recommendations::{EmbeddingSettings, QdrantConfig};

// Re-export Environment for use in other modules
pub use core_config::Environment;

pub const DEFAULT_INDEX_PATH: &str = "./chroma_books_data";
const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Where the book vectors live
#[derive(Clone, Debug)]
pub enum IndexBackend {
    /// Directory written by `shelf-indexer build`
    Local(PathBuf),
    Qdrant(QdrantConfig),
}

impl IndexBackend {
    /// Qdrant when `QDRANT_URL` is set, otherwise the directory at `SHELF_INDEX_PATH`.
    pub fn from_env() -> eyre::Result<Self> {
        Ok(match QdrantConfig::from_env()? {
            Some(qdrant) => IndexBackend::Qdrant(qdrant),
            None => IndexBackend::Local(PathBuf::from(env_or_default(
                "SHELF_INDEX_PATH",
                DEFAULT_INDEX_PATH,
            ))),
        })
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub embedding: EmbeddingSettings,
    pub index: IndexBackend,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // Defaults: HOST=127.0.0.1, PORT=8000
        let embedding = EmbeddingSettings::from_env()?;
        let index = IndexBackend::from_env()?;
        let static_dir = PathBuf::from(env_or_default("SHELF_STATIC_DIR", DEFAULT_STATIC_DIR));

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            embedding,
            index,
            static_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_index_by_default() {
        temp_env::with_vars(
            [("QDRANT_URL", None::<&str>), ("SHELF_INDEX_PATH", None)],
            || match IndexBackend::from_env().unwrap() {
                IndexBackend::Local(path) => assert_eq!(path, PathBuf::from(DEFAULT_INDEX_PATH)),
                other => panic!("expected local index, got {:?}", other),
            },
        );
    }

    #[test]
    fn test_index_path_override() {
        temp_env::with_vars(
            [("QDRANT_URL", None), ("SHELF_INDEX_PATH", Some("/data/books"))],
            || match IndexBackend::from_env().unwrap() {
                IndexBackend::Local(path) => assert_eq!(path, PathBuf::from("/data/books")),
                other => panic!("expected local index, got {:?}", other),
            },
        );
    }

    #[test]
    fn test_qdrant_url_selects_qdrant() {
        temp_env::with_var("QDRANT_URL", Some("http://qdrant:6334"), || {
            assert!(matches!(
                IndexBackend::from_env().unwrap(),
                IndexBackend::Qdrant(_)
            ));
        });
    }

    #[test]
    fn test_static_dir_defaults_to_crate_assets() {
        temp_env::with_var_unset("SHELF_STATIC_DIR", || {
            let config = Config::from_env().unwrap();
            assert!(config.static_dir.ends_with("static"));
            assert_eq!(config.app.name, "shelf_web");
        });
    }
}
