use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::db;
use crate::export::CsvExporter;
use crate::storage::{FileStore, LocalFileStore};
use crate::users::{memory::InMemoryUserStore, repo::PgUserStore, repo::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub files: Arc<dyn FileStore>,
    pub exporter: Arc<CsvExporter>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config.database_url.as_deref().unwrap_or_default();
                let pool = db::connect(url, config.db_max_connections).await?;
                db::migrate(&pool).await;
                PgUserStore::new(pool) as Arc<dyn UserStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; records are lost on restart");
                Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let files = Arc::new(LocalFileStore::new(&config.upload_dir)) as Arc<dyn FileStore>;
        let exporter = Arc::new(CsvExporter::new(&config.export_dir));

        Ok(Self::from_parts(store, files, exporter, config))
    }

    pub fn from_parts(
        store: Arc<dyn UserStore>,
        files: Arc<dyn FileStore>,
        exporter: Arc<CsvExporter>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            files,
            exporter,
            config,
        }
    }

    /// In-memory store with upload and export directories under a fresh
    /// temp directory.
    pub fn fake() -> Self {
        let root = std::env::temp_dir().join(format!("usersdesk-{}", uuid::Uuid::new_v4()));
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            upload_dir: root.join("uploads"),
            export_dir: root.join("exports"),
            max_upload_bytes: 1024 * 1024,
        });

        Self::from_parts(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(LocalFileStore::new(&config.upload_dir)),
            Arc::new(CsvExporter::new(&config.export_dir)),
            config,
        )
    }
}
