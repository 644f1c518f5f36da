// # docsyncd - Docsync Daemon
//
// Thin integration layer around docsync-core. All propagation logic lives
// in the core crate; this binary only:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the runtime
// 3. Builds the record source, search index and policy registry
// 4. Replays saved records (one JSON object per line on stdin) through the
//    engine until end of input or SIGTERM/SIGINT
// 5. Prints a JSON run summary on stdout
//
// ## Configuration
//
// ### Record Source
// - `DOCSYNC_RECORD_SOURCE_TYPE`: snapshot, memory (default: memory)
// - `DOCSYNC_RECORD_SOURCE_PATH`: Snapshot file (for snapshot)
//
// ### Search Index
// - `DOCSYNC_SEARCH_INDEX_TYPE`: elasticsearch, memory (default: memory)
// - `DOCSYNC_SEARCH_INDEX_URL`: Cluster URL (for elasticsearch)
// - `DOCSYNC_SEARCH_INDEX_PREFIX`: Index name prefix (optional)
// - `DOCSYNC_SEARCH_INDEX_API_KEY`: API key (optional)
// - `DOCSYNC_MODE=dry-run`: Log Elasticsearch requests instead of sending them
//
// ### Engine
// - `DOCSYNC_BATCH_SIZE`: Records per relation page (default: 1000)
// - `DOCSYNC_DISABLED_ENTITIES`: Comma-separated entity kinds to ignore
// - `DOCSYNC_REINDEX_ARTICLE_REACTIONS`: true to reindex reading-list reactions
// - `DOCSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export DOCSYNC_RECORD_SOURCE_TYPE=snapshot
// export DOCSYNC_RECORD_SOURCE_PATH=/var/lib/docsync/snapshot.json
// export DOCSYNC_SEARCH_INDEX_TYPE=elasticsearch
// export DOCSYNC_SEARCH_INDEX_URL=http://localhost:9200
//
// docsyncd < saves.ndjson
// ```

use anyhow::Result;
use docsync_core::config::{
    ArticleSyncConfig, DocsyncConfig, RecordSourceConfig, SearchIndexConfig, SyncConfig,
};
use docsync_core::engine::RunSummary;
use docsync_core::model::{EntityKind, SavedRecord};
use docsync_core::traits::{RecordSource, SearchIndex};
use docsync_core::{MemoryRecordStore, MemorySearchIndex, PolicyRegistry, SyncEngine, SyncEvent};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Every saved record handled without failure
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
/// - 3: Run completed, but at least one relation failed
#[derive(Debug, Clone, Copy)]
enum DocsyncExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
    SyncFailures = 3,
}

impl From<DocsyncExitCode> for ExitCode {
    fn from(code: DocsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    record_source_type: String,
    record_source_path: Option<String>,
    search_index_type: String,
    search_index_url: Option<String>,
    search_index_prefix: String,
    search_index_api_key: Option<String>,
    batch_size: Option<String>,
    disabled_entities: Option<String>,
    reindex_article_reactions: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            record_source_type: lookup("DOCSYNC_RECORD_SOURCE_TYPE")
                .unwrap_or_else(|| "memory".to_string()),
            record_source_path: lookup("DOCSYNC_RECORD_SOURCE_PATH"),
            search_index_type: lookup("DOCSYNC_SEARCH_INDEX_TYPE")
                .unwrap_or_else(|| "memory".to_string()),
            search_index_url: lookup("DOCSYNC_SEARCH_INDEX_URL"),
            search_index_prefix: lookup("DOCSYNC_SEARCH_INDEX_PREFIX").unwrap_or_default(),
            search_index_api_key: lookup("DOCSYNC_SEARCH_INDEX_API_KEY"),
            batch_size: lookup("DOCSYNC_BATCH_SIZE"),
            disabled_entities: lookup("DOCSYNC_DISABLED_ENTITIES"),
            reindex_article_reactions: lookup("DOCSYNC_REINDEX_ARTICLE_REACTIONS"),
            log_level: lookup("DOCSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Validate the environment and build the library configuration
    fn build(&self) -> Result<DocsyncConfig> {
        let record_source = match self.record_source_type.as_str() {
            "memory" => RecordSourceConfig::Memory,
            "snapshot" => {
                let Some(path) = self.record_source_path.as_deref().filter(|p| !p.is_empty())
                else {
                    anyhow::bail!(
                        "DOCSYNC_RECORD_SOURCE_PATH is required when DOCSYNC_RECORD_SOURCE_TYPE=snapshot. \
                        Set it via: export DOCSYNC_RECORD_SOURCE_PATH=/var/lib/docsync/snapshot.json"
                    );
                };
                RecordSourceConfig::Snapshot {
                    path: path.to_string(),
                }
            }
            other => anyhow::bail!(
                "DOCSYNC_RECORD_SOURCE_TYPE '{}' is not supported. \
                Supported types: snapshot, memory",
                other
            ),
        };

        let search_index = match self.search_index_type.as_str() {
            "memory" => SearchIndexConfig::Memory,
            "elasticsearch" => {
                let Some(url) = self.search_index_url.clone().filter(|u| !u.is_empty()) else {
                    anyhow::bail!(
                        "DOCSYNC_SEARCH_INDEX_URL is required when DOCSYNC_SEARCH_INDEX_TYPE=elasticsearch"
                    );
                };
                if url.starts_with("http://") {
                    eprintln!(
                        "WARNING: DOCSYNC_SEARCH_INDEX_URL uses HTTP (not HTTPS). \
                        The API key, if any, is sent in clear text."
                    );
                }
                SearchIndexConfig::Elasticsearch {
                    url,
                    index_prefix: self.search_index_prefix.clone(),
                    api_key: self.search_index_api_key.clone().filter(|k| !k.is_empty()),
                }
            }
            other => anyhow::bail!(
                "DOCSYNC_SEARCH_INDEX_TYPE '{}' is not supported. \
                Supported types: elasticsearch, memory",
                other
            ),
        };

        let mut sync = SyncConfig::default();

        if let Some(ref raw) = self.batch_size {
            let batch_size: usize = raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("DOCSYNC_BATCH_SIZE must be a positive integer. Got: {}", raw)
            })?;
            if !(1..=10_000).contains(&batch_size) {
                anyhow::bail!(
                    "DOCSYNC_BATCH_SIZE must be between 1 and 10000. Got: {}",
                    batch_size
                );
            }
            sync = sync.with_batch_size(batch_size);
        }

        if let Some(ref raw) = self.disabled_entities {
            for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let kind: EntityKind = name
                    .parse()
                    .map_err(|e| anyhow::anyhow!("DOCSYNC_DISABLED_ENTITIES: {}", e))?;
                sync = sync.with_disabled(kind);
            }
        }

        if let Some(ref raw) = self.reindex_article_reactions {
            let enabled = match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" | "" => false,
                _ => anyhow::bail!(
                    "DOCSYNC_REINDEX_ARTICLE_REACTIONS must be true or false. Got: {}",
                    raw
                ),
            };
            sync.article = ArticleSyncConfig {
                reindex_reading_list_reactions: enabled,
            };
        }

        self.log_level()?;

        let config = DocsyncConfig {
            record_source,
            search_index,
            sync,
        };
        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "DOCSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    let docsync_config = match config.build() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DocsyncExitCode::ConfigError.into();
        }
    };

    let log_level = config.log_level().unwrap_or(Level::INFO);

    // Logs go to stderr; stdout carries the run summary
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DocsyncExitCode::ConfigError.into();
    }

    info!("Starting docsyncd");
    info!(
        "Record source: {}, search index: {}, batch size: {}",
        docsync_config.record_source.type_name(),
        docsync_config.search_index.type_name(),
        docsync_config.sync.batch_size
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DocsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(docsync_config).await {
            Ok(summary) if summary.failed > 0 => DocsyncExitCode::SyncFailures,
            Ok(_) => DocsyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {}", e);
                DocsyncExitCode::RuntimeError
            }
        }
    });

    shutdown_runtime(rt);
    result.into()
}

/// Tear down the runtime without waiting on blocking tasks
///
/// The stdin reader runs on a blocking thread whose read cannot be
/// cancelled. After a shutdown signal it stays parked until the writer
/// closes the pipe, so the runtime must not wait for it.
fn shutdown_runtime(rt: tokio::runtime::Runtime) {
    rt.shutdown_background();
}

/// Run the daemon
async fn run_daemon(config: DocsyncConfig) -> Result<RunSummary> {
    let source = create_record_source(&config.record_source).await?;
    let index = create_search_index(&config.search_index)?;

    let registry = Arc::new(PolicyRegistry::with_defaults(&config.sync));
    info!("Registered sync policies: {:?}", registry.list_policies());

    let (engine, mut events) = SyncEngine::new(registry, source, index, config.sync)?;

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let signal_task = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                error!("Shutdown handler error: {}", e);
                // Keep the sender alive so the engine is not stopped
                std::future::pending::<()>().await;
            }
        }
    });

    let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let records = lines.filter_map(parse_saved_record);

    info!("Reading saved records from stdin");
    let summary = engine.run_with_shutdown(records, Some(shutdown_rx)).await?;

    signal_task.abort();
    drop(engine);
    let _ = event_logger.await;

    println!("{}", serde_json::to_string(&summary)?);
    Ok(summary)
}

async fn create_record_source(config: &RecordSourceConfig) -> Result<Box<dyn RecordSource>> {
    Ok(match config {
        RecordSourceConfig::Snapshot { path } => {
            Box::new(MemoryRecordStore::load(path).await?) as Box<dyn RecordSource>
        }
        RecordSourceConfig::Memory => {
            warn!("Using an empty in-memory record source; every relation will be empty");
            Box::new(MemoryRecordStore::new())
        }
    })
}

fn create_search_index(config: &SearchIndexConfig) -> Result<Box<dyn SearchIndex>> {
    match config {
        #[cfg(feature = "elasticsearch")]
        SearchIndexConfig::Elasticsearch { .. } => Ok(Box::new(
            docsync_index_elasticsearch::ElasticsearchIndex::from_config(config)?,
        )),
        #[cfg(not(feature = "elasticsearch"))]
        SearchIndexConfig::Elasticsearch { .. } => {
            anyhow::bail!("docsyncd was built without the elasticsearch feature")
        }
        SearchIndexConfig::Memory => Ok(Box::new(MemorySearchIndex::new())),
    }
}

/// Parse one line of input, skipping blank and malformed lines
fn parse_saved_record(line: std::io::Result<String>) -> Option<SavedRecord> {
    let line = match line {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to read input line: {}", e);
            return None;
        }
    };
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&line) {
        Ok(saved) => Some(saved),
        Err(e) => {
            warn!("Skipping malformed saved record: {}", e);
            None
        }
    }
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::RelationFailed {
            entity,
            relation,
            error,
        } => warn!("{}.{} failed: {}", entity, relation, error),
        SyncEvent::Completed {
            entity,
            documents,
            failures,
        } => debug!("{} completed: {} document(s), {} failure(s)", entity, documents, failures),
        other => debug!("Engine event: {:?}", other),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// The name of the signal received
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_runtime_shutdown_does_not_wait_for_blocked_reader() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        // Stands in for a stdin read on a pipe that is never closed
        let (started_tx, started_rx) = mpsc::channel();
        let (_writer, reader) = mpsc::channel::<()>();
        rt.spawn_blocking(move || {
            let _ = started_tx.send(());
            let _ = reader.recv();
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        std::thread::spawn(move || {
            shutdown_runtime(rt);
            let _ = done_tx.send(());
        });

        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_build_memory_config() {
        let built = config(&[]).build().unwrap();

        assert!(matches!(built.record_source, RecordSourceConfig::Memory));
        assert!(matches!(built.search_index, SearchIndexConfig::Memory));
        assert_eq!(built.sync.batch_size, 1000);
        assert!(!built.sync.article.reindex_reading_list_reactions);
    }

    #[test]
    fn test_snapshot_requires_path() {
        let err = config(&[("DOCSYNC_RECORD_SOURCE_TYPE", "snapshot")])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("DOCSYNC_RECORD_SOURCE_PATH"));
    }

    #[test]
    fn test_elasticsearch_requires_url() {
        let err = config(&[("DOCSYNC_SEARCH_INDEX_TYPE", "elasticsearch")])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("DOCSYNC_SEARCH_INDEX_URL"));
    }

    #[test]
    fn test_elasticsearch_config() {
        let built = config(&[
            ("DOCSYNC_SEARCH_INDEX_TYPE", "elasticsearch"),
            ("DOCSYNC_SEARCH_INDEX_URL", "https://es.internal:9200"),
            ("DOCSYNC_SEARCH_INDEX_PREFIX", "forem_"),
        ])
        .build()
        .unwrap();

        match built.search_index {
            SearchIndexConfig::Elasticsearch {
                url,
                index_prefix,
                api_key,
            } => {
                assert_eq!(url, "https://es.internal:9200");
                assert_eq!(index_prefix, "forem_");
                assert!(api_key.is_none());
            }
            other => panic!("unexpected search index config: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_types_rejected() {
        assert!(config(&[("DOCSYNC_RECORD_SOURCE_TYPE", "postgres")]).build().is_err());
        assert!(config(&[("DOCSYNC_SEARCH_INDEX_TYPE", "solr")]).build().is_err());
        assert!(config(&[("DOCSYNC_LOG_LEVEL", "verbose")]).build().is_err());
    }

    #[test]
    fn test_engine_settings() {
        let built = config(&[
            ("DOCSYNC_BATCH_SIZE", "250"),
            ("DOCSYNC_DISABLED_ENTITIES", "tag, user"),
            ("DOCSYNC_REINDEX_ARTICLE_REACTIONS", "true"),
        ])
        .build()
        .unwrap();

        assert_eq!(built.sync.batch_size, 250);
        assert!(!built.sync.is_enabled(EntityKind::Tag));
        assert!(!built.sync.is_enabled(EntityKind::User));
        assert!(built.sync.is_enabled(EntityKind::Article));
        assert!(built.sync.article.reindex_reading_list_reactions);
    }

    #[test]
    fn test_invalid_engine_settings_rejected() {
        assert!(config(&[("DOCSYNC_BATCH_SIZE", "0")]).build().is_err());
        assert!(config(&[("DOCSYNC_BATCH_SIZE", "lots")]).build().is_err());
        assert!(config(&[("DOCSYNC_DISABLED_ENTITIES", "comment")]).build().is_err());
        assert!(config(&[("DOCSYNC_REINDEX_ARTICLE_REACTIONS", "maybe")]).build().is_err());
    }

    #[test]
    fn test_parse_saved_record_skips_bad_lines() {
        assert!(parse_saved_record(Ok(String::new())).is_none());
        assert!(parse_saved_record(Ok("{ nope".to_string())).is_none());

        let saved = parse_saved_record(Ok(
            r#"{"kind":"tag","id":3,"attributes":{"name":"rust"},"changes":{"name":["rs","rust"]}}"#
                .to_string(),
        ))
        .unwrap();
        assert_eq!(saved.kind, EntityKind::Tag);
        assert!(saved.changes.contains("name"));
    }
}
