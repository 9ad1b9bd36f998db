//! CLI command implementations
//!
//! Each command prints exactly one operation envelope. The process exits
//! non-zero when the envelope is unsuccessful.

use std::io::{self, Write};
use std::path::Path;

use serde_json::json;
use tracing::debug;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::document_store::{
    BlobBackend, BlobDocumentStore, DocumentEntity, DocumentStore, OperationResult, ReorderBatch,
    StoreConfig, StoreError,
};

use super::args::{Cli, Command, Placement};
use super::errors::{CliError, CliResult};
use super::io::write_json_to;

/// Install the stderr log subscriber. `RUST_LOG` overrides the default.
pub fn init_logging() -> CliResult<()> {
    let directive = "docstore=info"
        .parse::<Directive>()
        .map_err(|e| CliError::logging_error(format!("{}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| CliError::logging_error(e.to_string()))
}

/// Parse arguments and run; returns whether the operation succeeded
pub async fn run() -> CliResult<bool> {
    init_logging()?;
    let cli = Cli::parse_args();
    run_command(&cli.config, cli.command).await
}

/// Open the configured store and run one command against it
pub async fn run_command(config_path: &Path, command: Command) -> CliResult<bool> {
    let config = StoreConfig::load(config_path)?;
    debug!(path = %config_path.display(), backend = ?config.backend, "Loaded config");

    let store = BlobDocumentStore::open(&config).await?;
    let mut stdout = io::stdout();
    execute(&store, command, &mut stdout).await
}

/// Run one command, writing the envelope to `out`
pub async fn execute<B, W>(
    store: &BlobDocumentStore<B>,
    command: Command,
    out: &mut W,
) -> CliResult<bool>
where
    B: BlobBackend + ?Sized,
    W: Write,
{
    match command {
        Command::Upload { name, file } => {
            let content = tokio::fs::File::open(&file).await.map_err(|e| {
                CliError::io_error(format!("cannot open {}: {}", file.display(), e))
            })?;
            respond(out, store.upload(&name, content).await)
        }
        Command::Download { name, out: path } => {
            let result = store.download(&name).await;
            let result = match result.into_result() {
                Ok(content) => {
                    tokio::fs::write(&path, &content).await.map_err(|e| {
                        CliError::io_error(format!("cannot write {}: {}", path.display(), e))
                    })?;
                    OperationResult::success(json!({
                        "name": name,
                        "size": content.len(),
                        "path": path.display().to_string(),
                    }))
                }
                Err(e) => OperationResult::failure(e),
            };
            respond(out, result)
        }
        Command::Delete { name } => respond(out, store.delete(&name).await),
        Command::List => respond(out, store.get_all().await),
        Command::Reorder { placements } => match build_batch(store, &placements).await {
            Ok(batch) => respond(out, store.reorder(batch).await),
            Err(e) => respond(out, OperationResult::<()>::failure(e)),
        },
    }
}

/// Resolve placements against the current listing.
///
/// Names missing from the listing are still sent so the store reports them.
async fn build_batch<B: BlobBackend + ?Sized>(
    store: &BlobDocumentStore<B>,
    placements: &[Placement],
) -> Result<ReorderBatch, StoreError> {
    let listing = store.get_all().await.into_result()?;

    let entities = placements
        .iter()
        .map(|placement| {
            match listing.iter().find(|entity| entity.name() == placement.name) {
                Some(entity) => Ok(entity.with_order(placement.order)),
                None => store.entity_for(&placement.name, 0, placement.order),
            }
        })
        .collect::<Result<Vec<DocumentEntity>, StoreError>>()?;

    ReorderBatch::new(entities)
}

fn respond<W: Write, T: serde::Serialize>(
    out: &mut W,
    result: OperationResult<T>,
) -> CliResult<bool> {
    write_json_to(out, &result)?;
    Ok(result.is_successful())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::MemoryBackend;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use url::Url;

    fn store() -> BlobDocumentStore<MemoryBackend> {
        let backend = MemoryBackend::new(Url::parse("memory://local/documents/").unwrap());
        BlobDocumentStore::new(Arc::new(backend), &StoreConfig::default())
    }

    async fn exec(store: &BlobDocumentStore<MemoryBackend>, command: Command) -> (bool, Value) {
        let mut out = Vec::new();
        let ok = execute(store, command, &mut out).await.unwrap();
        (ok, serde_json::from_slice(&out).unwrap())
    }

    #[tokio::test]
    async fn test_upload_list_download() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("in.pdf");
        std::fs::write(&source, b"%PDF-1.7").unwrap();
        let store = store();

        let (ok, upload) = exec(
            &store,
            Command::Upload {
                name: "in.pdf".into(),
                file: source,
            },
        )
        .await;
        assert!(ok);
        assert_eq!(upload["result"]["size"], 8);

        let (_, listing) = exec(&store, Command::List).await;
        assert_eq!(listing["result"].as_array().unwrap().len(), 1);

        let target = temp.path().join("out.pdf");
        let (ok, _) = exec(
            &store,
            Command::Download {
                name: "in.pdf".into(),
                out: target.clone(),
            },
        )
        .await;
        assert!(ok);
        assert_eq!(std::fs::read(target).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_reorder_unknown_document() {
        let store = store();
        let (ok, response) = exec(
            &store,
            Command::Reorder {
                placements: vec![Placement {
                    name: "missing.pdf".into(),
                    order: Some(1),
                }],
            },
        )
        .await;
        assert!(!ok);
        assert_eq!(response["error"]["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_reorder_applies_positions() {
        let store = store();
        store.upload("a.pdf", &b"a"[..]).await;
        store.upload("b.pdf", &b"b"[..]).await;

        let (ok, response) = exec(
            &store,
            Command::Reorder {
                placements: vec![
                    Placement {
                        name: "a.pdf".into(),
                        order: Some(2),
                    },
                    Placement {
                        name: "b.pdf".into(),
                        order: Some(1),
                    },
                ],
            },
        )
        .await;
        assert!(ok);
        assert_eq!(response["result"][0]["name"], "b.pdf");
        assert_eq!(response["result"][1]["order"], 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_unsuccessful() {
        let store = store();
        let (ok, response) = exec(
            &store,
            Command::Delete {
                name: "never.pdf".into(),
            },
        )
        .await;
        assert!(!ok);
        assert_eq!(response["successful"], false);
    }
}
