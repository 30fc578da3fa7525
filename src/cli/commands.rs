//! CLI command implementations
//!
//! Each command has a pure half returning data (used by tests) and a thin
//! half writing it to stdout.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::collab::{
    DocumentStore, EngineConfig, InMemoryDeltaStore, InMemoryDocumentStore, OpenAccess,
    Orchestrator,
};
use crate::ot::{invert_operation, resolve_conflicts_within, Operation, OperationResult};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_document, read_operations, write_line, write_response};

/// Final state of one replayed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub document_id: String,
    pub content: String,
    pub version: u64,
}

/// Everything a replay produced
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub results: Vec<OperationResult>,
    pub documents: Vec<DocumentState>,
}

/// Run a CLI command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Replay {
            document,
            ops,
            config,
            version,
        } => replay(&document, &ops, config.as_deref(), version),
        Command::Compose { ops, config } => compose(&ops, config.as_deref()),
        Command::Resolve { ops, config } => resolve(&ops, config.as_deref()),
        Command::Invert { ops } => invert(&ops),
    }
}

/// Load the config file if one was given, else defaults
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Replay operations from files, printing one result per line and then
/// the final document state.
pub fn replay(
    document_path: &Path,
    ops_path: &Path,
    config_path: Option<&Path>,
    version: u64,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let content = read_document(document_path)?;
    let ops = read_operations(ops_path)?;

    let report = replay_operations(&content, version, ops, config)?;
    for result in &report.results {
        write_line(result)?;
    }
    write_response(json!({ "documents": report.documents }))
}

/// Apply `ops` in order, each document referenced starting from `content`
/// at `version`. Permissions are open.
pub fn replay_operations(
    content: &str,
    version: u64,
    ops: Vec<Operation>,
    config: EngineConfig,
) -> CliResult<ReplayReport> {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let document_ids: BTreeSet<String> = ops.iter().map(|op| op.document_id.clone()).collect();
    for id in &document_ids {
        documents.create_document(id.clone(), content, version)?;
    }

    let orchestrator = Orchestrator::new(
        documents.clone(),
        Arc::new(InMemoryDeltaStore::new()),
        Arc::new(OpenAccess),
        config,
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::replay_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let results = rt.block_on(async {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            results.push(orchestrator.process_incoming_operation(op).await);
        }
        results
    });

    let documents = document_ids
        .into_iter()
        .map(|id| {
            let snapshot = documents.get_document(&id)?;
            Ok(DocumentState {
                document_id: id,
                content: snapshot.content,
                version: snapshot.version,
            })
        })
        .collect::<CliResult<Vec<_>>>()?;

    Ok(ReplayReport { results, documents })
}

/// Print the composed form of an operations file
pub fn compose(ops_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let ops = read_operations(ops_path)?;
    let composed = config.composer().compose(&ops);
    write_response(json!({ "operations": composed }))
}

/// Print the operations of a file that survive spatial conflict resolution
pub fn resolve(ops_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let ops = read_operations(ops_path)?;
    let survivors = resolve_conflicts_within(&ops, config.conflict_window);
    write_response(json!({ "operations": survivors }))
}

/// Print the inverse of every operation in a file
pub fn invert(ops_path: &Path) -> CliResult<()> {
    let ops = read_operations(ops_path)?;
    let inverses: Vec<Operation> = ops.iter().map(invert_operation).collect();
    write_response(json!({ "operations": inverses }))
}
