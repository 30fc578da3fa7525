//! Collaboration Scenario Tests
//!
//! End-to-end behaviour of the orchestrator over in-memory stores:
//! - Concurrent edits authored against the same version
//! - Citation conflicts reaching the document
//! - Permission policy
//! - No lost updates under concurrent submission
//! - Undo and crash roll-forward

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use citesync::collab::{
    CollabEvent, DeltaRecord, DeltaStore, DocumentStore, EngineConfig, InMemoryDeltaStore,
    InMemoryDocumentStore, MembershipPermissions, OpenAccess, Orchestrator, PermissionChecker,
    Role,
};
use citesync::ot::{CitationFields, MissedOrdering, Operation, OperationKind, Position};

const ALICE: &str = "6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b";
const BOB: &str = "7a2b3c4d-5e6f-4a70-9b8c-0d1e2f3a4b5c";
const CAROL: &str = "8b3c4d5e-6f7a-4b81-8c9d-1e2f3a4b5c6d";
const DOC: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";

struct Harness {
    documents: Arc<InMemoryDocumentStore>,
    deltas: Arc<InMemoryDeltaStore>,
    orchestrator: Arc<Orchestrator>,
}

fn harness_with(
    content: &str,
    version: u64,
    permissions: Arc<dyn PermissionChecker>,
    config: EngineConfig,
) -> Harness {
    let documents = Arc::new(InMemoryDocumentStore::new());
    documents.create_document(DOC, content, version).unwrap();
    let deltas = Arc::new(InMemoryDeltaStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        documents.clone(),
        deltas.clone(),
        permissions,
        config,
    ));
    Harness {
        documents,
        deltas,
        orchestrator,
    }
}

fn harness(content: &str, version: u64) -> Harness {
    harness_with(content, version, Arc::new(OpenAccess), EngineConfig::default())
}

fn at_secs(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap() + Duration::seconds(secs)
}

fn op(user: &str, version: u64, offset: i64, secs: i64, kind: OperationKind) -> Operation {
    Operation::new(user, DOC, version, Position::at(offset), kind).with_timestamp(at_secs(secs))
}

impl Harness {
    fn content(&self) -> String {
        self.documents.get_document(DOC).unwrap().content
    }

    fn version(&self) -> u64 {
        self.documents.get_document(DOC).unwrap().version
    }
}

// =============================================================================
// Concurrent Edit Scenarios
// =============================================================================

/// Scenario A: two inserts against version 1 both land, in order.
#[tokio::test]
async fn test_scenario_a_concurrent_inserts() {
    let h = harness("Hello", 1);

    let a = op(ALICE, 1, 5, 0, OperationKind::insert(" World"));
    let b = op(BOB, 1, 0, 1, OperationKind::insert("Say: "));

    let first = h.orchestrator.process_incoming_operation(a).await;
    assert!(first.success);
    assert_eq!(first.new_version, 2);
    assert_eq!(h.content(), "Hello World");

    let second = h.orchestrator.process_incoming_operation(b).await;
    assert!(second.success);
    assert_eq!(second.new_version, 3);
    assert_eq!(second.transformed_operation.unwrap().offset(), 0);
    assert_eq!(h.content(), "Say: Hello World");
    assert_eq!(h.version(), 3);
}

/// Scenario B: an insert authored before a delete is shifted back.
#[tokio::test]
async fn test_scenario_b_insert_after_delete() {
    let h = harness("Hello World", 1);

    h.orchestrator
        .process_incoming_operation(op(ALICE, 1, 0, 0, OperationKind::delete(5)))
        .await;
    assert_eq!(h.content(), " World");

    let result = h
        .orchestrator
        .process_incoming_operation(op(BOB, 1, 8, 1, OperationKind::insert("!")))
        .await;
    assert!(result.success);
    assert_eq!(result.transformed_operation.unwrap().offset(), 3);
    assert_eq!(h.content(), " Wo!rld");
}

/// Version ordering folds missed operations by persisted version.
#[tokio::test]
async fn test_version_ordering_config() {
    let config = EngineConfig {
        missed_ordering: MissedOrdering::Version,
        ..EngineConfig::default()
    };
    let h = harness_with("abcdefgh", 1, Arc::new(OpenAccess), config);

    // Applied in version order, but stamped in reverse
    h.orchestrator
        .process_incoming_operation(op(ALICE, 1, 0, 9, OperationKind::delete(4)))
        .await;
    h.orchestrator
        .process_incoming_operation(op(ALICE, 2, 2, 1, OperationKind::insert("XY")))
        .await;
    assert_eq!(h.content(), "efXYgh");

    let result = h
        .orchestrator
        .process_incoming_operation(op(BOB, 1, 6, 10, OperationKind::insert("!")))
        .await;
    // delete: 6 -> 2, then insert at 2: 2 -> 4
    assert_eq!(result.transformed_operation.unwrap().offset(), 4);
    assert_eq!(h.content(), "efXY!gh");
}

// =============================================================================
// Citation Scenarios
// =============================================================================

/// A stale citation delete loses to a newer update and leaves the text.
#[tokio::test]
async fn test_stale_citation_delete_is_voided() {
    let h = harness("Prior work .", 1);
    let citation = CitationFields::new("c1", "(Smith, 2020)", "r1");

    h.orchestrator
        .process_incoming_operation(op(
            ALICE,
            1,
            11,
            0,
            OperationKind::CitationInsert(citation.clone()),
        ))
        .await;
    h.orchestrator
        .process_incoming_operation(op(
            ALICE,
            2,
            11,
            10,
            OperationKind::CitationUpdate(CitationFields::new("c1", "(Smith, 2020)", "r7")),
        ))
        .await;

    let result = h
        .orchestrator
        .process_incoming_operation(op(BOB, 2, 11, 5, OperationKind::CitationDelete(citation)))
        .await;

    assert!(result.success);
    assert_eq!(result.conflicts, vec!["citation-updated".to_string()]);
    assert_eq!(result.new_version, 3);
    assert_eq!(h.content(), "Prior work (Smith, 2020).");
    assert_eq!(h.deltas.len(DOC), 2);
}

/// Deleting an already-deleted citation is acknowledged and does nothing.
#[tokio::test]
async fn test_double_citation_delete() {
    let h = harness("See (A, 2001) here", 1);
    let citation = CitationFields::new("c1", "(A, 2001)", "r1");

    let first = h
        .orchestrator
        .process_incoming_operation(op(
            ALICE,
            1,
            4,
            2,
            OperationKind::CitationDelete(citation.clone()),
        ))
        .await;
    assert!(first.success);
    assert_eq!(h.content(), "See  here");

    let second = h
        .orchestrator
        .process_incoming_operation(op(BOB, 1, 4, 1, OperationKind::CitationDelete(citation)))
        .await;
    assert!(second.success);
    assert!(second
        .conflicts
        .iter()
        .any(|c| c == "citation-deleted-by-other" || c == "operation-cancelled"));
    assert_eq!(h.content(), "See  here");
    assert_eq!(h.version(), 2);
}

// =============================================================================
// Permission Tests
// =============================================================================

/// Viewers may move their cursor but not edit; strangers may do nothing.
#[tokio::test]
async fn test_permission_policy() {
    let permissions = Arc::new(MembershipPermissions::new());
    permissions.grant(DOC, ALICE, Role::Owner).unwrap();
    permissions.grant(DOC, BOB, Role::Viewer).unwrap();
    let h = harness_with("text", 1, permissions, EngineConfig::default());

    let edit = h
        .orchestrator
        .process_incoming_operation(op(BOB, 1, 0, 0, OperationKind::insert("x")))
        .await;
    assert!(!edit.success);
    assert_eq!(edit.error.unwrap().code, "PERMISSION_DENIED");

    let cursor = h
        .orchestrator
        .process_incoming_operation(op(BOB, 1, 0, 0, OperationKind::cursor(Position::at(2))))
        .await;
    assert!(cursor.success);

    let stranger = h
        .orchestrator
        .process_incoming_operation(op(CAROL, 1, 0, 0, OperationKind::cursor(Position::at(2))))
        .await;
    assert_eq!(stranger.error.unwrap().code, "PERMISSION_DENIED");

    let owner = h
        .orchestrator
        .process_incoming_operation(op(ALICE, 2, 4, 0, OperationKind::insert("!")))
        .await;
    assert!(owner.success);
    assert_eq!(h.content(), "text!");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Many writers against the same stale version: every edit lands once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_lost_updates() {
    let h = harness("abc", 1);
    let writers = 16;

    let mut handles = Vec::new();
    for i in 0..writers {
        let orchestrator = Arc::clone(&h.orchestrator);
        handles.push(tokio::spawn(async move {
            let insert = op(ALICE, 1, 0, i, OperationKind::insert("x"));
            orchestrator.process_incoming_operation(insert).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    assert_eq!(h.version(), 1 + writers as u64);
    assert_eq!(h.content(), format!("{}abc", "x".repeat(writers as usize)));
    assert_eq!(h.deltas.len(DOC), writers as usize);

    let versions: Vec<u64> = h
        .deltas
        .list_deltas_after(DOC, 0)
        .unwrap()
        .iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(versions, (2..=1 + writers as u64).collect::<Vec<_>>());
}

/// Events arrive in order: confirmation, then broadcast.
#[tokio::test]
async fn test_event_stream() {
    let h = harness("Hello", 1);
    let mut events = h.orchestrator.subscribe();

    h.orchestrator
        .process_from_session(
            op(ALICE, 1, 5, 0, OperationKind::insert("!")),
            Some("tab-1".to_string()),
        )
        .await;

    assert!(matches!(
        events.recv().await.unwrap(),
        CollabEvent::OperationConfirmed { success: true, new_version: 2, .. }
    ));
    match events.recv().await.unwrap() {
        CollabEvent::OperationBroadcasted {
            operation,
            session_id,
            ..
        } => {
            assert_eq!(operation.kind, OperationKind::insert("!"));
            assert_eq!(session_id.as_deref(), Some("tab-1"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

// =============================================================================
// Undo and Recovery Tests
// =============================================================================

/// Undoing a citation delete re-inserts the removed citation text.
#[tokio::test]
async fn test_undo_citation_delete() {
    let h = harness("See (A, 2001) here", 1);
    let citation = CitationFields::new("c1", "(A, 2001)", "r1");

    h.orchestrator
        .process_incoming_operation(op(ALICE, 1, 4, 0, OperationKind::CitationDelete(citation)))
        .await;
    assert_eq!(h.content(), "See  here");

    let result = h.orchestrator.undo(DOC, 2, ALICE).await;
    assert!(result.success);
    assert_eq!(h.content(), "See (A, 2001) here");
    assert_eq!(h.version(), 3);
}

/// A committed delta whose document write was lost is replayed before the
/// next operation.
#[tokio::test]
async fn test_roll_forward_before_next_operation() {
    let h = harness("Hello", 1);
    h.deltas
        .append_delta(DeltaRecord {
            document_id: DOC.to_string(),
            version: 2,
            operation: op(ALICE, 2, 5, 0, OperationKind::insert(" World")),
            pre_image: None,
            applied_at: Utc::now(),
        })
        .unwrap();
    assert_eq!(h.content(), "Hello");

    let result = h
        .orchestrator
        .process_incoming_operation(op(BOB, 1, 0, 1, OperationKind::insert("Say: ")))
        .await;

    assert!(result.success);
    assert_eq!(result.new_version, 3);
    assert_eq!(h.content(), "Say: Hello World");
}
