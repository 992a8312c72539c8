//! Illustrative use of `ledger_core` by a downstream proof-construction
//! system: a minimal domain event set and a replay over `Ledger::scan`.
//!
//! This is demonstration code, not a product surface — it exists to show
//! how a caller wires its own event enum into the ledger's `Event` trait
//! and drives a streaming replay. It carries none of the projected-state,
//! taint-propagation, or challenge-status logic that a real consumer would
//! layer on top; it only shows the events such a system would record.

use ledger_core::{Event, Ledger, ScanFlow};
use serde::{Deserialize, Serialize};

/// A representative slice of the state transitions a proof-construction
/// system might record. Not exhaustive and not normative — real payloads
/// would carry considerably more structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ProofEvent {
    NodeCreated { node_id: String, parent_id: Option<String> },
    NodeClaimed { node_id: String, worker_id: String },
    NodeReleased { node_id: String, worker_id: String },
    ChallengeOpened { node_id: String, challenge_id: String },
    ChallengeResolved { challenge_id: String, accepted: bool },
    NodeValidated { node_id: String, valid: bool },
    NodeTainted { node_id: String, reason: String },
    ScopeOpened { scope_id: String },
    ScopeClosed { scope_id: String },
    LemmaExtracted { node_id: String, lemma_id: String },
}

impl Event for ProofEvent {
    fn event_type(&self) -> &str {
        match self {
            ProofEvent::NodeCreated { .. } => "NODE_CREATED",
            ProofEvent::NodeClaimed { .. } => "NODE_CLAIMED",
            ProofEvent::NodeReleased { .. } => "NODE_RELEASED",
            ProofEvent::ChallengeOpened { .. } => "CHALLENGE_OPENED",
            ProofEvent::ChallengeResolved { .. } => "CHALLENGE_RESOLVED",
            ProofEvent::NodeValidated { .. } => "NODE_VALIDATED",
            ProofEvent::NodeTainted { .. } => "NODE_TAINTED",
            ProofEvent::ScopeOpened { .. } => "SCOPE_OPENED",
            ProofEvent::ScopeClosed { .. } => "SCOPE_CLOSED",
            ProofEvent::LemmaExtracted { .. } => "LEMMA_EXTRACTED",
        }
    }
}

fn main() -> ledger_core::LedgerResult<()> {
    let dir = tempfile::tempdir().expect("create demo ledger directory");
    let ledger = Ledger::open(dir.path(), "proof-replay-demo")?;

    let scope_id = "scope-1".to_string();
    let node_id = "node-1".to_string();

    ledger.append(&ProofEvent::ScopeOpened {
        scope_id: scope_id.clone(),
    })?;
    ledger.append(&ProofEvent::NodeCreated {
        node_id: node_id.clone(),
        parent_id: None,
    })?;
    ledger.append(&ProofEvent::NodeClaimed {
        node_id: node_id.clone(),
        worker_id: "worker-a".to_string(),
    })?;
    ledger.append(&ProofEvent::NodeValidated {
        node_id: node_id.clone(),
        valid: true,
    })?;
    ledger.append(&ProofEvent::LemmaExtracted {
        node_id: node_id.clone(),
        lemma_id: "lemma-1".to_string(),
    })?;
    ledger.append(&ProofEvent::NodeReleased {
        node_id: node_id.clone(),
        worker_id: "worker-a".to_string(),
    })?;
    ledger.append(&ProofEvent::ScopeClosed { scope_id })?;

    println!("replaying {} events from {:?}", ledger.count()?, ledger.dir());

    ledger.scan(|seq, bytes| {
        let event: ProofEvent = serde_json::from_slice(bytes).map_err(ledger_core::LedgerError::from)?;
        println!("{seq:06}: {event:?}");
        Ok(ScanFlow::Continue)
    })?;

    Ok(())
}
