// ═══════════════════════════════════════════════════════════════════════════════
// event.rs — Event capability surface
// Governance Tier: LAW
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! The core never inspects event payloads beyond confirming they serialize to
//! well-formed JSON and carry a `type` discriminator for downstream decoding.
//! Concrete event schemas (node creation, claim/release, challenge lifecycle,
//! validation, taint, scope open/close, lemma extraction, …) are an external
//! collaborator's concern — see `SPEC_FULL.md` §1 and §10.5. This trait is the
//! entire seam the core depends on.

use serde::Serialize;

/// Capability an opaque value must provide to be appended to a ledger.
///
/// Implementors derive `Serialize` (for the encode side) and are expected to
/// also implement `serde::Deserialize` so collaborators can decode replayed
/// bytes back into a concrete type; the trait itself only requires the
/// encode side and the `type` discriminator, since that is all the core's
/// write path touches.
pub trait Event: Serialize {
    /// The string discriminator recorded in the serialized form, e.g.
    /// `"NODE_CREATED"`. Must be non-empty.
    fn event_type(&self) -> &str;
}
