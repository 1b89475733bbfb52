// The handler-dispatch layer: registries mapping a field's kind, exact
// struct identity, or an ordered predicate onto handlers, plus the
// context-and-state machines driving deserialization and serialization.

pub mod de;
pub mod ser;

pub use de::{deserialize_from, setup_json_handlers, Deserializer};
pub use ser::{dump_json, serialize_into, setup_json_serialize_handlers, Serializer};

use pipe::Name;

/// Whether a predicate claims the current context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateResult {
    Process,
    Pass,
}

/// Key for aggregate-type handler registration: a specific struct by
/// identity, or the meta entry covering any struct root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructKey {
    Any,
    Exact(Name),
}

/// Context dispatch state. `Ready` marks a prepared top-level call;
/// nested handler re-entry runs `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxState {
    Uninitialized,
    Ready,
    InProgress,
    Ended,
}

pub(crate) fn amend_with_positions(reader: &dyn pipe::Reader, writer: &dyn pipe::Writer) {
    diag::amend_last_diag(|diag| {
        let reader_has_owner = diag.highlights().any(|h| h.owner == reader.id());
        if !reader_has_owner {
            reader.format_diagnostic(diag);
        }
        let writer_has_owner = diag.highlights().any(|h| h.owner == writer.id());
        if !writer_has_owner {
            writer.format_diagnostic(diag);
        }
    });
}
