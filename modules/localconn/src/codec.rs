//! Wire format for event tokens.
//!
//! A token is `origin:event:arg1,arg2,...`. A slot holds tokens joined by
//! `&`. There is no escaping: events must not contain `:` or `&`, args must
//! not contain `:`, `&` or `,`.

use localconn_store::slot::ENTRY_SEPARATOR;
use thiserror::Error;
use tracing::warn;

use crate::origin::OriginId;

pub const FIELD_SEPARATOR: char = ':';
pub const ARG_SEPARATOR: char = ',';

const RESERVED_IN_EVENT: &[char] = &[FIELD_SEPARATOR, '&'];
const RESERVED_IN_ARG: &[char] = &[FIELD_SEPARATOR, '&', ARG_SEPARATOR];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected 3 ':'-separated fields, found {found}")]
    FieldCount { found: usize },

    #[error("origin is not an integer: {0}")]
    InvalidOrigin(#[from] std::num::ParseIntError),

    #[error("{field} contains reserved character '{ch}'")]
    ReservedCharacter { field: &'static str, ch: char },
}

/// One `(origin, event, args)` record from a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventToken {
    pub origin: OriginId,
    pub event: String,
    pub args: Vec<String>,
}

impl EventToken {
    pub fn new(origin: OriginId, event: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            origin,
            event: event.into(),
            args,
        }
    }

    pub fn encode(&self) -> String {
        encode(self.origin, &self.event, &self.args)
    }
}

pub fn encode<A: AsRef<str>>(origin: OriginId, event: &str, args: &[A]) -> String {
    let joined = args
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",");
    format!("{origin}{FIELD_SEPARATOR}{event}{FIELD_SEPARATOR}{joined}")
}

/// Decode a single token. An empty args field decodes to no args. An empty
/// event name is valid and is delivered to callbacks registered under `""`.
pub fn decode_token(raw: &str) -> Result<EventToken, CodecError> {
    let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
    let [origin, event, args] = fields.as_slice() else {
        return Err(CodecError::FieldCount {
            found: fields.len(),
        });
    };

    let origin: OriginId = origin.parse()?;

    let args = if args.is_empty() {
        Vec::new()
    } else {
        args.split(ARG_SEPARATOR).map(str::to_string).collect()
    };

    Ok(EventToken {
        origin,
        event: event.to_string(),
        args,
    })
}

/// Split slot content into its raw entries, each paired with its decoding.
/// Empty entries (from an empty slot or stray separators) are skipped.
pub fn decode_entries(content: &str) -> impl Iterator<Item = (&str, Result<EventToken, CodecError>)> {
    content
        .split(ENTRY_SEPARATOR)
        .filter(|raw| !raw.is_empty())
        .map(|raw| (raw, decode_token(raw)))
}

/// Decode every well-formed token in slot content, in slot order.
/// Malformed entries are logged and skipped.
pub fn decode_batch(content: &str) -> Vec<EventToken> {
    decode_entries(content)
        .filter_map(|(raw, decoded)| match decoded {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(token = raw, error = %e, "Skipping malformed token");
                None
            }
        })
        .collect()
}

/// Check that an event name and args can travel without ambiguity.
pub fn check_reserved<A: AsRef<str>>(event: &str, args: &[A]) -> Result<(), CodecError> {
    if let Some(ch) = event.chars().find(|c| RESERVED_IN_EVENT.contains(c)) {
        return Err(CodecError::ReservedCharacter { field: "event", ch });
    }
    for arg in args {
        if let Some(ch) = arg.as_ref().chars().find(|c| RESERVED_IN_ARG.contains(c)) {
            return Err(CodecError::ReservedCharacter { field: "arg", ch });
        }
    }
    Ok(())
}
