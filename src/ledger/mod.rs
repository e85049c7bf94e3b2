//! World-state surface consumed by the registry.
//!
//! The hosting ledger owns persistence, ordering and consensus. The registry
//! only needs point reads, point writes and composite key construction, all
//! reached through a [`TransactionContext`] that the caller builds per
//! transaction.

mod memory;

pub use memory::{LedgerSnapshot, MemoryLedger, SnapshotError, StateEntry};

pub type LedgerKey = String;

const MIN_UNICODE_RUNE: char = '\u{0}';
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';
const COMPOSITE_KEY_NAMESPACE: &str = "\u{0}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("composite key attribute {attribute:?} contains reserved character U+{rune:04X}")]
    InvalidKeyAttribute { attribute: String, rune: u32 },
    #[error("read of key {key:?} failed: {reason}")]
    Read { key: LedgerKey, reason: String },
    #[error("write of key {key:?} failed: {reason}")]
    Write { key: LedgerKey, reason: String },
}

/// Key-value view of the ledger inside one transaction.
pub trait WorldState {
    /// `Ok(None)` when nothing is stored at `key`.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    fn create_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> Result<LedgerKey, LedgerError> {
        composite_key(object_type, attributes)
    }
}

/// Builds `\0<type>\0<attr>\0...`. Both the type and the attributes are
/// terminated by `U+0000`, so the mapping stays injective across types.
pub fn composite_key(object_type: &str, attributes: &[&str]) -> Result<LedgerKey, LedgerError> {
    validate_key_attribute(object_type)?;
    let mut key = String::with_capacity(
        COMPOSITE_KEY_NAMESPACE.len()
            + object_type.len()
            + 1
            + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push_str(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(MIN_UNICODE_RUNE);
    for attribute in attributes {
        validate_key_attribute(attribute)?;
        key.push_str(attribute);
        key.push(MIN_UNICODE_RUNE);
    }
    Ok(key)
}

fn validate_key_attribute(attribute: &str) -> Result<(), LedgerError> {
    match attribute
        .chars()
        .find(|c| *c == MIN_UNICODE_RUNE || *c == MAX_UNICODE_RUNE)
    {
        Some(rune) => Err(LedgerError::InvalidKeyAttribute {
            attribute: attribute.to_string(),
            rune: rune as u32,
        }),
        None => Ok(()),
    }
}

/// Everything one transaction may touch: the world state and the span its
/// log events belong to.
pub struct TransactionContext<'a> {
    stub: &'a mut dyn WorldState,
    span: tracing::Span,
}

impl<'a> TransactionContext<'a> {
    pub fn new(stub: &'a mut dyn WorldState, span: tracing::Span) -> Self {
        Self { stub, span }
    }

    pub fn stub(&self) -> &dyn WorldState {
        &*self.stub
    }

    pub fn stub_mut(&mut self) -> &mut dyn WorldState {
        &mut *self.stub
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}
