//! Typed access to the world state, addressed by `(object type, id)`.
//!
//! Nothing is cached between calls: every read goes back to the ledger so
//! an operation always sees the state committed when it runs.

pub mod codec;

use serde::{de::DeserializeOwned, Serialize};

use crate::contracts::{CommercialPaper, Market};
use crate::error::{RegistryError, Result};
use crate::ledger::{LedgerKey, TransactionContext};

/// A record stored under its own composite key.
pub trait Entity: Serialize + DeserializeOwned {
    const OBJECT_TYPE: &'static str;

    fn id(&self) -> &str;

    /// Addressing key; not part of the payload.
    fn key(&self) -> &str;

    fn set_key(&mut self, key: LedgerKey);
}

pub fn derive_key(
    ctx: &TransactionContext<'_>,
    object_type: &str,
    asset_id: &str,
) -> Result<LedgerKey> {
    ctx.stub()
        .create_composite_key(object_type, &[asset_id])
        .map_err(|source| RegistryError::KeyGeneration {
            object_type: object_type.to_string(),
            id: asset_id.to_string(),
            source,
        })
}

/// Raw lookup. Absence and a failed read are reported separately.
pub fn get(
    ctx: &TransactionContext<'_>,
    object_type: &str,
    id: &str,
) -> Result<(LedgerKey, Vec<u8>)> {
    let key = derive_key(ctx, object_type, id)?;
    match ctx.stub().get_state(&key).map_err(RegistryError::Read)? {
        Some(bytes) => Ok((key, bytes)),
        None => Err(RegistryError::NotFound {
            object_type: object_type.to_string(),
            id: id.to_string(),
        }),
    }
}

pub fn get_entity<E: Entity>(ctx: &TransactionContext<'_>, id: &str) -> Result<E> {
    let (key, bytes) = get(ctx, E::OBJECT_TYPE, id)?;
    let mut entity: E = codec::decode(&bytes, E::OBJECT_TYPE)?;
    entity.set_key(key);
    Ok(entity)
}

pub fn get_market(ctx: &TransactionContext<'_>, id: &str) -> Result<Market> {
    get_entity(ctx, id)
}

pub fn get_paper(ctx: &TransactionContext<'_>, id: &str) -> Result<CommercialPaper> {
    get_entity(ctx, id)
}

pub fn put<E: Entity>(ctx: &mut TransactionContext<'_>, key: &str, entity: &E) -> Result<()> {
    let bytes = codec::encode(entity, E::OBJECT_TYPE)?;
    ctx.stub_mut()
        .put_state(key, bytes)
        .map_err(RegistryError::Write)?;
    tracing::debug!(object_type = E::OBJECT_TYPE, id = entity.id(), "stored");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use crate::ledger::{LedgerError, WorldState};

    /// World state that can be told to fail reads or writes.
    #[derive(Default)]
    pub struct FaultyState {
        pub entries: BTreeMap<String, Vec<u8>>,
        pub fail_reads: bool,
        pub fail_writes: bool,
    }

    impl WorldState for FaultyState {
        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            if self.fail_reads {
                return Err(LedgerError::Read {
                    key: key.to_string(),
                    reason: "peer unavailable".into(),
                });
            }
            Ok(self.entries.get(key).cloned())
        }

        fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
            if self.fail_writes {
                return Err(LedgerError::Write {
                    key: key.to_string(),
                    reason: "endorsement failed".into(),
                });
            }
            self.entries.insert(key.to_string(), value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FaultyState;
    use super::*;
    use crate::ledger::{LedgerError, MemoryLedger};

    fn ctx(state: &mut FaultyState) -> TransactionContext<'_> {
        TransactionContext::new(state, tracing::Span::none())
    }

    #[test]
    fn missing_entry_is_not_found() {
        let mut state = FaultyState::default();
        let err = get(&ctx(&mut state), "paper", "P1").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failed_read_is_distinct_from_absence() {
        let mut state = FaultyState {
            fail_reads: true,
            ..Default::default()
        };
        let err = get(&ctx(&mut state), "paper", "P1").unwrap_err();
        assert!(matches!(err, RegistryError::Read(LedgerError::Read { .. })));
    }

    #[test]
    fn invalid_identifier_fails_key_generation() {
        let mut state = FaultyState::default();
        let err = get(&ctx(&mut state), "paper", "P\u{0}1").unwrap_err();
        assert!(matches!(err, RegistryError::KeyGeneration { .. }));
    }

    #[test]
    fn put_then_get_attaches_the_derived_key() {
        let mut ledger = MemoryLedger::new();
        let paper = ledger
            .submit("tx-1", "test", |ctx| {
                let key = derive_key(ctx, "paper", "P1")?;
                put(ctx, &key, &CommercialPaper::new("P1", 90, 1_000)?)?;
                get_paper(ctx, "P1")
            })
            .unwrap();
        assert_eq!(paper.key(), "\u{0}paper\u{0}P1\u{0}");
        assert_eq!(paper.maturity.days(), 90);
        assert_eq!(paper.par.value(), 1_000);
    }

    #[test]
    fn failed_write_is_reported() {
        let mut state = FaultyState {
            fail_writes: true,
            ..Default::default()
        };
        let mut ctx = ctx(&mut state);
        let market = Market::open("M1");
        let err = put(&mut ctx, "k", &market).unwrap_err();
        assert!(matches!(err, RegistryError::Write(LedgerError::Write { .. })));
    }

    #[test]
    fn undecodable_market_is_a_deserialization_error() {
        let mut ledger = MemoryLedger::new();
        let err = ledger
            .submit("tx-1", "test", |ctx| {
                let key = derive_key(ctx, "market", "M1")?;
                ctx.stub_mut()
                    .put_state(&key, b"[]".to_vec())
                    .map_err(RegistryError::Write)?;
                get_market(ctx, "M1")
            })
            .unwrap_err();
        match err {
            RegistryError::Deserialization { shape, payload, .. } => {
                assert_eq!(shape, "market");
                assert_eq!(payload, "[]");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
