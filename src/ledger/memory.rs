use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{LedgerError, LedgerKey, TransactionContext, WorldState};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("state root mismatch: snapshot says {expected}, entries hash to {actual}")]
    RootMismatch { expected: String, actual: String },
    #[error("duplicate key {0:?} in snapshot")]
    DuplicateKey(LedgerKey),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateEntry {
    #[serde(with = "hex_key")]
    pub key: LedgerKey,
    #[serde(with = "base64_value")]
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub height: u64,
    pub entries: Vec<StateEntry>,
    #[serde(with = "hex_root")]
    pub state_root: [u8; 32],
}

/// Reference ledger: committed world state plus a block height. Each
/// submitted transaction runs against a staged copy of its writes, which is
/// merged only when the transaction succeeds.
#[derive(Default)]
pub struct MemoryLedger {
    height: u64,
    state: BTreeMap<LedgerKey, Vec<u8>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(Vec::as_slice)
    }

    /// Runs `op` as a transaction. Its writes are committed and the height
    /// advances only if it returns `Ok`.
    pub fn submit<T, E>(
        &mut self,
        tx_id: &str,
        function: &str,
        op: impl FnOnce(&mut TransactionContext<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        let span = tracing::info_span!("tx", tx_id, function);
        let (outcome, writes) = self.execute(span.clone(), op);
        match outcome {
            Ok(value) => {
                let written = writes.len();
                self.state.extend(writes);
                self.height += 1;
                tracing::debug!(parent: &span, written, height = self.height, "committed");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(parent: &span, discarded = writes.len(), error = %err, "rolled back");
                Err(err)
            }
        }
    }

    /// Runs `op` as a query: any writes it makes are dropped.
    pub fn evaluate<T, E>(
        &self,
        tx_id: &str,
        function: &str,
        op: impl FnOnce(&mut TransactionContext<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let span = tracing::info_span!("query", tx_id, function);
        self.execute(span, op).0
    }

    fn execute<T, E>(
        &self,
        span: tracing::Span,
        op: impl FnOnce(&mut TransactionContext<'_>) -> Result<T, E>,
    ) -> (Result<T, E>, BTreeMap<LedgerKey, Vec<u8>>) {
        let mut staged = StagedState {
            committed: &self.state,
            writes: BTreeMap::new(),
        };
        let outcome = {
            let mut ctx = TransactionContext::new(&mut staged, span);
            op(&mut ctx)
        };
        (outcome, staged.writes)
    }

    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(&self.state)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            height: self.height,
            entries: self
                .state
                .iter()
                .map(|(key, value)| StateEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            state_root: self.state_root(),
        }
    }

    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, SnapshotError> {
        let mut state = BTreeMap::new();
        for entry in snapshot.entries {
            if state.contains_key(&entry.key) {
                return Err(SnapshotError::DuplicateKey(entry.key));
            }
            state.insert(entry.key, entry.value);
        }
        let actual = compute_state_root(&state);
        if actual != snapshot.state_root {
            return Err(SnapshotError::RootMismatch {
                expected: hex::encode(snapshot.state_root),
                actual: hex::encode(actual),
            });
        }
        Ok(Self {
            height: snapshot.height,
            state,
        })
    }
}

struct StagedState<'a> {
    committed: &'a BTreeMap<LedgerKey, Vec<u8>>,
    writes: BTreeMap<LedgerKey, Vec<u8>>,
}

impl WorldState for StagedState<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self
            .writes
            .get(key)
            .or_else(|| self.committed.get(key))
            .cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.writes.insert(key.to_string(), value);
        Ok(())
    }
}

fn compute_state_root(state: &BTreeMap<LedgerKey, Vec<u8>>) -> [u8; 32] {
    let leaves = state
        .iter()
        .map(|(key, value)| -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update(b"entry");
            hasher.update((key.len() as u64).to_le_bytes());
            hasher.update(key.as_bytes());
            hasher.update(value);
            hasher.finalize().into()
        })
        .collect();
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"paper-registry-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

// Composite keys carry U+0000, so they are stored hex-encoded.
mod hex_key {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value.as_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        String::from_utf8(bytes).map_err(D::Error::custom)
    }
}

mod base64_value {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&general_purpose::STANDARD.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(D::Error::custom)
    }
}

mod hex_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let mut root = [0u8; 32];
        hex::decode_to_slice(&encoded, &mut root).map_err(D::Error::custom)?;
        Ok(root)
    }
}
