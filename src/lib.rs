//! Commercial-paper registry.
//!
//! Papers and markets live in a key-value world state owned by a hosting
//! ledger. This crate derives their keys, encodes them as JSON, and
//! implements the contract transactions that read and rewrite them:
//!
//! * [`ledger`]: the world-state surface, composite keys, transaction
//!   context, and an in-memory reference ledger.
//! * [`store`]: typed get/put of entities by `(object type, id)`.
//! * [`contracts`]: the paper/market model and the registry contract.

pub mod contracts;
pub mod error;
pub mod ledger;
pub mod store;

pub use contracts::{
    CommercialPaper, CommercialPaperContract, ContractCall, Listing, Market, DEFAULT_MARKET_ID,
};
pub use error::{RegistryError, ValidationError};
pub use ledger::{MemoryLedger, TransactionContext, WorldState};
