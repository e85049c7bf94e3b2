//! Commercial-paper registry contract.
//!
//! Four transactions: open the default market, create a paper, list papers
//! on a market at a discount, and read a market back. Numeric arguments
//! arrive as text and are validated before anything touches the ledger.

mod model;

pub use model::{parse_discount, CommercialPaper, Listing, Market, Maturity, Par};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::ledger::TransactionContext;
use crate::store::{self, Entity};

pub const DEFAULT_MARKET_ID: &str = "US_BLUE_ONE";

/// A named contract invocation, as the hosting framework delivers it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "function")]
pub enum ContractCall {
    Setup,
    #[serde(rename_all = "camelCase")]
    CreatePaper {
        cusip: String,
        maturity: String,
        par: String,
    },
    #[serde(rename_all = "camelCase")]
    ListOnMarket {
        market_id: String,
        discount: String,
        papers_to_list: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    RetrieveMarket { market_id: String },
}

impl ContractCall {
    /// Parses `(function, args)`. `ListOnMarket` takes its paper ids either
    /// as trailing arguments or as one JSON array argument.
    pub fn from_args(function: &str, args: &[String]) -> Result<Self> {
        let arity = |expected: &str| RegistryError::Arity {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: args.len(),
        };
        match function {
            "Setup" => match args {
                [] => Ok(ContractCall::Setup),
                _ => Err(arity("0")),
            },
            "CreatePaper" => match args {
                [cusip, maturity, par] => Ok(ContractCall::CreatePaper {
                    cusip: cusip.clone(),
                    maturity: maturity.clone(),
                    par: par.clone(),
                }),
                _ => Err(arity("3")),
            },
            "ListOnMarket" => match args {
                [market_id, discount, rest @ ..] => Ok(ContractCall::ListOnMarket {
                    market_id: market_id.clone(),
                    discount: discount.clone(),
                    papers_to_list: papers_from_args(rest),
                }),
                _ => Err(arity("at least 2")),
            },
            "RetrieveMarket" => match args {
                [market_id] => Ok(ContractCall::RetrieveMarket {
                    market_id: market_id.clone(),
                }),
                _ => Err(arity("1")),
            },
            other => Err(RegistryError::UnknownFunction(other.to_string())),
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            ContractCall::Setup => "Setup",
            ContractCall::CreatePaper { .. } => "CreatePaper",
            ContractCall::ListOnMarket { .. } => "ListOnMarket",
            ContractCall::RetrieveMarket { .. } => "RetrieveMarket",
        }
    }

    /// Read-only calls are evaluated rather than committed.
    pub fn is_query(&self) -> bool {
        matches!(self, ContractCall::RetrieveMarket { .. })
    }
}

fn papers_from_args(rest: &[String]) -> Vec<String> {
    if let [single] = rest {
        if let Ok(ids) = serde_json::from_str::<Vec<String>>(single) {
            return ids;
        }
    }
    rest.to_vec()
}

pub struct CommercialPaperContract;

impl CommercialPaperContract {
    pub fn new() -> Self {
        Self
    }

    pub fn invoke(&self, ctx: &mut TransactionContext<'_>, call: ContractCall) -> Result<Option<String>> {
        match call {
            ContractCall::Setup => self.setup(ctx).map(|_| None),
            ContractCall::CreatePaper {
                cusip,
                maturity,
                par,
            } => self.create_paper(ctx, &cusip, &maturity, &par).map(|_| None),
            ContractCall::ListOnMarket {
                market_id,
                discount,
                papers_to_list,
            } => self
                .list_on_market(ctx, &market_id, &discount, &papers_to_list)
                .map(|_| None),
            ContractCall::RetrieveMarket { market_id } => {
                self.retrieve_market(ctx, &market_id).map(Some)
            }
        }
    }

    /// Writes an empty default market, replacing whatever was there.
    pub fn setup(&self, ctx: &mut TransactionContext<'_>) -> Result<()> {
        let _entered = ctx.span().clone().entered();
        let key = store::derive_key(ctx, Market::OBJECT_TYPE, DEFAULT_MARKET_ID)?;
        let market = Market::open(DEFAULT_MARKET_ID);
        store::put(ctx, &key, &market)?;
        tracing::info!(market = DEFAULT_MARKET_ID, "market opened");
        Ok(())
    }

    /// Stores a new paper. An existing paper with the same CUSIP is
    /// overwritten.
    pub fn create_paper(
        &self,
        ctx: &mut TransactionContext<'_>,
        cusip: &str,
        maturity: &str,
        par: &str,
    ) -> Result<()> {
        let _entered = ctx.span().clone().entered();
        let maturity = Maturity::parse(maturity)?;
        let par = Par::parse(par)?;
        let key = store::derive_key(ctx, CommercialPaper::OBJECT_TYPE, cusip)?;
        let paper = CommercialPaper::issue(cusip, maturity, par);
        store::put(ctx, &key, &paper)?;
        tracing::info!(cusip, maturity = maturity.days(), par = par.value(), "paper created");
        Ok(())
    }

    /// Appends one listing per id, in order. The market is written once at
    /// the end, so a missing paper leaves it untouched.
    pub fn list_on_market<S: AsRef<str>>(
        &self,
        ctx: &mut TransactionContext<'_>,
        market_id: &str,
        discount: &str,
        papers_to_list: &[S],
    ) -> Result<()> {
        let _entered = ctx.span().clone().entered();
        let discount = parse_discount(discount)?;
        let mut market = store::get_market(ctx, market_id)?;
        for paper_id in papers_to_list {
            let paper_id = paper_id.as_ref();
            tracing::debug!(paper = paper_id, "listing paper");
            let paper = store::get_paper(ctx, paper_id)?;
            market.listed_papers.push(Listing::snapshot(&paper, discount));
        }
        let key = market.key().to_string();
        store::put(ctx, &key, &market).map_err(|err| match err {
            RegistryError::Write(source) => RegistryError::Update {
                market_id: market_id.to_string(),
                source,
            },
            other => other,
        })?;
        tracing::info!(
            market = market_id,
            added = papers_to_list.len(),
            total = market.listed_papers.len(),
            "papers listed"
        );
        Ok(())
    }

    /// Returns the stored market text as-is, without decoding it.
    pub fn retrieve_market(&self, ctx: &mut TransactionContext<'_>, market_id: &str) -> Result<String> {
        let _entered = ctx.span().clone().entered();
        let (_, bytes) = store::get(ctx, Market::OBJECT_TYPE, market_id)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Default for CommercialPaperContract {
    fn default() -> Self {
        Self::new()
    }
}
