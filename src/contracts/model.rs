use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ledger::LedgerKey;
use crate::store::Entity;

/// Days to maturity, `1..=364`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Maturity(u16);

impl Maturity {
    pub const MIN_DAYS: i64 = 1;
    pub const MAX_DAYS: i64 = 364;

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let days: i64 = text
            .parse()
            .map_err(|_| ValidationError::MaturityNotInteger(text.to_string()))?;
        Self::try_from(days)
    }

    pub fn days(self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for Maturity {
    type Error = ValidationError;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        if !(Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            return Err(ValidationError::MaturityOutOfRange(days));
        }
        Ok(Self(days as u16))
    }
}

impl From<Maturity> for i64 {
    fn from(maturity: Maturity) -> Self {
        maturity.0 as i64
    }
}

/// Face value, at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Par(i64);

impl Par {
    pub const MIN: i64 = 1;

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let value: i64 = text
            .parse()
            .map_err(|_| ValidationError::ParNotInteger(text.to_string()))?;
        Self::try_from(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Par {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < Self::MIN {
            return Err(ValidationError::ParOutOfRange(value));
        }
        Ok(Self(value))
    }
}

impl From<Par> for i64 {
    fn from(par: Par) -> Self {
        par.0
    }
}

pub fn parse_discount(text: &str) -> Result<i64, ValidationError> {
    text.parse()
        .map_err(|_| ValidationError::DiscountNotInteger(text.to_string()))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommercialPaper {
    #[serde(skip)]
    key: LedgerKey,
    pub id: String,
    pub maturity: Maturity,
    pub par: Par,
}

impl CommercialPaper {
    pub fn new(id: &str, maturity: i64, par: i64) -> Result<Self, ValidationError> {
        Ok(Self::issue(
            id,
            Maturity::try_from(maturity)?,
            Par::try_from(par)?,
        ))
    }

    pub fn issue(id: &str, maturity: Maturity, par: Par) -> Self {
        Self {
            key: LedgerKey::new(),
            id: id.to_string(),
            maturity,
            par,
        }
    }
}

// The key only addresses storage; two snapshots of the same paper are equal
// whether or not one of them was loaded with its key.
impl PartialEq for CommercialPaper {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.maturity == other.maturity && self.par == other.par
    }
}

impl Eq for CommercialPaper {}

impl Entity for CommercialPaper {
    const OBJECT_TYPE: &'static str = "paper";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: LedgerKey) {
        self.key = key;
    }
}

/// A paper copied into a market at listing time, with its discount.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub paper: CommercialPaper,
    pub discount: i64,
}

impl Listing {
    pub fn snapshot(paper: &CommercialPaper, discount: i64) -> Self {
        Self {
            paper: paper.clone(),
            discount,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    #[serde(skip)]
    key: LedgerKey,
    pub id: String,
    pub name: String,
    /// Append-only, in listing order.
    pub listed_papers: Vec<Listing>,
}

impl Market {
    pub fn open(id: &str) -> Self {
        Self {
            key: LedgerKey::new(),
            id: id.to_string(),
            name: format!("{id} trading"),
            listed_papers: Vec::new(),
        }
    }
}

impl Entity for Market {
    const OBJECT_TYPE: &'static str = "market";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: LedgerKey) {
        self.key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maturity_bounds_are_inclusive() {
        assert_eq!(Maturity::parse("1").unwrap().days(), 1);
        assert_eq!(Maturity::parse("364").unwrap().days(), 364);
        assert_eq!(
            Maturity::parse("0"),
            Err(ValidationError::MaturityOutOfRange(0))
        );
        assert_eq!(
            Maturity::parse("365"),
            Err(ValidationError::MaturityOutOfRange(365))
        );
    }

    #[test]
    fn non_integer_text_is_rejected() {
        assert_eq!(
            Maturity::parse("30 "),
            Err(ValidationError::MaturityNotInteger("30 ".into()))
        );
        assert_eq!(
            Par::parse("1e3"),
            Err(ValidationError::ParNotInteger("1e3".into()))
        );
        assert_eq!(
            parse_discount("five"),
            Err(ValidationError::DiscountNotInteger("five".into()))
        );
    }

    #[test]
    fn par_accepts_one_and_rejects_below() {
        assert_eq!(Par::parse("1").unwrap().value(), 1);
        assert_eq!(Par::parse("0"), Err(ValidationError::ParOutOfRange(0)));
        assert_eq!(Par::parse("-7"), Err(ValidationError::ParOutOfRange(-7)));
    }

    #[test]
    fn discount_has_no_range() {
        assert_eq!(parse_discount("-3"), Ok(-3));
        assert_eq!(parse_discount("+12"), Ok(12));
    }

    #[test]
    fn paper_equality_ignores_key() {
        let mut loaded = CommercialPaper::new("P1", 30, 100).unwrap();
        loaded.set_key("\u{0}paper\u{0}P1\u{0}".into());
        assert_eq!(loaded, CommercialPaper::new("P1", 30, 100).unwrap());
        assert_ne!(loaded, CommercialPaper::new("P1", 31, 100).unwrap());
    }

    #[test]
    fn listing_is_a_copy() {
        let mut paper = CommercialPaper::new("P1", 30, 100).unwrap();
        let listing = Listing::snapshot(&paper, 5);
        paper.par = Par::try_from(200i64).unwrap();
        assert_eq!(listing.paper.par.value(), 100);
    }
}
