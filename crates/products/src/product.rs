use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use pricebook_core::{DomainError, DomainResult, RecordId, ValidationErrors};

use crate::rules;

/// Product identifier (assigned by the store on insert).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub RecordId);

impl ProductId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<RecordId>().map(Self)
    }
}

/// The caller-supplied part of a product.
///
/// Every write (create or full-replace update) carries all of these; there is
/// no partial merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub promotion_percentage: Option<Decimal>,
}

impl ProductFields {
    /// Check every field constraint, collecting all failures.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        rules::check_title(&self.title, &mut errors);
        rules::check_description(&self.description, &mut errors);
        rules::check_price(self.price, &mut errors);
        rules::check_category(&self.category, &mut errors);
        rules::check_promotion_percentage(self.promotion_percentage, &mut errors);
        errors.into_result(())
    }

    /// Trim strings, validate, then bring decimals to the stored scale.
    pub fn into_valid(self) -> DomainResult<Self> {
        let fields = self.trimmed();
        fields.validate()?;
        Ok(fields.normalized())
    }

    /// Strip surrounding whitespace from the text fields.
    pub fn trimmed(self) -> Self {
        let trim = |s: String| if s.trim().len() == s.len() { s } else { s.trim().to_string() };
        Self {
            title: trim(self.title),
            description: trim(self.description),
            category: trim(self.category),
            ..self
        }
    }

    /// Round `price` and `promotion_percentage` to the stored scale.
    pub fn normalized(self) -> Self {
        let round = |d: Decimal| {
            d.round_dp_with_strategy(rules::STORED_SCALE, RoundingStrategy::MidpointAwayFromZero)
        };
        Self {
            price: round(self.price),
            promotion_percentage: self.promotion_percentage.map(round),
            ..self
        }
    }
}

/// A stored catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    fields: ProductFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// A freshly inserted record; both timestamps are `created_at`.
    pub fn new(id: ProductId, fields: ProductFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            created_at,
            updated_at: created_at,
        }
    }

    /// Rebuild a record loaded from storage.
    pub fn restore(
        id: ProductId,
        fields: ProductFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields,
            created_at,
            updated_at,
        }
    }

    /// Full replace: every caller-supplied field is overwritten.
    pub fn replace(&mut self, fields: ProductFields, updated_at: DateTime<Utc>) {
        self.fields = fields;
        self.updated_at = updated_at;
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn fields(&self) -> &ProductFields {
        &self.fields
    }

    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn description(&self) -> &str {
        &self.fields.description
    }

    pub fn price(&self) -> Decimal {
        self.fields.price
    }

    pub fn category(&self) -> &str {
        &self.fields.category
    }

    pub fn promotion_percentage(&self) -> Option<Decimal> {
        self.fields.promotion_percentage
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
