//! Query types for search, filter and sort requests

use serde::{Deserialize, Serialize};

/// Criterion value that means "no constraint"
pub const MATCH_ALL: &str = "all";

/// Inclusive price range, `[min, max]` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check whether a price lies within the range, bounds included
    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl From<[f64; 2]> for PriceRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<PriceRange> for [f64; 2] {
    fn from(range: PriceRange) -> Self {
        [range.min, range.max]
    }
}

/// Filter criteria, all provided criteria must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(PriceRange::new(min, max));
        self
    }

    pub fn fuel_type(mut self, fuel_type: impl Into<String>) -> Self {
        self.fuel_type = Some(fuel_type.into());
        self
    }

    pub fn transmission(mut self, transmission: impl Into<String>) -> Self {
        self.transmission = Some(transmission.into());
        self
    }
}

/// Field a sort request orders by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Price,
    Name,
    Category,
    Popularity,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

/// A single catalog request; exactly one kind is processed
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleQuery {
    Search { query: String },
    Filter { criteria: FilterCriteria },
    Sort { field: SortField, order: SortOrder },
}

impl VehicleQuery {
    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
        }
    }

    pub fn filter(criteria: FilterCriteria) -> Self {
        Self::Filter { criteria }
    }

    pub fn sort(field: SortField, order: SortOrder) -> Self {
        Self::Sort { field, order }
    }
}
