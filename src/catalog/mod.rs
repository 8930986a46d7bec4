//! Vehicle catalog queries
//!
//! Pure search, filter and sort operations over an immutable vehicle
//! snapshot. These are what the offload worker runs off the caller's thread.

mod ops;
mod query;
mod vehicle;

pub use ops::{filter, locale_cmp, search, sort};
pub use query::{FilterCriteria, MATCH_ALL, PriceRange, SortField, SortOrder, VehicleQuery};
pub use vehicle::Vehicle;

/// Run one query against a snapshot
pub fn execute(vehicles: &[Vehicle], query: &VehicleQuery) -> Vec<Vehicle> {
    match query {
        VehicleQuery::Search { query } => search(vehicles, query),
        VehicleQuery::Filter { criteria } => filter(vehicles, criteria),
        VehicleQuery::Sort { field, order } => sort(vehicles, *field, *order),
    }
}
