//! Search, filter and sort over a vehicle snapshot
//!
//! Every operation borrows its input and returns a fresh vector; the
//! snapshot is never mutated.

use super::query::{FilterCriteria, MATCH_ALL, SortField, SortOrder};
use super::vehicle::Vehicle;
use std::cmp::Ordering;

/// Vehicles whose name, category, fuel type or any feature contains the
/// query, case-insensitively. A blank query matches everything.
pub fn search(vehicles: &[Vehicle], query: &str) -> Vec<Vehicle> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return vehicles.to_vec();
    }

    vehicles
        .iter()
        .filter(|v| {
            v.searchable_fields()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Vehicles satisfying every provided criterion
pub fn filter(vehicles: &[Vehicle], criteria: &FilterCriteria) -> Vec<Vehicle> {
    vehicles
        .iter()
        .filter(|v| matches_criteria(v, criteria))
        .cloned()
        .collect()
}

/// Stable sort by the given field; descending flips the comparison so
/// equal keys keep their input order either way
pub fn sort(vehicles: &[Vehicle], field: SortField, order: SortOrder) -> Vec<Vehicle> {
    let mut sorted = vehicles.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare_by(field, a, b);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
    sorted
}

fn matches_criteria(vehicle: &Vehicle, criteria: &FilterCriteria) -> bool {
    text_matches(criteria.category.as_deref(), Some(&vehicle.category))
        && text_matches(criteria.fuel_type.as_deref(), vehicle.fuel_type.as_deref())
        && text_matches(
            criteria.transmission.as_deref(),
            vehicle.transmission.as_deref(),
        )
        && criteria
            .price_range
            .is_none_or(|range| range.contains(vehicle.price))
}

fn text_matches(criterion: Option<&str>, value: Option<&str>) -> bool {
    match criterion {
        None => true,
        Some(c) if c.eq_ignore_ascii_case(MATCH_ALL) => true,
        Some(c) => value == Some(c),
    }
}

fn compare_by(field: SortField, a: &Vehicle, b: &Vehicle) -> Ordering {
    match field {
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::Popularity => a
            .popularity
            .unwrap_or(0.0)
            .total_cmp(&b.popularity.unwrap_or(0.0)),
        SortField::Name => locale_cmp(&a.name, &b.name),
        SortField::Category => locale_cmp(&a.category, &b.category),
    }
}

/// Collation-style comparison: letters compare case-insensitively first,
/// then lowercase sorts before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    fold(a).cmp(&fold(b)).then_with(|| {
        a.chars()
            .map(|c| (c.is_uppercase(), c))
            .cmp(b.chars().map(|c| (c.is_uppercase(), c)))
    })
}
