//! Vehicle record as exchanged with the front end

use serde::{Deserialize, Serialize};

/// A catalog vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Model name, e.g. "Corolla"
    pub name: String,
    /// Body category, e.g. "sedan"
    pub category: String,
    /// List price
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    /// Popularity score, missing means zero when sorting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Vehicle {
    /// Create a vehicle with only the required fields set
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price,
            fuel_type: None,
            transmission: None,
            popularity: None,
            features: Vec::new(),
        }
    }

    pub fn with_fuel_type(mut self, fuel_type: impl Into<String>) -> Self {
        self.fuel_type = Some(fuel_type.into());
        self
    }

    pub fn with_transmission(mut self, transmission: impl Into<String>) -> Self {
        self.transmission = Some(transmission.into());
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = Some(popularity);
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Text fields a search query is matched against
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        [self.name.as_str(), self.category.as_str()]
            .into_iter()
            .chain(self.fuel_type.as_deref())
            .chain(self.features.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_shape() {
        let json = r#"{
            "name": "Land Cruiser",
            "category": "suv",
            "price": 250000,
            "fuelType": "diesel",
            "features": ["4x4", "Sunroof"]
        }"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.name, "Land Cruiser");
        assert_eq!(vehicle.fuel_type.as_deref(), Some("diesel"));
        assert_eq!(vehicle.transmission, None);
        assert_eq!(vehicle.popularity, None);
        assert_eq!(vehicle.features.len(), 2);
    }

    #[test]
    fn test_serialize_omits_missing_optionals() {
        let vehicle = Vehicle::new("Yaris", "hatchback", 65000.0);
        let json = serde_json::to_value(&vehicle).unwrap();
        assert!(json.get("fuelType").is_none());
        assert!(json.get("features").is_none());
        assert_eq!(json["price"], 65000.0);
    }

    #[test]
    fn test_searchable_fields() {
        let vehicle = Vehicle::new("Prius", "sedan", 110000.0)
            .with_fuel_type("hybrid")
            .with_transmission("cvt")
            .with_feature("Lane assist");
        let fields: Vec<_> = vehicle.searchable_fields().collect();
        assert_eq!(fields, vec!["Prius", "sedan", "hybrid", "Lane assist"]);
    }
}
