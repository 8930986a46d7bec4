//! Offload message protocol
//!
//! Inbound: `{id?, type: SEARCH_VEHICLES|FILTER_VEHICLES|SORT_VEHICLES, payload}`.
//! Outbound: `{id?, type: SEARCH_RESULT|FILTER_RESULT|SORT_RESULT|ERROR, payload}`.
//! The optional `id` is echoed back so overlapping requests can be told apart.

use crate::catalog::{self, FilterCriteria, SortField, SortOrder, Vehicle, VehicleQuery};
use crate::utils::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Inbound message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    SearchVehicles,
    FilterVehicles,
    SortVehicles,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchVehicles => "SEARCH_VEHICLES",
            Self::FilterVehicles => "FILTER_VEHICLES",
            Self::SortVehicles => "SORT_VEHICLES",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SEARCH_VEHICLES" => Some(Self::SearchVehicles),
            "FILTER_VEHICLES" => Some(Self::FilterVehicles),
            "SORT_VEHICLES" => Some(Self::SortVehicles),
            _ => None,
        }
    }

    /// Response type a successful request of this kind produces
    pub fn result_type(&self) -> ResponseType {
        match self {
            Self::SearchVehicles => ResponseType::SearchResult,
            Self::FilterVehicles => ResponseType::FilterResult,
            Self::SortVehicles => ResponseType::SortResult,
        }
    }

    fn of(query: &VehicleQuery) -> Self {
        match query {
            VehicleQuery::Search { .. } => Self::SearchVehicles,
            VehicleQuery::Filter { .. } => Self::FilterVehicles,
            VehicleQuery::Sort { .. } => Self::SortVehicles,
        }
    }
}

/// Outbound message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    SearchResult,
    FilterResult,
    SortResult,
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchResult => "SEARCH_RESULT",
            Self::FilterResult => "FILTER_RESULT",
            Self::SortResult => "SORT_RESULT",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Vehicles(Vec<Vehicle>),
    Error { message: String },
}

/// Message posted back by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub msg_type: ResponseType,
    pub payload: ResponsePayload,
}

impl OutboundMessage {
    pub fn result(id: Option<u64>, msg_type: ResponseType, vehicles: Vec<Vehicle>) -> Self {
        Self {
            id,
            msg_type,
            payload: ResponsePayload::Vehicles(vehicles),
        }
    }

    pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            id,
            msg_type: ResponseType::Error,
            payload: ResponsePayload::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.msg_type == ResponseType::Error
    }

    /// Unwrap the result set, turning an ERROR response into an error
    pub fn into_result(self) -> Result<Vec<Vehicle>, ProtocolError> {
        let is_error = self.is_error();
        match self.payload {
            ResponsePayload::Vehicles(vehicles) if !is_error => Ok(vehicles),
            ResponsePayload::Error { message } => Err(ProtocolError::Worker(message)),
            ResponsePayload::Vehicles(_) => {
                Err(ProtocolError::Worker("ERROR response without message".into()))
            }
        }
    }

    /// Like [`Self::into_result`], but also rejects a result of the wrong
    /// kind for `request`
    pub fn into_result_for(self, request: RequestType) -> Result<Vec<Vehicle>, ProtocolError> {
        let expected = request.result_type();
        if !self.is_error() && self.msg_type != expected {
            return Err(ProtocolError::UnexpectedResponse {
                expected: expected.as_str().to_string(),
                received: self.msg_type.as_str().to_string(),
            });
        }
        self.into_result()
    }

    pub fn to_json(&self) -> Value {
        // Plain data with string keys; serialization cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Deserialize)]
struct SearchPayload {
    vehicles: Vec<Vehicle>,
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
struct FilterPayload {
    vehicles: Vec<Vehicle>,
    #[serde(default)]
    filters: FilterCriteria,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortPayload {
    vehicles: Vec<Vehicle>,
    sort_by: SortField,
    #[serde(default)]
    order: SortOrder,
}

/// A decoded offload request
#[derive(Debug, Clone, PartialEq)]
pub struct OffloadRequest {
    pub id: Option<u64>,
    pub vehicles: Vec<Vehicle>,
    pub query: VehicleQuery,
}

impl OffloadRequest {
    pub fn new(vehicles: Vec<Vehicle>, query: VehicleQuery) -> Self {
        Self {
            id: None,
            vehicles,
            query,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn request_type(&self) -> RequestType {
        RequestType::of(&self.query)
    }

    /// Decode a raw inbound message
    pub fn decode(message: &Value) -> Result<Self, ProtocolError> {
        let id = message.get("id").and_then(Value::as_u64);
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;
        let request_type =
            RequestType::parse(kind).ok_or_else(|| ProtocolError::UnknownType(kind.to_string()))?;
        let payload = message.get("payload").cloned().unwrap_or(Value::Null);
        let invalid = |e: serde_json::Error| ProtocolError::InvalidPayload {
            kind: kind.to_string(),
            reason: e.to_string(),
        };

        let (vehicles, query) = match request_type {
            RequestType::SearchVehicles => {
                let p: SearchPayload = serde_json::from_value(payload).map_err(invalid)?;
                (p.vehicles, VehicleQuery::Search { query: p.query })
            }
            RequestType::FilterVehicles => {
                let p: FilterPayload = serde_json::from_value(payload).map_err(invalid)?;
                (p.vehicles, VehicleQuery::Filter { criteria: p.filters })
            }
            RequestType::SortVehicles => {
                let p: SortPayload = serde_json::from_value(payload).map_err(invalid)?;
                (
                    p.vehicles,
                    VehicleQuery::Sort {
                        field: p.sort_by,
                        order: p.order,
                    },
                )
            }
        };

        Ok(Self {
            id,
            vehicles,
            query,
        })
    }

    /// Encode as a wire message
    pub fn to_message(&self) -> Value {
        let payload = match &self.query {
            VehicleQuery::Search { query } => json!({
                "vehicles": self.vehicles,
                "query": query,
            }),
            VehicleQuery::Filter { criteria } => json!({
                "vehicles": self.vehicles,
                "filters": criteria,
            }),
            VehicleQuery::Sort { field, order } => json!({
                "vehicles": self.vehicles,
                "sortBy": field,
                "order": order,
            }),
        };

        let mut message = json!({
            "type": self.request_type().as_str(),
            "payload": payload,
        });
        if let Some(id) = self.id {
            message["id"] = json!(id);
        }
        message
    }
}

/// Handle one inbound message. Never fails: every problem becomes an
/// ERROR response carrying a descriptive message.
pub fn handle_message(message: &Value) -> OutboundMessage {
    let id = message.get("id").and_then(Value::as_u64);
    match OffloadRequest::decode(message) {
        Ok(request) => {
            let results = catalog::execute(&request.vehicles, &request.query);
            log::debug!(
                "[offload] {} -> {} of {} vehicles",
                request.request_type().as_str(),
                results.len(),
                request.vehicles.len()
            );
            OutboundMessage::result(id, request.request_type().result_type(), results)
        }
        Err(e) => {
            log::warn!("[offload] rejected message: {}", e);
            OutboundMessage::error(id, e.to_string())
        }
    }
}
