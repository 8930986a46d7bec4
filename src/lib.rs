//! # Showroom - vehicle catalog offload and offline sync
//!
//! The non-visual machinery behind a vehicle showroom front end.
//!
//! ## Architecture
//!
//! Two independent components, sharing no state:
//!
//! - **offload**: runs catalog search/filter/sort on a dedicated worker
//!   thread behind a JSON message protocol with per-request ids
//! - **service_worker**: pre-caches the app shell into a versioned cache,
//!   answers requests cache-first and syncs the offline favorite queue
//!
//! Supporting modules:
//!
//! - **catalog**: vehicle records and the pure query operations
//! - **network**: request/response types and the `Fetcher` seam
//! - **storage**: local key/value storage and the favorite queue
//! - **platform**: optional host capabilities
//! - **config**: runtime settings
//! - **utils**: shared error types

pub mod catalog;
pub mod config;
pub mod network;
pub mod offload;
pub mod platform;
pub mod service_worker;
pub mod storage;
pub mod utils;

// Re-export main types for convenience
pub use catalog::{Vehicle, VehicleQuery};
pub use config::ShowroomConfig;
pub use offload::OffloadWorker;
pub use service_worker::ServiceWorker;
pub use utils::error::{Result, ShowroomError};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Showroom";
