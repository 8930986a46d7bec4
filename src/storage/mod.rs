//! Persistent client-side storage

mod favorites;
mod local;

pub use favorites::FavoriteQueue;
pub use local::LocalStorage;
