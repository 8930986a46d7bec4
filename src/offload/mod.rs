//! Search/filter/sort offload
//!
//! Runs catalog queries on a dedicated thread behind a message-passing
//! boundary so the calling thread stays responsive.

mod protocol;
mod worker;

pub use protocol::{
    OffloadRequest, OutboundMessage, RequestType, ResponsePayload, ResponseType, handle_message,
};
pub use worker::OffloadWorker;
