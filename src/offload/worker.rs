//! Offload worker thread
//!
//! One dedicated thread runs catalog queries. Callers talk to it only by
//! message passing. Raw JSON messages posted with
//! [`OffloadWorker::post_message`] are answered through
//! [`OffloadWorker::recv_message`], whatever `id` they carry. Typed calls made
//! with [`OffloadWorker::request`] travel under a private ticket that never
//! appears on the wire, so the two kinds of traffic cannot steal each
//! other's responses.

use super::protocol::{OffloadRequest, OutboundMessage, handle_message};
use crate::catalog::{Vehicle, VehicleQuery};
use crate::utils::Result;
use crate::utils::error::ProtocolError;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<OutboundMessage>>>>;

/// Inbound traffic to the worker thread
enum Envelope {
    /// Raw message; its response goes to the shared message queue
    Posted(Value),
    /// Typed call; its response goes to the waiter holding `ticket`
    Ticketed { ticket: u64, message: Value },
}

impl Envelope {
    fn message(&self) -> &Value {
        match self {
            Self::Posted(message) | Self::Ticketed { message, .. } => message,
        }
    }

    fn ticket(&self) -> Option<u64> {
        match self {
            Self::Posted(_) => None,
            Self::Ticketed { ticket, .. } => Some(*ticket),
        }
    }
}

/// Worker output on its way to the router
struct Routed {
    ticket: Option<u64>,
    response: OutboundMessage,
}

/// Handle to a running offload worker. Dropping it stops the worker.
pub struct OffloadWorker {
    inbound: Option<Sender<Envelope>>,
    messages: Mutex<Receiver<OutboundMessage>>,
    pending: PendingMap,
    next_ticket: AtomicU64,
    worker: Option<JoinHandle<()>>,
    router: Option<JoinHandle<()>>,
}

impl OffloadWorker {
    /// Start the worker and router threads
    pub fn spawn() -> Result<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel::<Envelope>();
        let (outbound_tx, outbound_rx) = mpsc::channel::<Routed>();
        let (messages_tx, messages_rx) = mpsc::channel::<OutboundMessage>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let worker = thread::Builder::new()
            .name("showroom-offload".into())
            .spawn(move || run_worker(inbound_rx, outbound_tx))?;

        let router_pending = Arc::clone(&pending);
        let router = thread::Builder::new()
            .name("showroom-offload-router".into())
            .spawn(move || run_router(outbound_rx, messages_tx, router_pending))?;

        log::info!("Offload worker started");

        Ok(Self {
            inbound: Some(inbound_tx),
            messages: Mutex::new(messages_rx),
            pending,
            next_ticket: AtomicU64::new(1),
            worker: Some(worker),
            router: Some(router),
        })
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        self.inbound
            .as_ref()
            .ok_or(ProtocolError::Disconnected)?
            .send(envelope)
            .map_err(|_| ProtocolError::Disconnected.into())
    }

    /// Post a raw message; the response arrives via [`Self::recv_message`]
    /// with the message's own `id` echoed back
    pub fn post_message(&self, message: Value) -> Result<()> {
        self.send(Envelope::Posted(message))
    }

    /// Receive a posted message's response (blocking)
    pub fn recv_message(&self) -> Result<OutboundMessage> {
        self.messages
            .lock()
            .map_err(|_| ProtocolError::Disconnected)?
            .recv()
            .map_err(|_| ProtocolError::Disconnected.into())
    }

    /// Receive a response, giving up after `timeout`
    pub fn recv_message_timeout(&self, timeout: Duration) -> Result<Option<OutboundMessage>> {
        let messages = self.messages.lock().map_err(|_| ProtocolError::Disconnected)?;
        match messages.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ProtocolError::Disconnected.into()),
        }
    }

    /// Try to receive a response (non-blocking). Returns `None` while
    /// another thread is blocked in a receive; that thread gets the next
    /// response.
    pub fn try_recv_message(&self) -> Option<OutboundMessage> {
        self.messages.try_lock().ok()?.try_recv().ok()
    }

    /// Run a query on the worker and await its result set.
    ///
    /// Any number of calls may be in flight at once, alongside raw posted
    /// messages. Dropping the future abandons the call; its late response is
    /// discarded.
    pub async fn request(&self, vehicles: Vec<Vehicle>, query: VehicleQuery) -> Result<Vec<Vehicle>> {
        let request = OffloadRequest::new(vehicles, query);
        let request_type = request.request_type();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ProtocolError::Disconnected)?
            .insert(ticket, tx);

        let envelope = Envelope::Ticketed {
            ticket,
            message: request.to_message(),
        };
        if let Err(e) = self.send(envelope) {
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&ticket);
            }
            return Err(e);
        }

        let response = rx.await.map_err(|_| ProtocolError::Disconnected)?;
        Ok(response.into_result_for(request_type)?)
    }

    /// Number of typed requests awaiting a response
    pub fn in_flight(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Drop for OffloadWorker {
    fn drop(&mut self) {
        // Closing the inbound channel ends the worker, which ends the router
        self.inbound.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if let Some(router) = self.router.take() {
            let _ = router.join();
        }
        log::info!("Offload worker stopped");
    }
}

fn run_worker(inbound: Receiver<Envelope>, outbound: Sender<Routed>) {
    while let Ok(envelope) = inbound.recv() {
        let message = envelope.message();
        let response = panic::catch_unwind(AssertUnwindSafe(|| handle_message(message)))
            .unwrap_or_else(|_| {
                let id = message.get("id").and_then(Value::as_u64);
                let kind = message.get("type").and_then(Value::as_str).unwrap_or("?");
                log::warn!("[offload] handler panicked on {}", kind);
                OutboundMessage::error(id, format!("Worker failed while handling {kind}"))
            });

        let routed = Routed {
            ticket: envelope.ticket(),
            response,
        };
        if outbound.send(routed).is_err() {
            break;
        }
    }
}

fn run_router(outbound: Receiver<Routed>, messages: Sender<OutboundMessage>, pending: PendingMap) {
    while let Ok(Routed { ticket, response }) = outbound.recv() {
        let Some(ticket) = ticket else {
            // Receiver lives as long as the worker handle
            let _ = messages.send(response);
            continue;
        };

        match pending.lock().ok().and_then(|mut p| p.remove(&ticket)) {
            Some(waiter) => {
                if waiter.send(response).is_err() {
                    log::debug!("[offload] caller went away, dropping response");
                }
            }
            None => log::debug!("[offload] no waiter for ticket {}", ticket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SortField, SortOrder};
    use crate::offload::protocol::ResponseType;
    use serde_json::json;
    use std::time::Instant;

    fn fleet() -> Vec<Vehicle> {
        vec![
            Vehicle::new("Camry", "sedan", 120000.0),
            Vehicle::new("Corolla", "sedan", 90000.0),
            Vehicle::new("Hilux", "pickup", 90000.0),
        ]
    }

    #[test]
    fn test_post_and_recv() {
        let worker = OffloadWorker::spawn().unwrap();
        worker
            .post_message(json!({"type": "SEARCH_VEHICLES", "payload": {"vehicles": fleet(), "query": "cam"}}))
            .unwrap();

        let response = worker.recv_message().unwrap();
        assert_eq!(response.msg_type, ResponseType::SearchResult);
        assert_eq!(response.into_result().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_type_does_not_kill_worker() {
        let worker = OffloadWorker::spawn().unwrap();
        worker.post_message(json!({"type": "EXPLODE"})).unwrap();
        let response = worker.recv_message().unwrap();
        assert!(response.is_error());

        worker
            .post_message(json!({"type": "SEARCH_VEHICLES", "payload": {"vehicles": [], "query": ""}}))
            .unwrap();
        let response = worker.recv_message().unwrap();
        assert_eq!(response.msg_type, ResponseType::SearchResult);
    }

    #[test]
    fn test_try_recv_empty() {
        let worker = OffloadWorker::spawn().unwrap();
        assert!(worker.try_recv_message().is_none());
        let waited = worker
            .recv_message_timeout(Duration::from_millis(10))
            .unwrap();
        assert!(waited.is_none());
    }

    #[tokio::test]
    async fn test_request_sort() {
        let worker = OffloadWorker::spawn().unwrap();
        let sorted = worker
            .request(fleet(), VehicleQuery::sort(SortField::Price, SortOrder::Ascending))
            .await
            .unwrap();
        let names: Vec<_> = sorted.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Corolla", "Hilux", "Camry"]);
        assert_eq!(worker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_requests_do_not_cross() {
        let worker = OffloadWorker::spawn().unwrap();
        let (a, b, c) = tokio::join!(
            worker.request(fleet(), VehicleQuery::search("camry")),
            worker.request(fleet(), VehicleQuery::search("hilux")),
            worker.request(fleet(), VehicleQuery::search("")),
        );
        assert_eq!(a.unwrap()[0].name, "Camry");
        assert_eq!(b.unwrap()[0].name, "Hilux");
        assert_eq!(c.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_posted_id_does_not_capture_typed_response() {
        let worker = OffloadWorker::spawn().unwrap();
        let crowd: Vec<_> = (0..20_000)
            .map(|i| Vehicle::new(format!("car{i}"), "sedan", i as f64))
            .collect();

        // Same id the first typed request would have used before tickets
        worker
            .post_message(json!({
                "id": 1,
                "type": "SEARCH_VEHICLES",
                "payload": {"vehicles": crowd, "query": "car19999"}
            }))
            .unwrap();

        let sorted = worker
            .request(fleet(), VehicleQuery::sort(SortField::Price, SortOrder::Ascending))
            .await
            .unwrap();
        let names: Vec<_> = sorted.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Corolla", "Hilux", "Camry"]);

        let posted = worker
            .recv_message_timeout(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert_eq!(posted.id, Some(1));
        assert_eq!(posted.msg_type, ResponseType::SearchResult);
        assert_eq!(posted.into_result().unwrap()[0].name, "car19999");
        assert!(worker.try_recv_message().is_none());
    }

    #[test]
    fn test_try_recv_does_not_wait_for_blocked_receiver() {
        let worker = OffloadWorker::spawn().unwrap();
        thread::scope(|s| {
            let blocked = s.spawn(|| worker.recv_message_timeout(Duration::from_millis(800)));
            thread::sleep(Duration::from_millis(100));

            let started = Instant::now();
            assert!(worker.try_recv_message().is_none());
            assert!(started.elapsed() < Duration::from_millis(300));

            assert!(blocked.join().unwrap().unwrap().is_none());
        });
    }
}
