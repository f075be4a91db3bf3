use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::fetch::error::FetchError;
use crate::fetch::request::OptionRequest;
use crate::fetch::transport::OptionTransport;

/// A finished request, tagged with the slot and ticket it was issued for.
#[derive(Debug)]
pub struct FetchOutcome {
    pub slot: usize,
    pub ticket: u64,
    pub request: OptionRequest,
    pub result: Result<Value, FetchError>,
}

/// Fire-and-forget option requests.
///
/// Each request runs on its own worker thread; outcomes come back over a
/// channel and are picked up by the owner with `try_next`/`next_timeout`.
/// Every slot remembers the ticket of its latest request so older responses
/// can be recognised and dropped.
pub struct OptionFetcher {
    transport: Arc<dyn OptionTransport>,
    sender: Sender<FetchOutcome>,
    receiver: Receiver<FetchOutcome>,
    latest: HashMap<usize, u64>,
    next_ticket: u64,
    in_flight: usize,
}

impl OptionFetcher {
    pub fn new(transport: Arc<dyn OptionTransport>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            transport,
            sender,
            receiver,
            latest: HashMap::new(),
            next_ticket: 0,
            in_flight: 0,
        }
    }

    pub fn dispatch(&mut self, slot: usize, request: OptionRequest) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.latest.insert(slot, ticket);
        self.in_flight += 1;

        debug!(field = %request.field, url = %request.full_url(), ticket, "dispatching option request");

        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();
        thread::spawn(move || {
            let result = transport.get(&request);
            // The receiver is gone once the form is dropped.
            let _ = sender.send(FetchOutcome {
                slot,
                ticket,
                request,
                result,
            });
        });

        ticket
    }

    pub fn try_next(&mut self) -> Option<FetchOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(outcome)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<FetchOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(in_flight = self.in_flight, "timed out waiting for option responses");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Whether `outcome` answers the latest request issued for its slot.
    pub fn is_current(&self, outcome: &FetchOutcome) -> bool {
        self.latest.get(&outcome.slot) == Some(&outcome.ticket)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Make the outstanding request for `slot`, if any, stale.
    pub fn cancel(&mut self, slot: usize) {
        self.latest.remove(&slot);
    }

    /// Make every outstanding request stale.
    pub fn cancel_all(&mut self) {
        self.latest.clear();
    }
}
