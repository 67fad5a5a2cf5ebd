use crate::backend::BackendClient;
use crate::error::ClientError;
use crate::types::{HistoryRecord, StoredPlate};
use log::{debug, error};
use std::future::Future;
use std::mem;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PLATES_FAILED: &str = "Failed to load stored plates.";
pub const HISTORY_FAILED: &str = "Failed to load car history.";

/// A read-only listing fetched once when its page opens.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Loading,
    Failed(String),
    Empty,
    Loaded(Vec<T>),
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Listing::Loading
    }
}

impl<T> Listing<T> {
    pub fn from_result(result: Result<Vec<T>, ClientError>, failure: &str) -> Self {
        match result {
            Ok(items) if items.is_empty() => Listing::Empty,
            Ok(items) => Listing::Loaded(items),
            Err(e) => {
                error!("{} {}", failure, e);
                Listing::Failed(failure.to_string())
            }
        }
    }
}

enum Slot<T> {
    Closed,
    Fetching,
    Ready(Listing<T>),
}

/// Fetches a listing once per page visit without holding up the page.
///
/// The first view starts the fetch and shows `Loading`; the view reloads
/// until the result is in, shows it once, and the next visit fetches afresh.
pub struct ListingLoader<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Send + 'static> ListingLoader<T> {
    pub fn new() -> Self {
        ListingLoader {
            slot: Arc::new(Mutex::new(Slot::Closed)),
        }
    }

    pub async fn view<F>(&self, fetch: F) -> Listing<T>
    where
        F: Future<Output = Listing<T>> + Send + 'static,
    {
        let mut slot = self.slot.lock().await;
        match mem::replace(&mut *slot, Slot::Fetching) {
            Slot::Ready(listing) => {
                *slot = Slot::Closed;
                listing
            }
            Slot::Fetching => Listing::Loading,
            Slot::Closed => {
                debug!("Fetching listing");
                let shared = self.slot.clone();
                tokio::spawn(async move {
                    let listing = fetch.await;
                    *shared.lock().await = Slot::Ready(listing);
                });
                Listing::Loading
            }
        }
    }
}

impl<T: Send + 'static> Default for ListingLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn stored_plates(backend: &BackendClient) -> Listing<StoredPlate> {
    Listing::from_result(backend.stored_plates().await, PLATES_FAILED)
}

pub async fn history(backend: &BackendClient) -> Listing<HistoryRecord> {
    Listing::from_result(backend.history().await, HISTORY_FAILED)
}
