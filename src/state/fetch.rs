//! Fetch coordinator for remote record sources.
//!
//! Every fetch gets a freshly minted [`FetchToken`]. A response is applied
//! only if it carries the latest token; anything else is dropped without a
//! state change. There is no cancellation of in-flight calls: staleness is
//! decided purely by token comparison, whatever order responses arrive in.
//!
//! State machine:
//!
//! ```text
//! Idle | Error --begin--> Fetching
//! Fetching --complete(latest, Ok)--> Idle
//! Fetching --complete(latest, Err)--> Error
//! any --complete(stale, _)--> unchanged
//! ```

use crate::model::FetchError;
use crate::state::query::QueryState;
use std::fmt;
use tracing::{debug, warn};

/// Monotonic id of an issued fetch. The first token minted is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(u64);

impl FetchToken {
    /// Raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Loading status exposed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// No fetch outstanding.
    #[default]
    Idle,
    /// Waiting for the latest fetch.
    Fetching,
    /// Last fetch failed. Retrying is a user action.
    Error(FetchError),
}

/// A request the shell must execute against the record source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Token the response must be fed back with.
    pub token: FetchToken,
    /// Snapshot of the query the fetch was issued for.
    pub query: QueryState,
}

/// One page of records from a remote source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse<R> {
    /// Records on the requested page, in display order.
    pub records: Vec<R>,
    /// Count of all matching records, across pages.
    pub total: usize,
}

/// What became of a completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<R> {
    /// Latest response; apply it.
    Applied(FetchResponse<R>),
    /// Latest request failed; surface it.
    Failed(FetchError),
    /// Superseded by a newer request; ignore it.
    Discarded,
}

/// Token minting and stale-response rejection.
#[derive(Debug, Default)]
pub struct FetchCoordinator {
    last_minted: u64,
    status: FetchStatus,
}

impl FetchCoordinator {
    /// Idle coordinator; no token minted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current loading status.
    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// Whether the latest fetch is still outstanding.
    pub fn is_fetching(&self) -> bool {
        self.status == FetchStatus::Fetching
    }

    /// Most recently minted token, if any fetch was issued.
    pub fn latest(&self) -> Option<FetchToken> {
        (self.last_minted > 0).then_some(FetchToken(self.last_minted))
    }

    /// Mint a token for a new fetch and enter `Fetching`.
    ///
    /// Issuing while a fetch is in flight is allowed; the older one becomes
    /// stale.
    pub fn begin(&mut self) -> FetchToken {
        self.last_minted += 1;
        let token = FetchToken(self.last_minted);
        self.status = FetchStatus::Fetching;
        debug!(%token, "fetch issued");
        token
    }

    /// Feed a response (or failure) back in.
    pub fn complete<R>(
        &mut self,
        token: FetchToken,
        result: Result<FetchResponse<R>, FetchError>,
    ) -> FetchOutcome<R> {
        let is_latest = self.latest() == Some(token);
        if !is_latest || !self.is_fetching() {
            debug!(%token, latest = ?self.latest(), "stale fetch response discarded");
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(response) => {
                debug!(%token, rows = response.records.len(), total = response.total, "fetch applied");
                self.status = FetchStatus::Idle;
                FetchOutcome::Applied(response)
            }
            Err(err) => {
                warn!(%token, error = %err, "fetch failed");
                self.status = FetchStatus::Error(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }
}
