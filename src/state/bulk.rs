//! Bulk action gateway: delete and export against the current selection.
//!
//! Actions are split in two phases so the network call can happen anywhere:
//! `begin_*` validates and hands out a ticket, `finish_*` consumes the ticket
//! together with the backend's answer. While a ticket is outstanding every
//! other bulk action is refused, which is what disables the triggering
//! button in the UI.

use crate::model::{BulkAction, BulkError, ExportFailure, FetchError, ValidationError};
use crate::state::selection::SelectionSet;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::{info, warn};

/// Minimum justification length, in characters, unless configured otherwise.
pub const DEFAULT_MIN_JUSTIFICATION_LEN: usize = 10;

// ===== Capabilities =====

/// What the current user may do, supplied by the caller rather than looked up
/// from session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// May bulk delete.
    pub can_delete: bool,
    /// May bulk export.
    pub can_export: bool,
}

impl Capabilities {
    /// Every bulk action allowed.
    pub fn all() -> Self {
        Self {
            can_delete: true,
            can_export: true,
        }
    }

    /// No bulk action allowed.
    pub fn read_only() -> Self {
        Self {
            can_delete: false,
            can_export: false,
        }
    }

    fn allows(&self, action: BulkAction) -> bool {
        match action {
            BulkAction::Delete => self.can_delete,
            BulkAction::Export => self.can_export,
        }
    }
}

// ===== ExportJustification =====

/// Mandatory reason attached to an export's audit record.
/// Smart constructor enforces the minimum length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJustification(String);

impl ExportJustification {
    /// Validate `text` against `min_len`, counted in characters after
    /// trimming surrounding whitespace. The trimmed text is kept.
    pub fn new(text: impl AsRef<str>, min_len: usize) -> Result<Self, ValidationError> {
        let trimmed = text.as_ref().trim();
        let actual = trimmed.chars().count();
        if actual < min_len {
            return Err(ValidationError::JustificationTooShort {
                min: min_len,
                actual,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The trimmed text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Only true for a zero minimum and blank input.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ===== Delete =====

/// Backend answer to a batched delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome<Id> {
    /// Ids the backend deleted.
    pub succeeded: Vec<Id>,
    /// Ids the backend refused or could not delete.
    pub failed: Vec<Id>,
}

/// Result of a delete as applied to the controller.
///
/// A partial failure is still a report: the succeeded subset is removed and
/// never rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport<Id> {
    /// Ids removed from the source and the selection.
    pub removed: Vec<Id>,
    /// Ids the backend did not delete. They stay selected.
    pub failed: Vec<Id>,
}

impl<Id> DeleteReport<Id> {
    /// Some ids were removed and some failed.
    pub fn is_partial(&self) -> bool {
        !self.removed.is_empty() && !self.failed.is_empty()
    }

    /// Nothing failed.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outstanding delete.
#[derive(Debug, PartialEq, Eq)]
pub struct DeleteTicket<Id> {
    seq: u64,
    ids: Vec<Id>,
}

impl<Id> DeleteTicket<Id> {
    /// Ids to send to the backend, in ascending order.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }
}

// ===== Export =====

/// Outstanding export.
#[derive(Debug, PartialEq, Eq)]
pub struct ExportTicket<Id> {
    seq: u64,
    ids: Vec<Id>,
    justification: ExportJustification,
}

impl<Id> ExportTicket<Id> {
    /// Ids to export, in ascending order.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Validated justification for the audit record.
    pub fn justification(&self) -> &ExportJustification {
        &self.justification
    }
}

/// Audit summary of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Records handed to the exporter.
    pub exported: usize,
    /// Reason recorded with the export.
    pub justification: ExportJustification,
}

// ===== Gateway =====

/// In-flight guard and validation for bulk actions.
#[derive(Debug)]
pub struct BulkGateway {
    in_flight: Option<(u64, BulkAction)>,
    next_seq: u64,
    min_justification_len: usize,
}

impl Default for BulkGateway {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_JUSTIFICATION_LEN)
    }
}

impl BulkGateway {
    /// Idle gateway requiring `min_justification_len` characters of justification.
    pub fn new(min_justification_len: usize) -> Self {
        Self {
            in_flight: None,
            next_seq: 0,
            min_justification_len,
        }
    }

    /// Configured minimum justification length.
    pub fn min_justification_len(&self) -> usize {
        self.min_justification_len
    }

    /// Whether a bulk action is running (the UI disables bulk buttons).
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The action currently running, if any.
    pub fn in_flight(&self) -> Option<BulkAction> {
        self.in_flight.map(|(_, action)| action)
    }

    fn check_can_start<Id: Ord>(
        &self,
        action: BulkAction,
        selection: &SelectionSet<Id>,
        caps: &Capabilities,
    ) -> Result<(), BulkError> {
        if !caps.allows(action) {
            warn!(%action, "bulk action not permitted");
            return Err(BulkError::NotPermitted(action));
        }
        if self.is_busy() {
            return Err(BulkError::InFlight);
        }
        if selection.is_empty() {
            return Err(BulkError::EmptySelection);
        }
        Ok(())
    }

    fn start(&mut self, action: BulkAction) -> u64 {
        self.next_seq += 1;
        self.in_flight = Some((self.next_seq, action));
        self.next_seq
    }

    fn finish(&mut self, seq: u64, action: BulkAction) -> Result<(), BulkError> {
        if self.in_flight != Some((seq, action)) {
            return Err(BulkError::StaleTicket);
        }
        self.in_flight = None;
        Ok(())
    }

    /// Start a delete of every selected id.
    pub fn begin_delete<Id>(
        &mut self,
        selection: &SelectionSet<Id>,
        caps: &Capabilities,
    ) -> Result<DeleteTicket<Id>, BulkError>
    where
        Id: Ord + Clone + Debug,
    {
        self.check_can_start(BulkAction::Delete, selection, caps)?;
        let seq = self.start(BulkAction::Delete);
        let ids = selection.selected_ids();
        info!(count = ids.len(), "bulk delete started");
        Ok(DeleteTicket { seq, ids })
    }

    /// Finish a delete with the backend's answer.
    ///
    /// Ids the backend reports as deleted but that were never requested are
    /// ignored; requested ids it does not mention count as failed.
    pub fn finish_delete<Id>(
        &mut self,
        ticket: DeleteTicket<Id>,
        result: Result<DeleteOutcome<Id>, FetchError>,
    ) -> Result<DeleteReport<Id>, BulkError>
    where
        Id: Ord + Clone + Debug,
    {
        self.finish(ticket.seq, BulkAction::Delete)?;
        let outcome = result.inspect_err(|err| warn!(error = %err, "bulk delete failed"))?;

        let succeeded: BTreeSet<&Id> = outcome.succeeded.iter().collect();
        let (removed, failed): (Vec<Id>, Vec<Id>) = ticket
            .ids
            .into_iter()
            .partition(|id| succeeded.contains(id));

        if removed.len() < outcome.succeeded.len() {
            warn!(
                reported = outcome.succeeded.len(),
                requested_and_removed = removed.len(),
                "backend reported deletes for ids that were not requested"
            );
        }
        if failed.is_empty() {
            info!(removed = removed.len(), "bulk delete succeeded");
        } else {
            warn!(removed = removed.len(), failed = ?failed, "bulk delete partially failed");
        }
        Ok(DeleteReport { removed, failed })
    }

    /// Start an export of every selected id. Rejects a justification below
    /// the configured minimum before anything else happens.
    pub fn begin_export<Id>(
        &mut self,
        selection: &SelectionSet<Id>,
        justification: &str,
        caps: &Capabilities,
    ) -> Result<ExportTicket<Id>, BulkError>
    where
        Id: Ord + Clone + Debug,
    {
        self.check_can_start(BulkAction::Export, selection, caps)?;
        let justification = ExportJustification::new(justification, self.min_justification_len)
            .inspect_err(|err| warn!(error = %err, "export justification rejected"))?;
        let seq = self.start(BulkAction::Export);
        let ids = selection.selected_ids();
        info!(count = ids.len(), "bulk export started");
        Ok(ExportTicket {
            seq,
            ids,
            justification,
        })
    }

    /// Finish an export with the collaborator's answer.
    pub fn finish_export<Id>(
        &mut self,
        ticket: ExportTicket<Id>,
        exported: usize,
        result: Result<(), ExportFailure>,
    ) -> Result<ExportReceipt, BulkError> {
        self.finish(ticket.seq, BulkAction::Export)?;
        result.inspect_err(|err| warn!(error = %err, "bulk export failed"))?;
        info!(
            exported,
            justification_len = ticket.justification.len(),
            "bulk export completed"
        );
        Ok(ExportReceipt {
            exported,
            justification: ticket.justification,
        })
    }
}

#[cfg(test)]
#[path = "bulk_tests.rs"]
mod tests;
