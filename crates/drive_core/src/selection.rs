use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ItemRef;

pub type BatchId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOperation {
    Download,
    Trash,
    Delete,
    Star,
    Move { target: Option<String> },
}

impl BulkOperation {
    /// Download leaves server state alone; everything else mutates it.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, BulkOperation::Download)
    }

    /// Rejects items the service has no per-item call for.
    pub fn check(&self, item: &ItemRef) -> Result<(), String> {
        match (self, item) {
            (BulkOperation::Download, ItemRef::Folder(_)) => {
                Err("folders cannot be downloaded".to_string())
            }
            (BulkOperation::Star, ItemRef::Folder(_)) => {
                Err("folders cannot be starred".to_string())
            }
            (BulkOperation::Move { .. }, ItemRef::Folder(_)) => {
                Err("folders cannot be moved".to_string())
            }
            (BulkOperation::Move { target: Some(target) }, ItemRef::File(_))
                if target.trim().is_empty() =>
            {
                Err("move target must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkOperation::Download => write!(f, "download"),
            BulkOperation::Trash => write!(f, "trash"),
            BulkOperation::Delete => write!(f, "delete"),
            BulkOperation::Star => write!(f, "star"),
            BulkOperation::Move { target: Some(target) } => write!(f, "move to {target}"),
            BulkOperation::Move { target: None } => write!(f, "move to root"),
        }
    }
}

/// Selected items of the current listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSet {
    items: BTreeSet<ItemRef>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership. Returns true when the item is now selected.
    pub fn toggle(&mut self, item: ItemRef) -> bool {
        if self.items.remove(&item) {
            false
        } else {
            self.items.insert(item);
            true
        }
    }

    /// Replaces the selection with `items`.
    pub fn select_all(&mut self, items: impl IntoIterator<Item = ItemRef>) {
        self.items = items.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drops selected items that are no longer listed.
    pub fn retain_listed(&mut self, listed: &[ItemRef]) {
        self.items.retain(|item| listed.contains(item));
    }

    pub fn contains(&self, item: &ItemRef) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> Vec<ItemRef> {
        self.items.iter().cloned().collect()
    }
}

/// Per-item outcome summary of a finished bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub batch_id: BatchId,
    pub operation: BulkOperation,
    pub succeeded: Vec<ItemRef>,
    pub failed: Vec<(ItemRef, String)>,
}

impl BulkReport {
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            return format!("{}: {} succeeded", self.operation, self.succeeded.len());
        }
        let reasons = self
            .failed
            .iter()
            .map(|(item, reason)| format!("{}: {}", item.id(), reason))
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "{}: {} succeeded, {} failed ({})",
            self.operation,
            self.succeeded.len(),
            self.failed.len(),
            reasons
        )
    }
}

/// Items of a newly started batch that still need a gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkStart {
    pub batch_id: BatchId,
    pub dispatch: Vec<ItemRef>,
    /// Set when no item needs a request.
    pub report: Option<BulkReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BulkBatch {
    operation: BulkOperation,
    pending: BTreeSet<ItemRef>,
    succeeded: Vec<ItemRef>,
    failed: Vec<(ItemRef, String)>,
}

impl BulkBatch {
    fn into_report(self, batch_id: BatchId) -> BulkReport {
        BulkReport {
            batch_id,
            operation: self.operation,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

/// Collects per-item outcomes of in-flight bulk operations. No rollback:
/// items that succeeded stay mutated when siblings fail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkTracker {
    next_batch: BatchId,
    batches: BTreeMap<BatchId, BulkBatch>,
}

impl BulkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a batch. Items for which `already_applied` holds count as
    /// succeeded and get no request.
    pub fn start(
        &mut self,
        operation: BulkOperation,
        items: Vec<ItemRef>,
        already_applied: impl Fn(&ItemRef) -> bool,
    ) -> Option<BulkStart> {
        let unique: BTreeSet<ItemRef> = items.into_iter().collect();
        if unique.is_empty() {
            return None;
        }
        self.next_batch += 1;
        let batch_id = self.next_batch;

        let mut batch = BulkBatch {
            operation,
            pending: BTreeSet::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for item in unique {
            match batch.operation.check(&item) {
                Ok(()) if already_applied(&item) => batch.succeeded.push(item),
                Ok(()) => {
                    batch.pending.insert(item);
                }
                Err(reason) => batch.failed.push((item, reason)),
            }
        }

        let dispatch: Vec<ItemRef> = batch.pending.iter().cloned().collect();
        if dispatch.is_empty() {
            return Some(BulkStart {
                batch_id,
                dispatch,
                report: Some(batch.into_report(batch_id)),
            });
        }
        self.batches.insert(batch_id, batch);
        Some(BulkStart {
            batch_id,
            dispatch,
            report: None,
        })
    }

    /// Records one item's outcome; returns the report once the batch is complete.
    pub fn record(
        &mut self,
        batch_id: BatchId,
        item: ItemRef,
        result: Result<(), String>,
    ) -> Option<BulkReport> {
        let batch = self.batches.get_mut(&batch_id)?;
        if !batch.pending.remove(&item) {
            return None;
        }
        match result {
            Ok(()) => batch.succeeded.push(item),
            Err(reason) => batch.failed.push((item, reason)),
        }
        if !batch.pending.is_empty() {
            return None;
        }
        self.batches
            .remove(&batch_id)
            .map(|batch| batch.into_report(batch_id))
    }

    pub fn in_flight(&self) -> usize {
        self.batches.len()
    }
}
