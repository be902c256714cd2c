//! Job reservations: commit, start work, complete.
//!
//! Committing raises an item's `committed_qty` without looking at availability;
//! a negative `available_qty` afterwards is reported, never refused. Completion
//! consumes through the ledger and releases every remaining commitment on the
//! reservation in the same unit of work.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use forgedesk_core::{DomainError, ItemId, ReservationId};
use forgedesk_inventory::{InventoryItem, LedgerLine, PostTransaction};
use forgedesk_reservations::{
    CommitLine, CommitOutcome, CommitSnapshot, CompletionSummary, JobMetadata, JobReservation,
    ReservationDetail, ReservationItem, ReservationItemView, ReservationStatus, ReservationSummary,
    Shortage, StatusChange, TransitionOutcome, check_transition, effective_lines, plan_completion,
};

use super::ledger::post_transaction;
use super::{finish, usage};
use crate::capabilities::Capabilities;
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub job: JobMetadata,
    pub lines: Vec<CommitLine>,
}

/// One item whose cached commitment disagreed with its active reservation lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentCorrection {
    pub item_id: ItemId,
    pub sku: String,
    pub previous: i64,
    pub corrected: i64,
}

#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn InventoryStore>,
    capabilities: Capabilities,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn InventoryStore>, capabilities: Capabilities) -> Self {
        Self {
            store,
            capabilities,
        }
    }

    /// Commit stock to a job, creating the reservation on first use of its job number.
    ///
    /// Repeated commits for the same job and item add to the existing line.
    #[instrument(skip(self, request), fields(job_number = %request.job.job_number), err)]
    pub async fn commit_items(&self, request: CommitRequest) -> EngineResult<CommitOutcome> {
        self.capabilities.require_reservations()?;
        let lines = effective_lines(&request.lines)?;

        let mut tx = self.store.begin().await?;
        let result = commit_in(tx.as_mut(), &request.job, &lines).await;
        let outcome = finish(tx, result).await?;

        let oversubscribed: Vec<&str> = outcome
            .items
            .iter()
            .filter(|snapshot| snapshot.oversubscribed())
            .map(|snapshot| snapshot.sku.as_str())
            .collect();
        if !oversubscribed.is_empty() {
            warn!(
                reservation_id = %outcome.reservation_id,
                skus = ?oversubscribed,
                "commitment leaves items oversubscribed"
            );
        }
        info!(
            reservation_id = %outcome.reservation_id,
            job_number = %outcome.job_number,
            lines = outcome.items.len(),
            "stock committed to job"
        );
        Ok(outcome)
    }

    /// Move a reservation to `target`. Requesting the current status is a no-op.
    ///
    /// Starting work reports lines committed beyond stock on hand; the
    /// transition still happens.
    #[instrument(skip(self), err)]
    pub async fn transition_status(
        &self,
        id: ReservationId,
        target: ReservationStatus,
    ) -> EngineResult<TransitionOutcome> {
        self.capabilities.require_reservations()?;

        let mut tx = self.store.begin().await?;
        let result = transition_in(tx.as_mut(), id, target).await;
        let outcome = finish(tx, result).await?;

        if !outcome.shortages.is_empty() {
            warn!(
                reservation_id = %id,
                shortages = outcome.shortages.len(),
                "work started with committed quantities above stock on hand"
            );
        }
        if outcome.changed {
            info!(
                reservation_id = %id,
                from = %outcome.previous_status,
                to = %outcome.new_status,
                "reservation status changed"
            );
        }
        Ok(outcome)
    }

    /// Finish an in-progress job.
    ///
    /// `actuals` overrides the consumed quantity per item; omitted items consume
    /// everything committed. Whatever is not consumed is released.
    #[instrument(skip(self, actuals), fields(actuals = actuals.len()), err)]
    pub async fn complete(
        &self,
        id: ReservationId,
        actuals: HashMap<ItemId, i64>,
    ) -> EngineResult<CompletionSummary> {
        self.capabilities.require_reservations()?;

        let mut tx = self.store.begin().await?;
        let result = complete_in(tx.as_mut(), id, &actuals).await;
        let (summary, consumed) = finish(tx, result).await?;

        info!(
            reservation_id = %id,
            job_number = %summary.job_number,
            consumed = summary.consumed,
            released = summary.released,
            "reservation fulfilled"
        );
        usage::refresh_after_commit(self.store.as_ref(), &consumed, Utc::now().date_naive()).await;
        Ok(summary)
    }

    /// Reservations with their line totals, newest first. Empty when the
    /// reservation subsystem is absent.
    pub async fn list_reservations(&self) -> EngineResult<Vec<ReservationSummary>> {
        if !self.capabilities.reservations {
            return Ok(Vec::new());
        }
        let mut tx = self.store.begin().await?;
        let result = list_in(tx.as_mut()).await;
        finish(tx, result).await
    }

    pub async fn get_reservation(&self, id: ReservationId) -> EngineResult<ReservationDetail> {
        self.capabilities.require_reservations()?;
        let mut tx = self.store.begin().await?;
        let result = detail_in(tx.as_mut(), id).await;
        finish(tx, result).await
    }

    /// Recompute every item's committed quantity from active reservation lines.
    #[instrument(skip(self), err)]
    pub async fn reconcile_commitments(&self) -> EngineResult<Vec<CommitmentCorrection>> {
        self.capabilities.require_reservations()?;

        let mut tx = self.store.begin().await?;
        let result = reconcile_in(tx.as_mut()).await;
        let corrections = finish(tx, result).await?;

        for correction in &corrections {
            warn!(
                item_id = %correction.item_id,
                sku = %correction.sku,
                previous = correction.previous,
                corrected = correction.corrected,
                "committed quantity corrected"
            );
        }
        info!(corrections = corrections.len(), "commitments reconciled");
        Ok(corrections)
    }
}

async fn require_reservation(
    tx: &mut dyn StoreTx,
    id: ReservationId,
) -> EngineResult<JobReservation> {
    tx.load_reservation_for_update(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("reservation {id}")).into())
}

async fn items_map(
    tx: &mut dyn StoreTx,
    ids: &[ItemId],
) -> EngineResult<HashMap<ItemId, InventoryItem>> {
    Ok(tx
        .items_by_id(ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect())
}

async fn commit_in(
    tx: &mut dyn StoreTx,
    job: &JobMetadata,
    lines: &[CommitLine],
) -> EngineResult<CommitOutcome> {
    let meta = job.validate()?;
    let now = Utc::now();

    let candidate = JobReservation::from_metadata(meta.clone(), now);
    let mut reservation = tx.upsert_reservation(&candidate).await?;
    if reservation.id != candidate.id {
        reservation.merge_metadata(meta, now)?;
        tx.update_reservation(&reservation).await?;
    }

    let ids: Vec<ItemId> = lines.iter().map(|line| line.item_id).collect();
    let mut items: HashMap<ItemId, InventoryItem> = tx
        .lock_items(&ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let mut snapshots = Vec::with_capacity(lines.len());
    for line in lines {
        let item = items
            .get_mut(&line.item_id)
            .ok_or_else(|| DomainError::not_found(format!("inventory item {}", line.item_id)))?;

        let available_before = item.available_qty();
        item.committed_qty += line.commit_qty;
        tx.set_committed(item.id, item.committed_qty).await?;

        let requested = if line.requested_qty > 0 {
            line.requested_qty
        } else {
            line.commit_qty
        };
        tx.add_reservation_item(reservation.id, item.id, requested, line.commit_qty)
            .await?;

        snapshots.push(CommitSnapshot {
            item_id: item.id,
            sku: item.sku.clone(),
            item_name: item.name.clone(),
            requested_qty: requested,
            committed_qty: line.commit_qty,
            available_before,
            available_after: item.available_qty(),
        });
    }

    Ok(CommitOutcome {
        reservation_id: reservation.id,
        job_number: reservation.job_number,
        job_name: reservation.job_name,
        status: reservation.status,
        items: snapshots,
    })
}

async fn transition_in(
    tx: &mut dyn StoreTx,
    id: ReservationId,
    target: ReservationStatus,
) -> EngineResult<TransitionOutcome> {
    let mut reservation = require_reservation(tx, id).await?;
    let previous_status = reservation.status;

    let new_status = match check_transition(previous_status, target)? {
        StatusChange::Unchanged => {
            return Ok(TransitionOutcome {
                reservation_id: id,
                job_number: reservation.job_number,
                previous_status,
                new_status: previous_status,
                changed: false,
                shortages: Vec::new(),
            });
        }
        StatusChange::Apply(status) => status,
    };

    let lines = tx.reservation_items(id).await?;
    let ids: Vec<ItemId> = lines.iter().map(|line| line.item_id).collect();
    let items = items_map(tx, &ids).await?;
    let shortages: Vec<Shortage> = lines
        .iter()
        .filter_map(|line| {
            let item = items.get(&line.item_id)?;
            Shortage::detect(line, item.stock, &item.sku, &item.name)
        })
        .collect();

    reservation.status = new_status;
    reservation.updated_at = Utc::now();
    tx.update_reservation(&reservation).await?;

    Ok(TransitionOutcome {
        reservation_id: id,
        job_number: reservation.job_number,
        previous_status,
        new_status,
        changed: true,
        shortages,
    })
}

/// Returns the summary and the items that had consumption posted.
async fn complete_in(
    tx: &mut dyn StoreTx,
    id: ReservationId,
    actuals: &HashMap<ItemId, i64>,
) -> EngineResult<(CompletionSummary, Vec<ItemId>)> {
    let mut reservation = require_reservation(tx, id).await?;
    if reservation.status != ReservationStatus::InProgress {
        return Err(DomainError::invalid_transition(
            reservation.status.as_str(),
            ReservationStatus::Fulfilled.as_str(),
        )
        .into());
    }

    let lines = tx.reservation_items(id).await?;
    let plan = plan_completion(&lines, actuals)?;

    let ids: Vec<ItemId> = plan.lines.iter().map(|line| line.item_id).collect();
    let items: HashMap<ItemId, InventoryItem> = tx
        .lock_items(&ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let mut consumption = Vec::new();
    for line in &plan.lines {
        let item = items
            .get(&line.item_id)
            .ok_or_else(|| DomainError::not_found(format!("inventory item {}", line.item_id)))?;
        let committed = item.committed_qty - line.commitment_release();
        if committed < 0 {
            return Err(DomainError::integrity(format!(
                "{}: releasing {} would leave committed quantity at {}",
                item.sku,
                line.commitment_release(),
                committed
            ))
            .into());
        }
        tx.set_committed(item.id, committed).await?;

        if line.consume_delta > 0 {
            consumption.push(LedgerLine::new(item.id, -line.consume_delta));
        }
        tx.update_reservation_item(&ReservationItem {
            reservation_id: id,
            item_id: line.item_id,
            requested_qty: lines
                .iter()
                .find(|l| l.item_id == line.item_id)
                .map(|l| l.requested_qty)
                .unwrap_or_default(),
            committed_qty: 0,
            consumed_qty: line.target_consumed,
        })
        .await?;
    }

    let consumed_items: Vec<ItemId> = consumption.iter().map(|l| l.item_id).collect();
    let transaction_id = if consumption.is_empty() {
        None
    } else {
        let posting = PostTransaction::new(
            format!("Job {} completion", reservation.job_number),
            consumption,
        );
        Some(post_transaction(tx, &posting).await?.id)
    };

    reservation.status = ReservationStatus::Fulfilled;
    reservation.updated_at = Utc::now();
    tx.update_reservation(&reservation).await?;

    let summary = CompletionSummary {
        reservation_id: id,
        job_number: reservation.job_number,
        consumed: plan.consumed_total(),
        released: plan.released_total(),
        transaction_id,
    };
    Ok((summary, consumed_items))
}

async fn list_in(tx: &mut dyn StoreTx) -> EngineResult<Vec<ReservationSummary>> {
    let reservations = tx.list_reservations().await?;
    let mut summaries = Vec::with_capacity(reservations.len());
    for reservation in reservations {
        let lines = tx.reservation_items(reservation.id).await?;
        summaries.push(ReservationSummary::new(reservation, &lines));
    }
    Ok(summaries)
}

async fn detail_in(tx: &mut dyn StoreTx, id: ReservationId) -> EngineResult<ReservationDetail> {
    let reservation = tx
        .get_reservation(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("reservation {id}")))?;
    let lines = tx.reservation_items(id).await?;
    let ids: Vec<ItemId> = lines.iter().map(|line| line.item_id).collect();
    let items = items_map(tx, &ids).await?;

    let mut views: Vec<ReservationItemView> = lines
        .into_iter()
        .filter_map(|line| {
            let item = items.get(&line.item_id)?;
            Some(ReservationItemView {
                sku: item.sku.clone(),
                item_name: item.name.clone(),
                stock: item.stock,
                available_qty: item.available_qty(),
                line,
            })
        })
        .collect();
    views.sort_by(|a, b| a.sku.cmp(&b.sku));

    Ok(ReservationDetail {
        reservation,
        lines: views,
    })
}

async fn reconcile_in(tx: &mut dyn StoreTx) -> EngineResult<Vec<CommitmentCorrection>> {
    let mut expected: BTreeMap<ItemId, i64> = BTreeMap::new();
    for line in tx.active_reservation_items().await? {
        *expected.entry(line.item_id).or_insert(0) += line.committed_qty;
    }

    let mut ids: BTreeSet<ItemId> = expected.keys().copied().collect();
    ids.extend(tx.list_items().await?.into_iter().map(|item| item.id));
    let ids: Vec<ItemId> = ids.into_iter().collect();

    let mut corrections = Vec::new();
    for item in tx.lock_items(&ids).await? {
        let corrected = expected.get(&item.id).copied().unwrap_or(0);
        if corrected != item.committed_qty {
            tx.set_committed(item.id, corrected).await?;
            corrections.push(CommitmentCorrection {
                item_id: item.id,
                sku: item.sku,
                previous: item.committed_qty,
                corrected,
            });
        }
    }
    Ok(corrections)
}
