use shared::errors::{Result, ServiceError};
use shared::{TripEntry, UserId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::sheets::Spreadsheet;

const DUPLICATE_WINDOW_SECS: i64 = 30;
const DUPLICATE_LOOKBACK_ROWS: usize = 10;

/// Trip entries on top of a [`Spreadsheet`], skipping the header row.
#[derive(Clone)]
pub struct TripJournal {
    sheet: Arc<dyn Spreadsheet>,
}

impl TripJournal {
    pub fn new(sheet: Arc<dyn Spreadsheet>) -> Self {
        Self { sheet }
    }

    /// Data rows paired with their sheet row numbers.
    async fn entries(&self) -> Result<Vec<(usize, TripEntry)>> {
        let rows = self.sheet.read_rows().await?;

        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(index, row)| TripEntry::from_row(row).map(|entry| (index + 1, entry)))
            .collect())
    }

    pub async fn append(&self, entry: &TripEntry) -> Result<()> {
        let recent = self.recent(DUPLICATE_LOOKBACK_ROWS).await?;

        let duplicate = recent.iter().any(|existing| {
            existing.author_tg_id == entry.author_tg_id
                && (entry.created_at - existing.created_at).num_seconds().abs() < DUPLICATE_WINDOW_SECS
        });

        if duplicate {
            warn!(author = %entry.author_tg_id, "Duplicate journal entry suppressed");
            return Err(ServiceError::Duplicate(format!(
                "user {} saved an entry less than {} seconds ago",
                entry.author_tg_id, DUPLICATE_WINDOW_SECS
            )));
        }

        self.sheet.append_row(entry.to_row()).await?;

        info!(
            author = %entry.author_tg_id,
            row_uid = %entry.row_uid,
            distance_km = entry.distance_km,
            "Journal entry appended"
        );

        Ok(())
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<TripEntry>> {
        let entries = self.entries().await?;

        Ok(entries
            .into_iter()
            .rev()
            .take(limit)
            .map(|(_, entry)| entry)
            .collect())
    }

    pub async fn last_for_author(&self, author: UserId) -> Result<Option<(usize, TripEntry)>> {
        let entries = self.entries().await?;

        Ok(entries
            .into_iter()
            .rev()
            .find(|(_, entry)| entry.author_tg_id == author))
    }

    pub async fn find_by_uid(&self, row_uid: &str, author: UserId) -> Result<Option<usize>> {
        let entries = self.entries().await?;

        Ok(entries
            .into_iter()
            .find(|(_, entry)| entry.row_uid == row_uid && entry.author_tg_id == author)
            .map(|(row_number, _)| row_number))
    }

    pub async fn update(&self, row_number: usize, entry: &TripEntry) -> Result<()> {
        self.sheet.update_row(row_number, entry.to_row()).await?;
        info!(row = row_number, row_uid = %entry.row_uid, "Journal entry updated");
        Ok(())
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.entries().await?.len())
    }
}
