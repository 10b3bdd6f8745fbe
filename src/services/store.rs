//! In-memory report store.
//!
//! Reports are keyed by id behind a `tokio::sync::RwLock`. Reads clone out
//! of the lock so handlers never hold it across an await.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::Report;

#[derive(Default)]
pub struct ReportStore {
    reports: RwLock<HashMap<String, Report>>,
}

impl ReportStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a report by id.
    pub async fn insert(&self, report: Report) {
        self.reports.write().await.insert(report.id.clone(), report);
    }

    pub async fn get(&self, id: &str) -> Option<Report> {
        self.reports.read().await.get(id).cloned()
    }

    /// Report `id` if it belongs to `user_id`.
    pub async fn get_owned(&self, id: &str, user_id: &str) -> Option<Report> {
        self.reports
            .read()
            .await
            .get(id)
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
    }

    /// Reports owned by `user_id`, newest first.
    pub async fn list_owned(&self, user_id: &str) -> Vec<Report> {
        let mut reports: Vec<Report> = self
            .reports
            .read()
            .await
            .values()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        reports
    }

    /// Apply `f` to a stored report and return the updated copy.
    pub async fn update(&self, id: &str, f: impl FnOnce(&mut Report)) -> Option<Report> {
        let mut reports = self.reports.write().await;
        let report = reports.get_mut(id)?;
        f(report);
        Some(report.clone())
    }

    /// Remove report `id` if it belongs to `user_id`.
    pub async fn remove_owned(&self, id: &str, user_id: &str) -> Option<Report> {
        let mut reports = self.reports.write().await;
        if reports.get(id)?.user_id.as_deref() != Some(user_id) {
            return None;
        }
        reports.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
