//! In-process store. Also the working set behind `JsonFileStore`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    compute_stats, matches_query, sort_for_listing, HeadlineQuery, HeadlineStore, NewHeadline,
    ScrapeStats, StoredHeadline,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    rows: Vec<StoredHeadline>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<StoredHeadline>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            inner: RwLock::new(State { next_id, rows }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn snapshot(&self) -> Vec<StoredHeadline> {
        self.read().rows.clone()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert_row(&self, h: NewHeadline) -> StoredHeadline {
        let now = Utc::now();
        let mut g = self.write();
        g.next_id += 1;
        let row = StoredHeadline {
            id: g.next_id,
            source: h.source,
            title: h.title,
            url: h.url,
            published_at: h.published_at,
            raw_text: h.raw_text,
            sentiment: h.sentiment,
            commentary: h.commentary,
            model_confidence: h.model_confidence,
            created_at: now,
            updated_at: now,
        };
        g.rows.push(row.clone());
        row
    }

    pub(crate) fn remove_row(&self, id: u64) -> Option<StoredHeadline> {
        let mut g = self.write();
        let pos = g.rows.iter().position(|r| r.id == id)?;
        Some(g.rows.remove(pos))
    }

    pub(crate) fn restore_row(&self, row: StoredHeadline) {
        let mut g = self.write();
        g.next_id = g.next_id.max(row.id);
        g.rows.push(row);
    }

    pub(crate) fn take_all(&self) -> Vec<StoredHeadline> {
        std::mem::take(&mut self.write().rows)
    }

    pub(crate) fn restore_all(&self, rows: Vec<StoredHeadline>) {
        let mut g = self.write();
        let max = rows.iter().map(|r| r.id).max().unwrap_or(0);
        g.next_id = g.next_id.max(max);
        g.rows.extend(rows);
    }
}

#[async_trait]
impl HeadlineStore for MemoryStore {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        Ok(self.read().rows.iter().any(|r| r.url == url))
    }

    async fn insert(&self, headline: NewHeadline) -> Result<StoredHeadline> {
        Ok(self.insert_row(headline))
    }

    async fn get(&self, id: u64) -> Result<Option<StoredHeadline>> {
        Ok(self.read().rows.iter().find(|r| r.id == id).cloned())
    }

    async fn query(&self, q: &HeadlineQuery) -> Result<(Vec<StoredHeadline>, usize)> {
        let mut hits: Vec<StoredHeadline> = self
            .read()
            .rows
            .iter()
            .filter(|r| matches_query(q, r))
            .cloned()
            .collect();
        let total = hits.len();
        sort_for_listing(&mut hits);
        let page = hits.into_iter().skip(q.offset).take(q.limit).collect();
        Ok((page, total))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.remove_row(id).is_some())
    }

    async fn delete_all(&self) -> Result<usize> {
        Ok(self.take_all().len())
    }

    async fn recent(&self, source: Option<&str>, limit: usize) -> Result<Vec<StoredHeadline>> {
        let mut rows: Vec<StoredHeadline> = self
            .read()
            .rows
            .iter()
            .filter(|r| source.map_or(true, |s| s == r.source))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (Reverse(r.created_at), Reverse(r.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn stats(&self) -> Result<ScrapeStats> {
        Ok(compute_stats(self.read().rows.iter()))
    }
}
