//! File-backed store: the whole table is kept in memory and snapshotted to
//! a JSON file after every mutation (write to `*.tmp`, then rename).
//! A failed snapshot undoes the in-memory change, so a single bad write
//! never leaves memory and disk disagreeing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::memory::MemoryStore;
use super::{HeadlineQuery, HeadlineStore, NewHeadline, ScrapeStats, StoredHeadline};

pub struct JsonFileStore {
    mem: MemoryStore,
    path: PathBuf,
    /// Serializes mutate-then-snapshot sequences.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating store dir {}", dir.display()))?;
        }
        let rows: Vec<StoredHeadline> = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => Vec::new(),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing store file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading store file {}", path.display()))
            }
        };
        info!(path = %path.display(), rows = rows.len(), "headline store opened");
        Ok(Self {
            mem: MemoryStore::from_rows(rows),
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the current rows and write them off the async worker.
    async fn persist(&self) -> Result<()> {
        let rows = self.mem.snapshot();
        let json = serde_json::to_vec_pretty(&rows).context("serializing headlines")?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &json))
            .await
            .context("snapshot task failed")?
    }
}

fn write_snapshot(path: &Path, json: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json)?;
    f.sync_all()?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl HeadlineStore for JsonFileStore {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        self.mem.exists_by_url(url).await
    }

    async fn insert(&self, headline: NewHeadline) -> Result<StoredHeadline> {
        let _guard = self.write_lock.lock().await;
        let row = self.mem.insert_row(headline);
        if let Err(e) = self.persist().await {
            warn!(id = row.id, url = %row.url, error = ?e, "snapshot failed; rolling back insert");
            self.mem.remove_row(row.id);
            return Err(e);
        }
        Ok(row)
    }

    async fn get(&self, id: u64) -> Result<Option<StoredHeadline>> {
        self.mem.get(id).await
    }

    async fn query(&self, q: &HeadlineQuery) -> Result<(Vec<StoredHeadline>, usize)> {
        self.mem.query(q).await
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(row) = self.mem.remove_row(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist().await {
            self.mem.restore_row(row);
            return Err(e);
        }
        Ok(true)
    }

    async fn delete_all(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let rows = self.mem.take_all();
        let n = rows.len();
        if let Err(e) = self.persist().await {
            self.mem.restore_all(rows);
            return Err(e);
        }
        Ok(n)
    }

    async fn recent(&self, source: Option<&str>, limit: usize) -> Result<Vec<StoredHeadline>> {
        self.mem.recent(source, limit).await
    }

    async fn stats(&self) -> Result<ScrapeStats> {
        self.mem.stats().await
    }
}
