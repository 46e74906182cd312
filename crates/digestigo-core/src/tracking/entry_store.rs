//! Entry Store
//!
//! `TrackingEntry`の正規コレクションを所有する追記専用ストア。
//! 変更は追記と全削除のみ。コレクション全体を一つのJSON配列として
//! `TRACKING_DATA_KEY`に保存する。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DigestigoError, Result};
use crate::store::{Store, TRACKING_DATA_KEY};

use super::entry::{NewEntry, TrackingEntry};
use super::summary::{summarize, TrackingSummary};

/// `clear()`の世代を表すトークン
///
/// 取得後に`clear()`が発行されると、そのトークンでの書き込みは拒否される。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

/// 追記の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// 新規に保存された
    Saved(TrackingEntry),
    /// 同じ`(category, summary)`が既に存在した
    Duplicate,
    /// トークン取得後に`clear()`されていた
    Stale,
}

impl AppendOutcome {
    pub fn into_saved(self) -> Option<TrackingEntry> {
        match self {
            Self::Saved(entry) => Some(entry),
            _ => None,
        }
    }
}

/// 追記専用のエントリストア
pub struct EntryStore {
    store: Arc<dyn Store>,
    /// 確認→書き込みを直列化する
    write_lock: Mutex<()>,
    generation: AtomicU64,
}

impl EntryStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// 現在の世代のトークン
    pub fn session(&self) -> SessionToken {
        SessionToken(self.generation.load(Ordering::SeqCst))
    }

    /// トークンがまだ有効か
    pub fn is_current(&self, token: SessionToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// エントリを追記する
    ///
    /// 同じ`(category, summary)`があれば書き込まずに`None`を返す（エラーではない）。
    ///
    /// # Errors
    /// * `StorageRead` / `StorageWrite` - ストアの読み書きに失敗した場合
    pub async fn append(&self, new: NewEntry) -> Result<Option<TrackingEntry>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.append_locked(new).await?.into_saved())
    }

    /// トークンの世代内でのみ追記する
    pub async fn append_in(&self, token: SessionToken, new: NewEntry) -> Result<AppendOutcome> {
        let _guard = self.write_lock.lock().await;
        if !self.is_current(token) {
            debug!(category = %new.category, "Skipping write after clear");
            return Ok(AppendOutcome::Stale);
        }
        self.append_locked(new).await
    }

    async fn append_locked(&self, new: NewEntry) -> Result<AppendOutcome> {
        let mut entries = self.load().await?;

        if entries.iter().any(|e| e.dedup_key() == new.dedup_key()) {
            info!(category = %new.category, summary = %new.summary, "Skipping duplicate entry");
            return Ok(AppendOutcome::Duplicate);
        }

        let entry = new.into_entry();
        entries.push(entry.clone());
        self.persist(&entries).await?;
        info!(category = %entry.category, summary = %entry.summary, "Saved new entry");
        Ok(AppendOutcome::Saved(entry))
    }

    /// 挿入順の全エントリ
    ///
    /// 読み込みに失敗した場合は空を返す（サマリーは常に描画可能であるべき）。
    pub async fn all(&self) -> Vec<TrackingEntry> {
        match self.load().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to read tracking data, treating as empty");
                Vec::new()
            }
        }
    }

    /// 現在のエントリから集計
    pub async fn summary(&self) -> TrackingSummary {
        summarize(&self.all().await)
    }

    /// 全エントリを削除（取り消し不可）
    ///
    /// 削除に成功した時点で世代を進めるため、以前のトークンでの書き込みは以後拒否される。
    /// 削除に失敗した場合は世代を変えない。
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(TRACKING_DATA_KEY).await?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!("Cleared tracking data");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<TrackingEntry>> {
        let Some(raw) = self.store.get(TRACKING_DATA_KEY).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| DigestigoError::StorageRead {
            key: TRACKING_DATA_KEY.to_string(),
            message: format!("corrupt tracking data: {}", e),
        })
    }

    async fn persist(&self, entries: &[TrackingEntry]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.store.set(TRACKING_DATA_KEY, &json).await
    }
}
