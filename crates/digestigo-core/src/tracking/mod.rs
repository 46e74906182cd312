//! # Tracking Module
//!
//! トラッキングエントリの永続化と集計。
//!
//! - `entry`: `TrackingEntry`と書き込み前の`NewEntry`
//! - `entry_store`: 重複抑止付きの追記専用ストア
//! - `summary`: エントリ列からの集計（`TrackingSummary`）
//!
//! ## 使用例
//!
//! ```rust
//! use std::sync::Arc;
//! use digestigo_core::category::Category;
//! use digestigo_core::store::MemoryStore;
//! use digestigo_core::tracking::{EntryStore, NewEntry};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let entries = EntryStore::new(Arc::new(MemoryStore::new()));
//! let first = entries.append(NewEntry::new(Category::Symptom, "I feel bloated", "Experiencing bloating")).await?;
//! let again = entries.append(NewEntry::new(Category::Symptom, "I feel bloated", "Experiencing bloating")).await?;
//! assert!(first.is_some());
//! assert!(again.is_none());
//! assert_eq!(entries.summary().await.symptoms.len(), 1);
//! # Ok::<(), digestigo_core::DigestigoError>(())
//! # }).unwrap();
//! ```

mod entry;
mod entry_store;
mod summary;

// Re-exports
pub use entry::{NewEntry, TrackingEntry};
pub use entry_store::{AppendOutcome, EntryStore, SessionToken};
pub use summary::{
    percentage, summarize, DietaryBreakdown, DietaryPercentages, SummaryItem, TrackingSummary,
};
