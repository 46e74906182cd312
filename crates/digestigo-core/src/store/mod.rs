//! # Store Module
//!
//! 永続化のためのキーバリューストア抽象。
//!
//! - `MemoryStore`: プロセス内（テスト・一時セッション用）
//! - `FileStore`: キーごとに1ファイル

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use file::FileStore;
pub use memory::MemoryStore;

/// トラッキングエントリ一覧を保存するキー
pub const TRACKING_DATA_KEY: &str = "@digestigo_tracking_data";

/// 生成済みヘルスサマリーのキャッシュを保存するキー
pub const AI_SUMMARY_KEY: &str = "@digestigo_ai_summary";

/// 会話履歴を保存するキー
pub const CHAT_MESSAGES_KEY: &str = "@digestigo_chat_messages";

/// 非同期キーバリューストア
#[async_trait]
pub trait Store: Send + Sync {
    /// 値を取得（存在しなければ`None`）
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 値を保存（上書き）
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 値を削除（存在しなくても成功）
    async fn remove(&self, key: &str) -> Result<()>;
}
