//! # Classifier Module
//!
//! 外部のテキスト分類オラクルとのやり取りを扱う。
//!
//! - `request`: 分類リクエストの構築
//! - `response`: 応答テキストの解析（失敗しない）
//! - `command`: 外部コマンド（Claude CLI等）による`Classifier`実装
//!
//! オラクルはテキストを受け取りテキストを返すだけの存在として扱う。
//! 「だいたいJSONに近いテキストを返す」以上の期待はしない。
//!
//! ## 使用例
//!
//! ```rust
//! use digestigo_core::classifier::{parse_categorization, ClassificationRequestBuilder};
//! use digestigo_core::category::Category;
//!
//! let request = ClassificationRequestBuilder::default().build_request("I feel bloated");
//! assert_eq!(request.messages.len(), 2);
//!
//! let parsed = parse_categorization("not json at all", "I feel bloated");
//! assert_eq!(parsed.categories, vec![Category::General]);
//! ```

mod command;
mod request;
mod response;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DigestigoError, Result};

pub use command::CommandClassifier;
pub use request::{ClassificationRequestBuilder, MAX_MESSAGE_CHARS};
pub use response::{parse_categorization, strip_code_fences};

// ============================================================================
// Request types
// ============================================================================

/// プロンプトの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// 役割付きのプロンプトメッセージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 分類器へのリクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRequest {
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ClassifierRequest {
    /// ユーザーメッセージの本文
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// テキストのみを受け付ける分類器向けの表現
    pub fn render_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("[{}]\n{}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ============================================================================
// Capability
// ============================================================================

/// テキスト補完オラクル
///
/// 実装は一つのテキスト補完を返す。応答の構造は保証されない。
#[async_trait]
pub trait Classifier: Send + Sync {
    /// 分類器名（ログ用）
    fn name(&self) -> &str;

    /// リクエストを送信し、生の応答テキストを返す
    ///
    /// # Errors
    /// * `ClassifierUnavailable` - 呼び出し自体が失敗した場合
    async fn complete(&self, request: &ClassifierRequest) -> Result<String>;
}

/// タイムアウト付きで`complete`を呼ぶ（`None`なら無制限）
///
/// # Errors
/// * `ClassifierTimeout` - 制限時間内に応答がなかった場合
pub(crate) async fn complete_within(
    classifier: &dyn Classifier,
    request: &ClassifierRequest,
    timeout: Option<Duration>,
) -> Result<String> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, classifier.complete(request))
            .await
            .map_err(|_| DigestigoError::ClassifierTimeout {
                seconds: limit.as_secs(),
            })?,
        None => classifier.complete(request).await,
    }
}
