//! Chat Assistant
//!
//! ユーザーメッセージへの短い返答を生成し、会話履歴を`CHAT_MESSAGES_KEY`に保存する。
//! 返答は分類とは独立しており、トラッキングエントリには触れない。
//!
//! ## 履歴の形式
//!
//! ```text
//! [{"id":"...","text":"Hi! ...","isUser":false,"timestamp":"..."},
//!  {"id":"...","text":"I ate pizza","isUser":true,"timestamp":"..."}, ...]
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{complete_within, Classifier, ClassifierRequest, PromptMessage};
use crate::error::{DigestigoError, Result};
use crate::store::{Store, CHAT_MESSAGES_KEY};

/// 新しい会話の最初のメッセージ
pub const GREETING: &str = "Hi! I'm your digestive health assistant. How are you feeling today? \
Feel free to share any stomach issues or digestive concerns you're experiencing.";

/// 返答の生成に失敗したときのメッセージ
pub const ERROR_REPLY: &str = "Sorry, an error occurred. Please try again.";

/// 送信する直近の履歴の件数
pub const MAX_CONTEXT_MESSAGES: usize = 20;

const ASSISTANT_PROMPT: &str = r#"You are a helpful and empathetic digestive health assistant.

CRITICAL: Keep responses SHORT and conversational (2-4 sentences max). Be concise and friendly.

Your role:
1. Show empathy briefly ("That sounds uncomfortable" or "I understand")
2. Give ONE potential cause
3. Suggest ONE practical tip
4. Only mention seeing a doctor if it's serious

Example good responses:
- "That sounds uncomfortable. Pizza is often high in fat and dairy, which can slow digestion. Try smaller portions and see if that helps!"
- "I understand that's frustrating. Bloating after meals is often from eating too quickly. Try chewing slowly and avoiding carbonated drinks."
- "Spicy food can irritate your stomach lining. Consider milder foods and drink plenty of water. If it persists, see a doctor."

BAD responses (too long):
- Multiple paragraphs
- Lists of many suggestions
- Excessive disclaimers

Keep it natural, brief, and helpful. You're an AI assistant, not a doctor."#;

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 200;

/// 会話履歴の1メッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    fn new(text: impl Into<String>, is_user: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            is_user,
            timestamp: Utc::now(),
        }
    }

    fn to_prompt(&self) -> PromptMessage {
        if self.is_user {
            PromptMessage::user(&self.text)
        } else {
            PromptMessage::assistant(&self.text)
        }
    }
}

/// `reply()`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub message: ChatMessage,
    /// 生成に失敗し`ERROR_REPLY`を返したか
    pub failed: bool,
}

/// 会話アシスタント
pub struct ChatAssistant {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
    /// 読み込み→追記→保存を直列化する
    history_lock: Mutex<()>,
}

impl ChatAssistant {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn Store>) -> Self {
        Self {
            classifier,
            store,
            timeout: None,
            history_lock: Mutex::new(()),
        }
    }

    /// 返答生成のタイムアウト（`None`で無効）
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 会話履歴（保存がなければ挨拶のみ）
    ///
    /// 読み込みに失敗した場合も挨拶のみの履歴として扱う。
    pub async fn history(&self) -> Vec<ChatMessage> {
        match self.load().await {
            Ok(Some(messages)) if !messages.is_empty() => messages,
            Ok(_) => fresh_history(),
            Err(e) => {
                warn!(error = %e, "Failed to read chat history, starting fresh");
                fresh_history()
            }
        }
    }

    /// メッセージに返答し、両方を履歴に追加する
    ///
    /// 返答の生成に失敗しても`ERROR_REPLY`を返し、会話は止めない。
    /// 履歴の保存失敗はログに残すだけで返答は返す。
    pub async fn reply(&self, text: &str) -> ChatReply {
        let _guard = self.history_lock.lock().await;

        let mut history = self.history().await;
        history.push(ChatMessage::user(text));

        let request = build_chat_request(&history);
        let (reply_text, failed) =
            match complete_within(self.classifier.as_ref(), &request, self.timeout).await {
                Ok(reply) if !reply.trim().is_empty() => (reply.trim().to_string(), false),
                Ok(_) => {
                    warn!(classifier = self.classifier.name(), "Empty chat reply");
                    (ERROR_REPLY.to_string(), true)
                }
                Err(e) => {
                    warn!(classifier = self.classifier.name(), error = %e, "Failed to generate chat reply");
                    (ERROR_REPLY.to_string(), true)
                }
            };

        let message = ChatMessage::assistant(reply_text);
        history.push(message.clone());

        if let Err(e) = self.persist(&history).await {
            warn!(error = %e, "Failed to save chat history");
        } else {
            debug!(messages = history.len(), "Saved chat history");
        }

        ChatReply { message, failed }
    }

    /// 会話履歴を削除（次回は挨拶から始まる）
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.history_lock.lock().await;
        self.store.remove(CHAT_MESSAGES_KEY).await?;
        info!("Cleared chat history");
        Ok(())
    }

    async fn load(&self) -> Result<Option<Vec<ChatMessage>>> {
        let Some(raw) = self.store.get(CHAT_MESSAGES_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| DigestigoError::StorageRead {
                key: CHAT_MESSAGES_KEY.to_string(),
                message: format!("corrupt chat history: {}", e),
            })
    }

    async fn persist(&self, history: &[ChatMessage]) -> Result<()> {
        let json = serde_json::to_string(history)?;
        self.store.set(CHAT_MESSAGES_KEY, &json).await
    }
}

fn fresh_history() -> Vec<ChatMessage> {
    vec![ChatMessage::assistant(GREETING)]
}

/// 会話履歴から返答生成用のリクエストを組み立てる
///
/// システムプロンプトの後に直近`MAX_CONTEXT_MESSAGES`件を役割付きで並べる。
pub fn build_chat_request(history: &[ChatMessage]) -> ClassifierRequest {
    let start = history.len().saturating_sub(MAX_CONTEXT_MESSAGES);
    let mut messages = Vec::with_capacity(history.len() - start + 1);
    messages.push(PromptMessage::system(ASSISTANT_PROMPT));
    messages.extend(history[start..].iter().map(ChatMessage::to_prompt));

    ClassifierRequest {
        messages,
        temperature: CHAT_TEMPERATURE,
        max_tokens: CHAT_MAX_TOKENS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Role;
    use crate::store::MemoryStore;
    use crate::testing::{FailingStore, ScriptedClassifier, SlowClassifier, UnavailableClassifier};

    fn assistant_with(classifier: Arc<dyn Classifier>) -> (ChatAssistant, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ChatAssistant::new(classifier, store.clone()), store)
    }

    #[tokio::test]
    async fn test_fresh_history_is_greeting() {
        let (assistant, _) = assistant_with(Arc::new(ScriptedClassifier::always("ok")));
        let history = assistant.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, GREETING);
        assert!(!history[0].is_user);
    }

    #[tokio::test]
    async fn test_reply_sends_history_and_persists() {
        let classifier = Arc::new(ScriptedClassifier::always(
            "  That sounds uncomfortable. Try smaller portions!  ",
        ));
        let (assistant, store) = assistant_with(classifier.clone());

        let reply = assistant.reply("I ate pizza and got bloated").await;
        assert!(!reply.failed);
        assert_eq!(reply.message.text, "That sounds uncomfortable. Try smaller portions!");

        let sent = classifier.requests();
        let roles: Vec<Role> = sent[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User]);
        assert_eq!(sent[0].messages[2].content, "I ate pizza and got bloated");
        assert_eq!(sent[0].temperature, 0.7);
        assert_eq!(sent[0].max_tokens, 200);

        let raw = store.get(CHAT_MESSAGES_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"isUser\":true"));
        assert_eq!(assistant.history().await.len(), 3);
    }

    #[tokio::test]
    async fn test_prior_turns_are_context() {
        let classifier = Arc::new(ScriptedClassifier::new(&["First reply", "Second reply"]));
        let (assistant, _) = assistant_with(classifier.clone());

        assistant.reply("I feel bloated").await;
        assistant.reply("It started after lunch").await;

        let sent = classifier.requests();
        let second: Vec<&str> = sent[1].messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            second,
            vec![GREETING, "I feel bloated", "First reply", "It started after lunch"]
        );
    }

    #[tokio::test]
    async fn test_classifier_failure_returns_error_reply() {
        let (assistant, _) = assistant_with(Arc::new(UnavailableClassifier));
        let reply = assistant.reply("My stomach hurts").await;
        assert!(reply.failed);
        assert_eq!(reply.message.text, ERROR_REPLY);

        let history = assistant.history().await;
        assert_eq!(history.last().map(|m| m.text.as_str()), Some(ERROR_REPLY));
    }

    #[tokio::test]
    async fn test_timeout_returns_error_reply() {
        let store = Arc::new(MemoryStore::new());
        let assistant = ChatAssistant::new(
            Arc::new(SlowClassifier {
                delay: Duration::from_secs(5),
                reply: "too late".to_string(),
            }),
            store,
        )
        .with_timeout(Some(Duration::from_millis(20)));

        let reply = assistant.reply("Heartburn again").await;
        assert!(reply.failed);
    }

    #[tokio::test]
    async fn test_clear_resets_to_greeting() {
        let (assistant, store) = assistant_with(Arc::new(ScriptedClassifier::always("ok")));
        assistant.reply("hello").await;
        assistant.clear().await.unwrap();

        assert!(store.get(CHAT_MESSAGES_KEY).await.unwrap().is_none());
        let history = assistant.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, GREETING);
    }

    #[tokio::test]
    async fn test_corrupt_history_starts_fresh() {
        let (assistant, store) = assistant_with(Arc::new(ScriptedClassifier::always("ok")));
        store.set(CHAT_MESSAGES_KEY, "[{broken").await.unwrap();

        let history = assistant.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, GREETING);
    }

    #[tokio::test]
    async fn test_save_failure_still_replies() {
        let assistant = ChatAssistant::new(
            Arc::new(ScriptedClassifier::always("Try ginger tea.")),
            Arc::new(FailingStore::failing_writes()),
        );
        let reply = assistant.reply("Nausea this morning").await;
        assert!(!reply.failed);
        assert_eq!(reply.message.text, "Try ginger tea.");
    }

    #[test]
    fn test_chat_request_keeps_recent_context() {
        let history: Vec<ChatMessage> = (0..30)
            .map(|i| ChatMessage::user(format!("message {i}")))
            .collect();
        let request = build_chat_request(&history);

        assert_eq!(request.messages.len(), MAX_CONTEXT_MESSAGES + 1);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "message 10");
        assert_eq!(request.messages.last().map(|m| m.content.as_str()), Some("message 29"));
    }
}
