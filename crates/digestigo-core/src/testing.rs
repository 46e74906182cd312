//! テスト用の分類器・ストア

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::classifier::{Classifier, ClassifierRequest};
use crate::error::{DigestigoError, Result};
use crate::store::Store;
use crate::tracking::EntryStore;

/// 用意した応答を順に返す分類器。最後の応答は繰り返す
pub struct ScriptedClassifier {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    requests: Mutex<Vec<ClassifierRequest>>,
}

impl ScriptedClassifier {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(&[reply])
    }

    pub fn requests(&self) -> Vec<ClassifierRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ClassifierRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = next {
            *last = Some(reply);
        }
        Ok(last.clone().unwrap_or_default())
    }
}

/// 常に失敗する分類器
pub struct UnavailableClassifier;

#[async_trait]
impl Classifier for UnavailableClassifier {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, _request: &ClassifierRequest) -> Result<String> {
        Err(DigestigoError::ClassifierUnavailable {
            message: "HTTP 503".to_string(),
        })
    }
}

/// 応答前に待機する分類器
pub struct SlowClassifier {
    pub delay: Duration,
    pub reply: String,
}

#[async_trait]
impl Classifier for SlowClassifier {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: &ClassifierRequest) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// 応答を返す直前にエントリを全削除する分類器（ユーザーの削除操作の割り込み）
pub struct ClearingClassifier {
    pub entries: Arc<EntryStore>,
    pub reply: String,
}

#[async_trait]
impl Classifier for ClearingClassifier {
    fn name(&self) -> &str {
        "clearing"
    }

    async fn complete(&self, _request: &ClassifierRequest) -> Result<String> {
        self.entries.clear().await?;
        Ok(self.reply.clone())
    }
}

/// 読み込み・書き込みを失敗させるストア
pub struct FailingStore {
    fail_reads: bool,
    fail_writes: bool,
}

impl FailingStore {
    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            fail_writes: false,
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_reads: false,
            fail_writes: true,
        }
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(DigestigoError::StorageRead {
                key: key.to_string(),
                message: "disk unavailable".to_string(),
            });
        }
        Ok(None)
    }

    async fn set(&self, key: &str, _value: &str) -> Result<()> {
        if self.fail_writes {
            return Err(DigestigoError::StorageWrite {
                key: key.to_string(),
                message: "disk full".to_string(),
            });
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.set(key, "").await
    }
}
