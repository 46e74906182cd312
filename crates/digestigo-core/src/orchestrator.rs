//! Categorization Orchestrator
//!
//! ユーザーメッセージを分類し、結果を一つ以上の`TrackingEntry`として書き込む。
//!
//! ## 処理の流れ
//!
//! ```text
//! message ─▶ ClassificationRequestBuilder ─▶ Classifier ─▶ parse_categorization
//!                                                              │
//!                  {general} のみ ◀───────────────────────────┤
//!                  （保存しない）                              ▼
//!                                         カテゴリごとに EntryStore::append_in
//!                                         trigger + extractedSymptom → symptom も追加
//! ```
//!
//! 分類器の失敗・タイムアウトは解析失敗と同じく`general`扱いになり、会話の流れを止めない。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::category::{ellipsize, Categorization, Category};
use crate::classifier::{
    complete_within, parse_categorization, ClassificationRequestBuilder, Classifier,
    ClassifierRequest,
};
use crate::error::Result;
use crate::tracking::{AppendOutcome, EntryStore, NewEntry, SessionToken, TrackingEntry};

/// `process()`の結果（UI表示用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    /// 表示するカテゴリ（バッジ用）
    pub categories: Vec<Category>,
    /// 一件以上保存されたか
    pub saved: bool,
    /// カテゴリごとのサマリー
    pub summaries: BTreeMap<Category, String>,
    /// 今回新たに保存されたエントリ
    pub written: Vec<TrackingEntry>,
    /// 重複としてスキップされた件数
    pub duplicates: usize,
    /// 処理中に`clear()`され、書き込みを打ち切ったか
    pub cancelled: bool,
}

/// 手動カテゴリ変更の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// 分類器が変更を認めた
    Accepted {
        categorization: Categorization,
        /// 保存されたエントリ（重複・`general`・削除済みの場合は`None`）
        entry: Option<TrackingEntry>,
    },
    /// 分類器が認めなかったため元の分類を維持
    Rejected { requested: Category, kept: Category },
}

impl OverrideOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// 分類と書き込みのオーケストレーター
pub struct CategorizationOrchestrator {
    classifier: Arc<dyn Classifier>,
    entries: Arc<EntryStore>,
    builder: ClassificationRequestBuilder,
    timeout: Option<Duration>,
}

impl CategorizationOrchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, entries: Arc<EntryStore>) -> Self {
        Self {
            classifier,
            entries,
            builder: ClassificationRequestBuilder::default(),
            timeout: None,
        }
    }

    pub fn with_builder(mut self, builder: ClassificationRequestBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// 分類器呼び出しのタイムアウト（`None`で無効）
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn entries(&self) -> &Arc<EntryStore> {
        &self.entries
    }

    /// メッセージを分類する（書き込みなし）
    pub async fn categorize(&self, message: &str) -> Categorization {
        let request = self.builder.build_request(message);
        self.classify(&request, message).await
    }

    /// メッセージを分類し、トラッキングエントリを書き込む
    ///
    /// # Errors
    /// * `StorageRead` / `StorageWrite` - 書き込みに失敗した場合
    pub async fn process(&self, message: &str) -> Result<OrchestrationResult> {
        let token = self.entries.session();
        let categorization = self.categorize(message).await;

        if categorization.is_general_only() {
            debug!("Message classified as general, not saved");
            return Ok(OrchestrationResult {
                categories: vec![Category::General],
                saved: false,
                summaries: categorization.summaries,
                written: Vec::new(),
                duplicates: 0,
                cancelled: false,
            });
        }

        let mut summaries = BTreeMap::new();
        let mut writes = Vec::with_capacity(categorization.categories.len() + 1);

        for &category in &categorization.categories {
            let summary = categorization
                .summary_for(category)
                .map(str::to_string)
                .unwrap_or_else(|| ellipsize(message));
            summaries.insert(category, summary.clone());

            let food_category = if category == Category::Dietary {
                categorization.food_category
            } else {
                None
            };
            writes.push(
                NewEntry::new(category, message, summary)
                    .with_food_category(food_category)
                    .with_keywords(categorization.keywords.clone()),
            );
        }

        if let Some(symptom) = categorization.implied_symptom() {
            writes.push(
                NewEntry::new(Category::Symptom, message, format!("Experiencing {symptom}"))
                    .with_keywords(vec![symptom.to_string()]),
            );
        }

        let mut result = OrchestrationResult {
            categories: categorization.categories.clone(),
            saved: false,
            summaries,
            written: Vec::new(),
            duplicates: 0,
            cancelled: false,
        };

        for new in writes {
            match self.entries.append_in(token, new).await? {
                AppendOutcome::Saved(entry) => result.written.push(entry),
                AppendOutcome::Duplicate => result.duplicates += 1,
                AppendOutcome::Stale => {
                    info!("Tracking data was cleared while classifying, dropping writes");
                    result.cancelled = true;
                    break;
                }
            }
        }

        result.saved = !result.written.is_empty();
        Ok(result)
    }

    /// 手動でカテゴリを変更する
    ///
    /// 分類器に検証を依頼し、返された分類に`requested`が含まれる場合のみ受け入れる。
    /// 検証されていない変更は保存しない。
    pub async fn recategorize(&self, message: &str, requested: Category) -> Result<OverrideOutcome> {
        let token = self.entries.session();
        let request = self.builder.build_validation_request(message, requested);
        let validation = self.classify(&request, message).await;

        if !validation.contains(requested) {
            let kept = validation.primary();
            info!(%requested, %kept, "Classifier rejected category override");
            return Ok(OverrideOutcome::Rejected { requested, kept });
        }

        let entry = if requested.is_trackable() {
            self.write_override(token, message, requested, &validation).await?
        } else {
            None
        };

        Ok(OverrideOutcome::Accepted {
            categorization: validation,
            entry,
        })
    }

    async fn write_override(
        &self,
        token: SessionToken,
        message: &str,
        category: Category,
        validation: &Categorization,
    ) -> Result<Option<TrackingEntry>> {
        let summary = validation
            .summary_for(category)
            .map(str::to_string)
            .unwrap_or_else(|| ellipsize(message));
        let food_category = if category == Category::Dietary {
            validation.food_category
        } else {
            None
        };
        let new = NewEntry::new(category, message, summary)
            .with_food_category(food_category)
            .with_keywords(validation.keywords.clone());

        Ok(self.entries.append_in(token, new).await?.into_saved())
    }

    /// 分類器を呼び出して解析する。失敗・タイムアウトはフォールバックになる
    async fn classify(&self, request: &ClassifierRequest, message: &str) -> Categorization {
        match complete_within(self.classifier.as_ref(), request, self.timeout).await {
            Ok(raw) => parse_categorization(&raw, message),
            Err(e) => {
                warn!(classifier = self.classifier.name(), error = %e, "Classifier call failed, falling back to general");
                Categorization::fallback(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::FoodCategory;
    use crate::store::MemoryStore;
    use crate::testing::{
        ClearingClassifier, FailingStore, ScriptedClassifier, SlowClassifier, UnavailableClassifier,
    };

    const PIZZA_MESSAGE: &str = "I ate pizza and got bloated";
    const PIZZA_REPLY: &str = r#"{"categories":["dietary","trigger"],"foodCategory":"carbs","keywords":["pizza","bloating"],"summaries":{"dietary":"Ate pizza","trigger":"Pizza may trigger bloating - watch out"},"extractedSymptom":"bloating"}"#;

    fn entries() -> Arc<EntryStore> {
        Arc::new(EntryStore::new(Arc::new(MemoryStore::new())))
    }

    fn orchestrator(classifier: impl Classifier + 'static) -> CategorizationOrchestrator {
        CategorizationOrchestrator::new(Arc::new(classifier), entries())
    }

    #[tokio::test]
    async fn test_pizza_scenario_writes_three_entries() {
        let orch = orchestrator(ScriptedClassifier::always(PIZZA_REPLY));
        let result = orch.process(PIZZA_MESSAGE).await.unwrap();

        assert!(result.saved);
        assert_eq!(result.categories, vec![Category::Dietary, Category::Trigger]);

        let all = orch.entries().all().await;
        let keys: Vec<_> = all.iter().map(|e| (e.category, e.summary.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (Category::Dietary, "Ate pizza"),
                (Category::Trigger, "Pizza may trigger bloating - watch out"),
                (Category::Symptom, "Experiencing bloating"),
            ]
        );
        assert_eq!(all[0].food_category, Some(FoodCategory::Carbs));
        assert_eq!(all[1].food_category, None);
        assert_eq!(all[1].keywords, vec!["pizza", "bloating"]);
        assert_eq!(all[2].food_category, None);
        assert_eq!(all[2].keywords, vec!["bloating"]);
        assert!(all.iter().all(|e| e.message == PIZZA_MESSAGE));
    }

    #[tokio::test]
    async fn test_resubmitting_same_message_writes_nothing() {
        let orch = orchestrator(ScriptedClassifier::always(PIZZA_REPLY));
        orch.process(PIZZA_MESSAGE).await.unwrap();

        let second = orch.process(PIZZA_MESSAGE).await.unwrap();
        assert!(!second.saved);
        assert!(second.written.is_empty());
        assert_eq!(second.duplicates, 3);
        assert_eq!(orch.entries().all().await.len(), 3);
    }

    #[tokio::test]
    async fn test_general_message_is_not_saved() {
        let orch = orchestrator(ScriptedClassifier::always(
            r#"{"categories":["general"],"summaries":{"general":"Greeting"}}"#,
        ));
        let result = orch.process("Hello there!").await.unwrap();

        assert!(!result.saved);
        assert_eq!(result.categories, vec![Category::General]);
        assert!(orch.entries().all().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_not_saved() {
        let orch = orchestrator(ScriptedClassifier::always("not json at all"));
        let result = orch.process("I feel sick").await.unwrap();
        assert!(!result.saved);
        assert_eq!(result.summaries.get(&Category::General).map(String::as_str), Some("I feel sick"));
        assert!(orch.entries().all().await.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_classifier_falls_back() {
        let orch = orchestrator(UnavailableClassifier);
        let result = orch.process("My stomach hurts").await.unwrap();
        assert!(!result.saved);
        assert_eq!(result.categories, vec![Category::General]);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let orch = orchestrator(SlowClassifier {
            delay: Duration::from_secs(5),
            reply: PIZZA_REPLY.to_string(),
        })
        .with_timeout(Some(Duration::from_millis(20)));
        let result = orch.process(PIZZA_MESSAGE).await.unwrap();
        assert!(!result.saved);
        assert!(orch.entries().all().await.is_empty());
    }

    #[tokio::test]
    async fn test_symptom_not_duplicated_when_already_categorized() {
        let reply = r#"{"categories":["trigger","symptom"],"keywords":["coffee"],"summaries":{"trigger":"Coffee may trigger heartburn - watch out","symptom":"Experiencing heartburn"},"extractedSymptom":"heartburn"}"#;
        let orch = orchestrator(ScriptedClassifier::always(reply));
        let result = orch.process("Coffee gave me heartburn, it burns").await.unwrap();
        assert_eq!(result.written.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_block_other_writes() {
        let first = r#"{"categories":["symptom"],"summaries":{"symptom":"Experiencing bloating"}}"#;
        let second = r#"{"categories":["trigger"],"summaries":{"trigger":"Beans may trigger bloating - watch out"},"extractedSymptom":"bloating"}"#;
        let orch = orchestrator(ScriptedClassifier::new(&[first, second]));

        orch.process("I feel bloated").await.unwrap();
        let result = orch.process("Beans make me bloated").await.unwrap();

        assert!(result.saved);
        assert_eq!(result.written.len(), 1);
        assert_eq!(result.written[0].category, Category::Trigger);
        assert_eq!(result.duplicates, 1);
    }

    #[tokio::test]
    async fn test_missing_summary_uses_truncated_message() {
        let reply = r#"{"categories":["dietary"],"summaries":{"trigger":"unrelated"}}"#;
        let orch = orchestrator(ScriptedClassifier::always(reply));
        let message = "I had a very large breakfast with toast, eggs, beans, mushrooms and a big mug of tea";
        let result = orch.process(message).await.unwrap();
        let summary = &result.written[0].summary;
        assert_eq!(summary.chars().count(), 80);
        assert!(summary.ends_with("..."));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_error() {
        let entries = Arc::new(EntryStore::new(Arc::new(FailingStore::failing_writes())));
        let orch = CategorizationOrchestrator::new(
            Arc::new(ScriptedClassifier::always(PIZZA_REPLY)),
            entries,
        );
        let err = orch.process(PIZZA_MESSAGE).await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_clear_during_classification_cancels_writes() {
        let entries = entries();
        let classifier = ClearingClassifier {
            entries: Arc::clone(&entries),
            reply: PIZZA_REPLY.to_string(),
        };
        let orch = CategorizationOrchestrator::new(Arc::new(classifier), Arc::clone(&entries));

        let result = orch.process(PIZZA_MESSAGE).await.unwrap();
        assert!(result.cancelled);
        assert!(!result.saved);
        assert!(entries.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_override_accepted_when_classifier_agrees() {
        let classifier = Arc::new(ScriptedClassifier::always(
            r#"{"categories":["dietary"],"foodCategory":"dairy","keywords":["milk"],"summaries":{"dietary":"Drank milk"}}"#,
        ));
        let orch = CategorizationOrchestrator::new(classifier.clone(), entries());

        let outcome = orch.recategorize("I drank milk", Category::Dietary).await.unwrap();
        let OverrideOutcome::Accepted { entry, .. } = outcome else {
            panic!("expected override to be accepted");
        };
        let entry = entry.unwrap();
        assert_eq!(entry.category, Category::Dietary);
        assert_eq!(entry.food_category, Some(FoodCategory::Dairy));
        assert_eq!(entry.summary, "Drank milk");

        let sent = classifier.requests();
        assert!(sent[0].user_content().unwrap().contains("VALIDATE:"));
    }

    #[tokio::test]
    async fn test_override_rejected_when_classifier_disagrees() {
        let orch = orchestrator(ScriptedClassifier::always(
            r#"{"categories":["general"],"summaries":{"general":"Greeting"}}"#,
        ));
        let outcome = orch.recategorize("Good morning!", Category::Symptom).await.unwrap();
        assert_eq!(
            outcome,
            OverrideOutcome::Rejected {
                requested: Category::Symptom,
                kept: Category::General,
            }
        );
        assert!(orch.entries().all().await.is_empty());
    }

    #[tokio::test]
    async fn test_override_rejected_when_classifier_unavailable() {
        let orch = orchestrator(UnavailableClassifier);
        let outcome = orch.recategorize("I ate rice", Category::Dietary).await.unwrap();
        assert!(!outcome.is_accepted());
    }
}
