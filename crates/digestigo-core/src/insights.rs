//! Health Insights
//!
//! 集計結果から自然言語のヘルスサマリーを生成し、`AI_SUMMARY_KEY`にキャッシュする。
//! 集計自体には関与せず、`TrackingSummary`を読むだけ。

use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::{Classifier, ClassifierRequest, PromptMessage};
use crate::error::Result;
use crate::store::{Store, AI_SUMMARY_KEY};
use crate::tracking::{SummaryItem, TrackingSummary};

/// データがないときの表示文
pub const EMPTY_INSIGHT: &str = "Start tracking to see your health insights";

/// 生成に失敗したときの表示文
pub const FALLBACK_INSIGHT: &str = "Your digestive health tracking is helping identify patterns.";

const ANALYST_PROMPT: &str = "You are a digestive health analyst. Provide brief, helpful summaries.";
const PROMPT_ITEMS: usize = 5;
const INSIGHT_TEMPERATURE: f32 = 0.7;
const INSIGHT_MAX_TOKENS: u32 = 100;

/// ヘルスサマリーのキャッシュ
pub struct HealthInsights {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn Store>,
}

impl HealthInsights {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn Store>) -> Self {
        Self { classifier, store }
    }

    /// キャッシュ済みのサマリー（なければ生成）
    pub async fn current(&self, summary: &TrackingSummary) -> Result<String> {
        if summary.is_empty() {
            return Ok(EMPTY_INSIGHT.to_string());
        }
        match self.cached().await {
            Some(text) => Ok(text),
            None => self.regenerate(summary).await,
        }
    }

    /// キャッシュ済みのサマリー（読み込み失敗は`None`扱い）
    pub async fn cached(&self) -> Option<String> {
        match self.store.get(AI_SUMMARY_KEY).await {
            Ok(value) => value.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read cached insight");
                None
            }
        }
    }

    /// サマリーを生成し直してキャッシュする
    ///
    /// 分類器が失敗した場合は定型文をキャッシュして返す。
    pub async fn regenerate(&self, summary: &TrackingSummary) -> Result<String> {
        if summary.is_empty() {
            return Ok(EMPTY_INSIGHT.to_string());
        }

        let request = build_insight_request(summary);
        let text = match self.classifier.complete(&request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!("Classifier returned an empty insight, using fallback");
                FALLBACK_INSIGHT.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Failed to generate insight, using fallback");
                FALLBACK_INSIGHT.to_string()
            }
        };

        self.store.set(AI_SUMMARY_KEY, &text).await?;
        info!("Cached new health insight");
        Ok(text)
    }

    /// キャッシュを削除
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(AI_SUMMARY_KEY).await
    }
}

/// 集計結果からサマリー生成用のリクエストを組み立てる
pub fn build_insight_request(summary: &TrackingSummary) -> ClassifierRequest {
    let dietary = summary.dietary;
    let dietary_text = if dietary.total() > 0 {
        format!(
            "{} carbs, {} proteins, {} dairy, {} fibre",
            dietary.carbs, dietary.proteins, dietary.dairy, dietary.fibre
        )
    } else {
        "none".to_string()
    };

    let prompt = format!(
        "Based on this health data, provide a brief 2-sentence summary of potential digestive concerns:\n\
         Symptoms: {}\n\
         Triggers: {}\n\
         Diet: {}\n\n\
         Write a helpful, empathetic summary that identifies patterns. Keep it under 40 words.",
        join_items(&summary.symptoms),
        join_items(&summary.triggers),
        dietary_text,
    );

    ClassifierRequest {
        messages: vec![PromptMessage::system(ANALYST_PROMPT), PromptMessage::user(prompt)],
        temperature: INSIGHT_TEMPERATURE,
        max_tokens: INSIGHT_MAX_TOKENS,
    }
}

fn join_items(items: &[SummaryItem]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .take(PROMPT_ITEMS)
        .map(|item| item.summary.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
