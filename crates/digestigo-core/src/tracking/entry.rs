use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{Category, FoodCategory};

/// 永続化されたトラッキングエントリ（書き込み後は不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    /// 元のユーザーメッセージ
    pub message: String,
    #[serde(default)]
    pub food_category: Option<FoodCategory>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub summary: String,
}

impl TrackingEntry {
    /// 重複判定キー `(category, summary)`
    pub fn dedup_key(&self) -> (Category, &str) {
        (self.category, self.summary.as_str())
    }
}

/// id・timestamp採番前のエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub category: Category,
    pub message: String,
    pub food_category: Option<FoodCategory>,
    pub keywords: Vec<String>,
    pub summary: String,
}

impl NewEntry {
    pub fn new(category: Category, message: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            food_category: None,
            keywords: Vec::new(),
            summary: summary.into(),
        }
    }

    pub fn with_food_category(mut self, food_category: Option<FoodCategory>) -> Self {
        self.food_category = food_category;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn dedup_key(&self) -> (Category, &str) {
        (self.category, self.summary.as_str())
    }

    /// idと現在時刻を割り当てて確定
    pub(crate) fn into_entry(self) -> TrackingEntry {
        TrackingEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            category: self.category,
            message: self.message,
            food_category: self.food_category,
            keywords: self.keywords,
            summary: self.summary,
        }
    }
}
