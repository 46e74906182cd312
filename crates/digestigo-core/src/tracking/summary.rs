//! Tracking Summary
//!
//! エントリ列から集計値を作る純粋関数群。結果は毎回新しく計算され、永続化されない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::{Category, FoodCategory};

use super::entry::TrackingEntry;

/// 症状・トリガーの一覧項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub summary: String,
    pub keywords: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&TrackingEntry> for SummaryItem {
    fn from(entry: &TrackingEntry) -> Self {
        Self {
            summary: entry.summary.clone(),
            keywords: entry.keywords.clone(),
            timestamp: entry.timestamp,
        }
    }
}

/// 栄養区分ごとの件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietaryBreakdown {
    pub carbs: usize,
    pub proteins: usize,
    pub dairy: usize,
    pub fibre: usize,
}

impl DietaryBreakdown {
    pub fn get(&self, food: FoodCategory) -> usize {
        match food {
            FoodCategory::Carbs => self.carbs,
            FoodCategory::Proteins => self.proteins,
            FoodCategory::Dairy => self.dairy,
            FoodCategory::Fibre => self.fibre,
        }
    }

    fn increment(&mut self, food: FoodCategory) {
        match food {
            FoodCategory::Carbs => self.carbs += 1,
            FoodCategory::Proteins => self.proteins += 1,
            FoodCategory::Dairy => self.dairy += 1,
            FoodCategory::Fibre => self.fibre += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.carbs + self.proteins + self.dairy + self.fibre
    }

    /// 区分ごとの割合（整数%、四捨五入）
    pub fn percentages(&self) -> DietaryPercentages {
        let total = self.total();
        DietaryPercentages {
            carbs: percentage(self.carbs, total),
            proteins: percentage(self.proteins, total),
            dairy: percentage(self.dairy, total),
            fibre: percentage(self.fibre, total),
        }
    }
}

/// 栄養区分ごとの割合（%）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietaryPercentages {
    pub carbs: u32,
    pub proteins: u32,
    pub dairy: u32,
    pub fibre: u32,
}

/// 全エントリの集計結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSummary {
    pub symptoms: Vec<SummaryItem>,
    pub triggers: Vec<SummaryItem>,
    pub dietary: DietaryBreakdown,
    pub total_entries: usize,
}

impl TrackingSummary {
    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }
}

/// エントリ列を集計する
///
/// 決定的で、各区分内では挿入順を保つ。`foodCategory`のない食事エントリは
/// `total_entries`には数えるが栄養区分には含めない。
pub fn summarize(entries: &[TrackingEntry]) -> TrackingSummary {
    let mut summary = TrackingSummary {
        total_entries: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        match entry.category {
            Category::Symptom => summary.symptoms.push(SummaryItem::from(entry)),
            Category::Trigger => summary.triggers.push(SummaryItem::from(entry)),
            Category::Dietary => {
                if let Some(food) = entry.food_category {
                    summary.dietary.increment(food);
                }
            }
            Category::General => {}
        }
    }

    summary
}

/// `count / total`を整数%に変換（0.5は切り上げ）。`total == 0`なら0
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (count as u64 * 200 + total as u64) / (total as u64 * 2);
    scaled as u32
}
