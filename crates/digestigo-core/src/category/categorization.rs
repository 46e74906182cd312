//! Categorization
//!
//! 分類器の出力を検証・正規化した結果。永続化はされない。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::builtin::{Category, FoodCategory};

/// キーワードの最大数
pub const MAX_KEYWORDS: usize = 5;

/// サマリーの最大単語数
pub const MAX_SUMMARY_WORDS: usize = 15;

/// フォールバックサマリーの最大文字数（省略記号込み）
const FALLBACK_SUMMARY_CHARS: usize = 80;
const ELLIPSIS: &str = "...";

/// 一つのメッセージに対する分類結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorization {
    /// 割り当てられたカテゴリ（空でない、重複なし、分類器の出現順）
    pub categories: Vec<Category>,
    /// `dietary`のときの栄養区分
    pub food_category: Option<FoodCategory>,
    /// キーワード（最大5件）
    pub keywords: Vec<String>,
    /// カテゴリごとのサマリー
    pub summaries: BTreeMap<Category, String>,
    /// `trigger`から読み取れる症状
    pub extracted_symptom: Option<String>,
}

impl Categorization {
    /// 解析失敗時のデフォルト分類
    pub fn fallback(message: &str) -> Self {
        let mut summaries = BTreeMap::new();
        summaries.insert(Category::General, ellipsize(message));
        Self {
            categories: vec![Category::General],
            food_category: None,
            keywords: Vec::new(),
            summaries,
            extracted_symptom: None,
        }
    }

    /// `{general}`のみか
    pub fn is_general_only(&self) -> bool {
        self.categories.iter().all(|c| !c.is_trackable())
    }

    pub fn contains(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// 最初に割り当てられたカテゴリ
    pub fn primary(&self) -> Category {
        self.categories.first().copied().unwrap_or(Category::General)
    }

    pub fn summary_for(&self, category: Category) -> Option<&str> {
        self.summaries.get(&category).map(|s| s.as_str())
    }

    /// 追加の症状エントリを書くべきか
    ///
    /// `trigger`があり、症状が抽出されていて、`symptom`が未割り当ての場合のみ。
    pub fn implied_symptom(&self) -> Option<&str> {
        if self.contains(Category::Trigger) && !self.contains(Category::Symptom) {
            self.extracted_symptom.as_deref()
        } else {
            None
        }
    }
}

/// カテゴリ列を正規化
///
/// 重複を除き、具体的なカテゴリがあれば`general`を取り除く。空なら`{general}`。
pub(crate) fn normalize_categories(raw: impl IntoIterator<Item = Category>) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();
    for category in raw {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    if categories.iter().any(|c| c.is_trackable()) {
        categories.retain(|c| c.is_trackable());
    }
    if categories.is_empty() {
        categories.push(Category::General);
    }
    categories
}

/// 先頭`max`文字（UTF-8境界を保つ）
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// 80文字以内に収める（省略記号込み）
///
/// 77文字を超える場合のみ、先頭77文字に`...`を付ける。
pub fn ellipsize(message: &str) -> String {
    let keep = FALLBACK_SUMMARY_CHARS - ELLIPSIS.len();
    if message.chars().count() > keep {
        format!("{}{}", truncate_chars(message, keep), ELLIPSIS)
    } else {
        message.to_string()
    }
}

/// サマリーを最大単語数に切り詰める
pub(crate) fn clamp_words(summary: &str, max: usize) -> String {
    summary
        .split_whitespace()
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ellipsize_short_message_unchanged() {
        assert_eq!(ellipsize("I feel bloated"), "I feel bloated");
        let exact = "a".repeat(77);
        assert_eq!(ellipsize(&exact), exact);
    }

    #[test]
    fn test_ellipsize_long_message() {
        let long = "b".repeat(78);
        let out = ellipsize(&long);
        assert_eq!(out.chars().count(), 80);
        assert!(out.ends_with("..."));
        assert!(out.starts_with(&"b".repeat(77)));
    }

    #[test]
    fn test_truncate_chars_respects_utf8() {
        let s = "胃が痛い";
        assert_eq!(truncate_chars(s, 2), "胃が");
        assert_eq!(truncate_chars(s, 10), s);
    }

    #[test]
    fn test_normalize_drops_general_when_specific_present() {
        let cats = normalize_categories(vec![
            Category::General,
            Category::Trigger,
            Category::Dietary,
            Category::Trigger,
        ]);
        assert_eq!(cats, vec![Category::Trigger, Category::Dietary]);
    }

    #[test]
    fn test_normalize_empty_becomes_general() {
        assert_eq!(normalize_categories(Vec::new()), vec![Category::General]);
    }

    #[test]
    fn test_clamp_words() {
        let summary = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        let clamped = clamp_words(summary, MAX_SUMMARY_WORDS);
        assert_eq!(clamped.split_whitespace().count(), 15);
        assert!(clamped.ends_with("fifteen"));
    }

    #[test]
    fn test_implied_symptom_only_without_symptom_category() {
        let mut c = Categorization::fallback("x");
        c.categories = vec![Category::Trigger];
        c.extracted_symptom = Some("bloating".into());
        assert_eq!(c.implied_symptom(), Some("bloating"));

        c.categories = vec![Category::Trigger, Category::Symptom];
        assert_eq!(c.implied_symptom(), None);
    }
}
