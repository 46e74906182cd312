//! Classification Response Parser
//!
//! 分類器の生テキストを`Categorization`に変換する全域関数。
//! 不正な出力はすべてここで吸収し、呼び出し元へエラーを伝播しない。

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::category::categorization::{clamp_words, normalize_categories};
use crate::category::{ellipsize, Categorization, Category, FoodCategory, MAX_KEYWORDS, MAX_SUMMARY_WORDS};

/// 応答テキストを解析する
///
/// `message`は元のユーザーメッセージ。フォールバックのサマリーに使う。
pub fn parse_categorization(raw: &str, message: &str) -> Categorization {
    let cleaned = strip_code_fences(raw);
    let json_str = extract_json_object(&cleaned);

    let object = match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            warn!(kind = value_kind(&other), "Classifier reply is not a JSON object, using fallback");
            return Categorization::fallback(message);
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse classifier reply, using fallback");
            debug!(reply = %cleaned, "Unparseable classifier reply");
            return Categorization::fallback(message);
        }
    };

    let categories = decode_categories(&object);
    let summaries = decode_summaries(&object, &categories, message);

    Categorization {
        food_category: object
            .get("foodCategory")
            .and_then(Value::as_str)
            .and_then(FoodCategory::parse_lenient),
        keywords: decode_keywords(&object),
        extracted_symptom: object
            .get("extractedSymptom")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        categories,
        summaries,
    }
}

/// Markdownのコードフェンスとインラインのバッククォートを除去
pub fn strip_code_fences(raw: &str) -> String {
    raw.trim()
        .replace("```json\n", "")
        .replace("```json", "")
        .replace("```\n", "")
        .replace('`', "")
        .trim()
        .to_string()
}

/// 前後の余計なテキストを除いてJSONオブジェクト部分を抽出
fn extract_json_object(output: &str) -> &str {
    if let (Some(start), Some(end)) = (output.find('{'), output.rfind('}')) {
        if start < end {
            return &output[start..=end];
        }
    }
    output
}

fn decode_categories(object: &Map<String, Value>) -> Vec<Category> {
    match object.get("categories") {
        Some(Value::Array(items)) if !items.is_empty() => normalize_categories(
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Category::parse_lenient),
        ),
        _ => {
            // 旧形式: 単一の"category"フィールド
            let legacy = object
                .get("category")
                .and_then(Value::as_str)
                .and_then(Category::parse_lenient)
                .unwrap_or(Category::General);
            normalize_categories([legacy])
        }
    }
}

fn decode_summaries(
    object: &Map<String, Value>,
    categories: &[Category],
    message: &str,
) -> std::collections::BTreeMap<Category, String> {
    let mut summaries = std::collections::BTreeMap::new();

    if let Some(Value::Object(map)) = object.get("summaries") {
        for (key, value) in map {
            let Some(category) = Category::parse_lenient(key) else {
                continue;
            };
            if !categories.contains(&category) {
                continue;
            }
            if let Some(text) = value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
                summaries.insert(category, clamp_words(text, MAX_SUMMARY_WORDS));
            }
        }
    }

    // 単一の"summary"はsummariesが空のときだけ使う。部分的な欠落はメッセージで埋める
    let single = if summaries.is_empty() {
        object
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| clamp_words(s, MAX_SUMMARY_WORDS))
    } else {
        None
    };

    for category in categories {
        summaries
            .entry(*category)
            .or_insert_with(|| single.clone().unwrap_or_else(|| ellipsize(message)));
    }

    summaries
}

fn decode_keywords(object: &Map<String, Value>) -> Vec<String> {
    match object.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(MAX_KEYWORDS)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
