//! Classification Request Builder
//!
//! メッセージから分類器へのリクエストを組み立てる。副作用なし、失敗しない。

use crate::category::{truncate_chars, Category};

use super::{ClassifierRequest, PromptMessage};

/// プロンプトに埋め込むメッセージの最大文字数
pub const MAX_MESSAGE_CHARS: usize = 500;

const DEFAULT_TEMPERATURE: f32 = 0.15;
const DEFAULT_MAX_TOKENS: u32 = 200;

const SYSTEM_PROMPT: &str = "You are a categorization assistant. Messages can have MULTIPLE categories. \
Return valid JSON only. Make summaries unique and descriptive. \
For triggers, extract symptom to extractedSymptom field.";

const CATEGORIZATION_PROMPT: &str = r#"Analyze this message and categorize it. Return ONLY valid JSON, no markdown.

CRITICAL RULES:
1. A message can belong to MULTIPLE categories - return ALL that apply
2. Summaries must be UNIQUE and DESCRIPTIVE (max 15 words)
3. NO duplicates - make each summary distinct

Required JSON format:
{"categories":["category1","category2"],"foodCategory":null,"keywords":["word1"],"summaries":{"category1":"unique summary 1","category2":"unique summary 2"},"extractedSymptom":null}

CATEGORY LOGIC - A MESSAGE CAN BE MULTIPLE:

1. dietary: User CONSUMED food/drink
   - "I ate pizza" = dietary
   - "I drank milk" = dietary
   - Track in foodCategory: carbs/proteins/dairy/fibre

2. trigger: Food/activity CAUSES a symptom (cause-effect relationship)
   - "Pizza makes me bloated" = trigger + dietary
   - "I ate spicy food and got diarrhea" = trigger + dietary
   - Summary: "[Food] may trigger [symptom] - watch out"
   - MUST extract symptom to extractedSymptom field

3. symptom: ONLY if describing feeling WITHOUT mentioning cause
   - "I feel bloated" = symptom only
   - "My stomach hurts" = symptom only
   - NOT for: "Pizza made me bloated" (that's trigger+dietary)

4. general: Greetings, questions, opinions without health info

EXAMPLES:
Message: "I ate pizza and got bloated"
→ {"categories":["dietary","trigger"],"foodCategory":"carbs","keywords":["pizza","bloating"],"summaries":{"dietary":"Ate pizza","trigger":"Pizza may trigger bloating - watch out"},"extractedSymptom":"bloating"}

Message: "Spicy food gives me diarrhea"
→ {"categories":["trigger"],"foodCategory":null,"keywords":["spicy","diarrhea"],"summaries":{"trigger":"Spicy food may trigger diarrhea - watch out"},"extractedSymptom":"diarrhea"}

Message: "I feel bloated"
→ {"categories":["symptom"],"foodCategory":null,"keywords":["bloated"],"summaries":{"symptom":"Experiencing bloating"},"extractedSymptom":null}

Message: "I ate bread"
→ {"categories":["dietary"],"foodCategory":"carbs","keywords":["bread"],"summaries":{"dietary":"Ate bread"},"extractedSymptom":null}

Message: "#;

/// 分類リクエストのビルダー
#[derive(Debug, Clone)]
pub struct ClassificationRequestBuilder {
    temperature: f32,
    max_tokens: u32,
}

impl Default for ClassificationRequestBuilder {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ClassificationRequestBuilder {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }

    /// 分類リクエストを構築
    ///
    /// メッセージは先頭500文字に切り詰めて埋め込む。空でも整形式のリクエストを返す。
    pub fn build_request(&self, message: &str) -> ClassifierRequest {
        let embedded = truncate_chars(message, MAX_MESSAGE_CHARS);
        ClassifierRequest {
            messages: vec![
                PromptMessage::system(SYSTEM_PROMPT),
                PromptMessage::user(format!("{CATEGORIZATION_PROMPT}{embedded}")),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// 手動カテゴリ変更を検証するリクエストを構築
    pub fn build_validation_request(&self, message: &str, requested: Category) -> ClassifierRequest {
        let instruction = format!(
            "VALIDATE: Does it make sense to categorize \"{message}\" as \"{requested}\"? \
             If yes, categorize it as {requested}. If no, use the original best category."
        );
        self.build_request(&instruction)
    }
}
