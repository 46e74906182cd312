//! # Category Module
//!
//! ユーザーのメッセージを健康トラッキング用のカテゴリに分類するための型を提供する。
//!
//! - **symptom**: 原因に触れない体調の記述（"I feel bloated"）
//! - **dietary**: 飲食の記録（"I ate bread"）
//! - **trigger**: 食べ物・行動と症状の因果関係（"Pizza makes me bloated"）
//! - **general**: 健康情報を含まない会話
//!
//! `general`は他のカテゴリと排他的。具体的なカテゴリが一つでもあれば`general`は除外される。
//!
//! ## 使用例
//!
//! ```rust
//! use digestigo_core::category::{Categorization, Category, FoodCategory};
//!
//! let c = Categorization::fallback("I ate bread");
//! assert!(c.is_general_only());
//! assert_eq!(Category::parse_lenient("Dietary"), Some(Category::Dietary));
//! assert_eq!(FoodCategory::parse_lenient("fibre"), Some(FoodCategory::Fibre));
//! ```

mod builtin;
pub(crate) mod categorization;

// Re-exports
pub use builtin::{Category, FoodCategory};
pub use categorization::{ellipsize, truncate_chars, Categorization, MAX_KEYWORDS, MAX_SUMMARY_WORDS};
