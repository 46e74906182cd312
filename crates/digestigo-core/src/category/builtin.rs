//! Builtin Category Definitions
//!
//! トラッキング用のカテゴリとフードカテゴリの定義。
//! 分類器が返す文字列はここで型付きの値に変換される。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DigestigoError;

/// メッセージが伝える健康情報の種類
///
/// `Ord`は宣言順。サマリーのマップ順序や表示順に使われる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// 原因に触れずに体調を述べている
    Symptom,
    /// 食べ物・飲み物を摂取した
    Dietary,
    /// 食べ物や行動が症状を引き起こした（因果関係）
    Trigger,
    /// 挨拶、質問など健康情報を含まない
    General,
}

impl Category {
    /// 宣言順の全カテゴリ
    pub const ALL: [Category; 4] = [
        Category::Symptom,
        Category::Dietary,
        Category::Trigger,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symptom => "symptom",
            Self::Dietary => "dietary",
            Self::Trigger => "trigger",
            Self::General => "general",
        }
    }

    /// 分類器の文字列を寛容に解釈（大文字小文字・前後空白を無視）
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "symptom" => Some(Self::Symptom),
            "dietary" => Some(Self::Dietary),
            "trigger" => Some(Self::Trigger),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// トラッキング対象か（`general`以外）
    pub fn is_trackable(&self) -> bool {
        !matches!(self, Self::General)
    }

    /// 表示用ラベル
    pub fn label(&self) -> &'static str {
        match self {
            Self::Symptom => "Symptom",
            Self::Dietary => "Dietary",
            Self::Trigger => "Trigger",
            Self::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DigestigoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| DigestigoError::InvalidCategory {
            name: s.to_string(),
        })
    }
}

/// 食事エントリの栄養区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Carbs,
    Proteins,
    Dairy,
    Fibre,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 4] = [
        FoodCategory::Carbs,
        FoodCategory::Proteins,
        FoodCategory::Dairy,
        FoodCategory::Fibre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Carbs => "carbs",
            Self::Proteins => "proteins",
            Self::Dairy => "dairy",
            Self::Fibre => "fibre",
        }
    }

    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "carbs" => Some(Self::Carbs),
            "proteins" => Some(Self::Proteins),
            "dairy" => Some(Self::Dairy),
            "fibre" | "fiber" => Some(Self::Fibre),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Carbs => "Carbs",
            Self::Proteins => "Proteins",
            Self::Dairy => "Dairy",
            Self::Fibre => "Fibre",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
