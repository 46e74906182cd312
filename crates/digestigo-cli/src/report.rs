//! Plain-text health report
//!
//! `TrackingSummary`を読むだけで、集計は行わない。

use std::fmt;

use digestigo_core::{FoodCategory, SummaryItem, TrackingSummary};

const RULE_WIDTH: usize = 60;

/// 表示用のレポート。`Display`で本文を書き出す
pub struct Report<'a> {
    pub summary: &'a TrackingSummary,
    pub insight: Option<&'a str>,
    /// ユーザーが添えるメモ（空白のみなら省略）
    pub notes: Option<&'a str>,
    pub date: &'a str,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let summary = self.summary;

        writeln!(f, "{rule}")?;
        writeln!(f, "DIGESTIVE HEALTH REPORT")?;
        writeln!(f, "Generated: {}", self.date)?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;

        if summary.is_empty() {
            writeln!(f, "No tracking data available.")?;
            return self.write_notes(f);
        }

        section(f, "OVERVIEW")?;
        writeln!(f, "{:<28}{:>8}", "Total entries", summary.total_entries)?;
        writeln!(f, "{:<28}{:>8}", "Symptoms reported", summary.symptoms.len())?;
        writeln!(f, "{:<28}{:>8}", "Triggers identified", summary.triggers.len())?;
        writeln!(f, "{:<28}{:>8}", "Dietary entries", summary.dietary.total())?;
        writeln!(f)?;

        if let Some(insight) = self.insight {
            section(f, "CLINICAL SUMMARY")?;
            writeln!(f, "{insight}")?;
            writeln!(f)?;
        }

        write_items(f, "REPORTED SYMPTOMS", &summary.symptoms, "No symptoms recorded.")?;

        section(f, "DIETARY INTAKE")?;
        let dietary = summary.dietary;
        let pct = dietary.percentages();
        writeln!(f, "{:<20}{:>8}{:>12}", "Food category", "Count", "Percentage")?;
        for food in FoodCategory::ALL {
            let percent = match food {
                FoodCategory::Carbs => pct.carbs,
                FoodCategory::Proteins => pct.proteins,
                FoodCategory::Dairy => pct.dairy,
                FoodCategory::Fibre => pct.fibre,
            };
            writeln!(
                f,
                "{:<20}{:>8}{:>11}%",
                food.label(),
                dietary.get(food),
                percent
            )?;
        }
        writeln!(f)?;

        write_items(f, "IDENTIFIED TRIGGERS", &summary.triggers, "No triggers identified.")?;

        self.write_notes(f)?;

        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "This report is generated from self-reported data and is not a medical diagnosis."
        )
    }
}

impl Report<'_> {
    fn write_notes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(notes) = self.notes.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(());
        };
        section(f, "PATIENT NOTES")?;
        writeln!(f, "{notes}")?;
        writeln!(f)
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(RULE_WIDTH))
}

fn write_items(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    items: &[SummaryItem],
    empty: &str,
) -> fmt::Result {
    section(f, title)?;
    if items.is_empty() {
        writeln!(f, "{empty}")?;
    }
    for item in items {
        writeln!(f, "- {} ({})", item.summary, item.timestamp.format("%Y-%m-%d"))?;
    }
    writeln!(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use digestigo_core::{summarize, Category, TrackingEntry};

    fn entry(category: Category, summary: &str, food: Option<FoodCategory>) -> TrackingEntry {
        TrackingEntry {
            id: summary.to_string(),
            timestamp: chrono::Utc::now(),
            category,
            message: "m".to_string(),
            food_category: food,
            keywords: Vec::new(),
            summary: summary.to_string(),
        }
    }

    fn render(summary: &TrackingSummary, insight: Option<&str>, notes: Option<&str>) -> String {
        Report {
            summary,
            insight,
            notes,
            date: "January 1, 2026",
        }
        .to_string()
    }

    #[test]
    fn test_render_empty() {
        let out = render(&TrackingSummary::default(), None, None);
        assert!(out.contains("Generated: January 1, 2026"));
        assert!(out.contains("No tracking data available."));
        assert!(!out.contains("PATIENT NOTES"));
    }

    #[test]
    fn test_render_dietary_table() {
        let summary = summarize(&[
            entry(Category::Dietary, "Ate bread", Some(FoodCategory::Carbs)),
            entry(Category::Dietary, "Ate rice", Some(FoodCategory::Carbs)),
            entry(Category::Dietary, "Drank milk", Some(FoodCategory::Dairy)),
            entry(Category::Trigger, "Milk may trigger gas - watch out", None),
        ]);
        let out = render(&summary, Some("Dairy seems to bother you."), None);

        assert!(out.contains(&format!("{:<20}{:>8}{:>11}%", "Carbs", 2, 67)));
        assert!(out.contains(&format!("{:<20}{:>8}{:>11}%", "Dairy", 1, 33)));
        assert!(out.contains("- Milk may trigger gas - watch out"));
        assert!(out.contains("No symptoms recorded."));
        assert!(out.contains("Dairy seems to bother you."));
    }

    #[test]
    fn test_render_includes_notes() {
        let summary = summarize(&[entry(Category::Symptom, "Experiencing bloating", None)]);
        let out = render(&summary, None, Some("  Started a new medication on Monday. "));

        let notes_at = out.find("PATIENT NOTES").unwrap();
        assert!(out[notes_at..].contains("Started a new medication on Monday."));
        assert!(notes_at > out.find("IDENTIFIED TRIGGERS").unwrap());
    }

    #[test]
    fn test_render_skips_blank_notes() {
        let summary = summarize(&[entry(Category::Symptom, "Experiencing bloating", None)]);
        let out = render(&summary, None, Some("   "));
        assert!(!out.contains("PATIENT NOTES"));
    }
}
