pub mod assistant;
pub mod category;
pub mod classifier;
pub mod config;
pub mod error;
pub mod insights;
pub mod orchestrator;
pub mod store;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use assistant::{ChatAssistant, ChatMessage, ChatReply};
pub use category::{Categorization, Category, FoodCategory};
pub use classifier::{
    parse_categorization, ClassificationRequestBuilder, Classifier, ClassifierRequest,
    CommandClassifier, PromptMessage, Role,
};
pub use config::Config;
pub use error::{DigestigoError, Result};
pub use insights::HealthInsights;
pub use orchestrator::{CategorizationOrchestrator, OrchestrationResult, OverrideOutcome};
pub use store::{
    FileStore, MemoryStore, Store, AI_SUMMARY_KEY, CHAT_MESSAGES_KEY, TRACKING_DATA_KEY,
};
pub use tracking::{
    percentage, summarize, DietaryBreakdown, DietaryPercentages, EntryStore, NewEntry,
    SummaryItem, TrackingEntry, TrackingSummary,
};
