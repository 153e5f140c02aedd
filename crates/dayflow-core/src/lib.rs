//! dayflow-core: privacy-preserving daily planner (encrypted records, behavior summarizer,
//! goal forecaster, AI planner).
//!
//! Sensitive fields never leave the process in plaintext: records are encrypted with the
//! signed-in user's key, and the planner only ever sends an anonymized statistical profile
//! to the text-completion service.

mod config;
mod crypto;
mod error;
mod forecast;
mod records;
mod secure_memory;
mod sentiment;
mod session;
mod streak;
mod tracker;
pub mod planner;
pub mod store;
pub mod summarizer;

// Configuration
pub use config::{ConfigError, DayflowConfig, TemplateSelection, UserConfig};

// Encryption
pub use crypto::{EncryptedBlob, EncryptionKey, EncryptionService, KEY_LEN, NONCE_LEN};
pub use secure_memory::SecretBuf;

pub use error::{CompletionError, CryptoError, PlanError, SessionError, StoreError, TrackerError};

// Records + store
pub use records::{
    day_key, Behavior, BehaviorKind, BehaviorPayload, PlanRecord, Reflection, ReflectionPayload,
    Streak, Task, TaskCategory, TaskPayload, User,
};
pub use store::{Collection, MemoryRecordStore, RecordStore, SledRecordStore, StoredRecord};

// Analytics
pub use forecast::forecast_goal_completion;
pub use sentiment::{analyze_sentiment, SentimentInput};
pub use summarizer::{AnonymizedData, BehaviorPatterns, BehaviorSummarizer, BehaviorSummary};

// Planner
pub use planner::{
    AiPlan, AiPlanner, AiTaskSuggestion, ChatCompletionClient, TemplateSelector, TextCompletion,
    MAX_PLAN_TASKS,
};

// Write side
pub use session::{SessionManager, SignInProfile};
pub use streak::{current_streak, update_streak, DAILY_TASKS_HABIT};
pub use tracker::{NewTask, TaskUpdate, Tracker};
