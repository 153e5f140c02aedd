//! AI Planner: one encrypted daily plan per user per (UTC) calendar day.
//!
//! Flow: anonymized request payload → prompt → text completion (or offline template) →
//! lenient parse → encrypt → persist under `{user_id}/{YYYY-MM-DD}` → return.
//! `generate_daily_plan` never fails; every error path ends in an offline template plan.
//! Reading the cache before generating is the caller's job (`get_today_plan`).

mod completion;
mod prompt;
mod templates;

pub use completion::{ChatCompletionClient, TextCompletion, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use prompt::{build_prompt, extract_json_object, parse_plan, ParsedPlan, SYSTEM_PROMPT};
pub use templates::{offline_template, TemplateSelector, TEMPLATE_COUNT};

use crate::crypto::EncryptionService;
use crate::error::PlanError;
use crate::records::{PlanRecord, TaskCategory};
use crate::store::{get_record, put_record, RecordStore};
use crate::summarizer::BehaviorSummarizer;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Upper bound on suggestions kept from any source.
pub const MAX_PLAN_TASKS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTaskSuggestion {
    pub title: String,
    pub category: TaskCategory,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPlan {
    pub tasks: Vec<AiTaskSuggestion>,
    pub motivational_quote: String,
    pub insights: Vec<String>,
    pub focus_area: String,
}

enum PlanSource {
    Model(String),
    Offline(AiPlan),
}

pub struct AiPlanner {
    summarizer: Arc<BehaviorSummarizer>,
    store: Arc<dyn RecordStore>,
    vault: Arc<EncryptionService>,
    completion: Arc<dyn TextCompletion>,
    templates: TemplateSelector,
}

impl AiPlanner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        vault: Arc<EncryptionService>,
        completion: Arc<dyn TextCompletion>,
    ) -> Self {
        let summarizer = Arc::new(BehaviorSummarizer::new(store.clone(), vault.clone()));
        Self::with_summarizer(summarizer, store, vault, completion)
    }

    pub fn with_summarizer(
        summarizer: Arc<BehaviorSummarizer>,
        store: Arc<dyn RecordStore>,
        vault: Arc<EncryptionService>,
        completion: Arc<dyn TextCompletion>,
    ) -> Self {
        Self {
            summarizer,
            store,
            vault,
            completion,
            templates: TemplateSelector::default(),
        }
    }

    pub fn with_templates(mut self, templates: TemplateSelector) -> Self {
        self.templates = templates;
        self
    }

    pub fn summarizer(&self) -> &BehaviorSummarizer {
        &self.summarizer
    }

    /// Today's cached plan, if one exists and decrypts.
    pub async fn get_today_plan(&self, user_id: &str) -> Option<AiPlan> {
        self.get_plan_for(user_id, Utc::now().date_naive()).await
    }

    pub async fn get_plan_for(&self, user_id: &str, date: NaiveDate) -> Option<AiPlan> {
        let key = date.format("%Y-%m-%d").to_string();
        let record = match get_record::<PlanRecord>(self.store.as_ref(), user_id, &key).await {
            Ok(Some(r)) => r,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(target: "dayflow::planner", date = %key, error = %e, "plan lookup failed");
                return None;
            }
        };
        match self.vault.decrypt_user_data::<AiPlan>(&record.encrypted_data) {
            Ok(plan) => Some(plan),
            Err(e) => {
                tracing::warn!(target: "dayflow::planner", date = %key, error = %e, "cached plan did not decrypt");
                None
            }
        }
    }

    /// Generates, persists and returns today's plan. Never fails.
    pub async fn generate_daily_plan(&self, user_id: &str) -> AiPlan {
        self.generate_plan_for(user_id, Utc::now().date_naive()).await
    }

    /// Generates and persists the plan for `date`, overwriting any earlier one.
    pub async fn generate_plan_for(&self, user_id: &str, date: NaiveDate) -> AiPlan {
        let date_key = date.format("%Y-%m-%d").to_string();
        match self.try_generate(user_id, date, &date_key).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    target: "dayflow::planner",
                    date = %date_key,
                    error = %e,
                    "plan generation failed; returning offline template"
                );
                offline_template(self.templates.pick(&date_key))
            }
        }
    }

    async fn try_generate(
        &self,
        user_id: &str,
        date: NaiveDate,
        date_key: &str,
    ) -> Result<AiPlan, PlanError> {
        let request_data = self.summarizer.prepare_ai_request_data(user_id).await;
        let prompt = build_prompt(&request_data, self.summarizer.window_days());

        let mut plan = match self.request(&prompt, date_key).await {
            PlanSource::Offline(plan) => plan,
            PlanSource::Model(raw) => {
                let fallback = offline_template(self.templates.pick(date_key));
                match parse_plan(&raw, &fallback) {
                    Ok(parsed) => {
                        if !parsed.substituted.is_empty() {
                            tracing::info!(
                                target: "dayflow::planner",
                                fields = ?parsed.substituted,
                                "filled invalid plan fields from offline template"
                            );
                        }
                        parsed.plan
                    }
                    Err(e) => {
                        tracing::warn!(target: "dayflow::planner", error = %e, "unusable model output; using offline template");
                        fallback
                    }
                }
            }
        };
        plan.tasks.truncate(MAX_PLAN_TASKS);

        self.save_plan(user_id, date, &plan).await?;
        Ok(plan)
    }

    async fn request(&self, prompt: &str, date_key: &str) -> PlanSource {
        if !self.completion.is_available() {
            tracing::debug!(target: "dayflow::planner", "text completion unavailable; offline plan");
            return PlanSource::Offline(offline_template(self.templates.pick(date_key)));
        }
        match self.completion.complete(SYSTEM_PROMPT, prompt).await {
            Ok(raw) => PlanSource::Model(raw),
            Err(e) => {
                tracing::warn!(target: "dayflow::planner", error = %e, "text completion failed; offline plan");
                PlanSource::Offline(offline_template(self.templates.pick(date_key)))
            }
        }
    }

    async fn save_plan(&self, user_id: &str, date: NaiveDate, plan: &AiPlan) -> Result<(), PlanError> {
        let record = PlanRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            date,
            summary_json: serde_json::to_string(plan)?,
            encrypted_data: self.vault.encrypt_user_data(plan)?,
            created_at: Utc::now(),
        };
        put_record(self.store.as_ref(), &record).await?;
        tracing::info!(
            target: "dayflow::planner",
            date = %date,
            tasks = plan.tasks.len(),
            "daily plan saved"
        );
        Ok(())
    }
}
