//! Prompt construction and lenient parsing of the model's plan.

use super::{AiPlan, AiTaskSuggestion, MAX_PLAN_TASKS};
use crate::error::PlanError;
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "You are a thoughtful, empathetic productivity coach. \
    Create personalized daily plans based on user behavior patterns. \
    Focus on realistic, achievable tasks that align with the user's goals and patterns. \
    Always include a motivational quote and practical insights. \
    Respond with JSON only.";

/// User message carrying the anonymized request payload.
pub fn build_prompt(request_data: &str, window_days: u32) -> String {
    format!(
        r#"User Behavior Summary (Last {days} Days):
{data}

Please generate a personalized daily plan with:
1. 3-5 specific, achievable tasks across different categories (work, personal, health, learning, other)
2. A motivational quote relevant to their patterns
3. 2-3 insights about their productivity patterns
4. One focus area for the day

Respond with a JSON object exactly in this format:
{{
  "tasks": [
    {{
      "title": "specific task description",
      "category": "work|personal|health|learning|other",
      "reason": "why this task suits their patterns",
      "estimatedTime": "optional time suggestion"
    }}
  ],
  "motivationalQuote": "relevant quote with author",
  "insights": ["insight 1", "insight 2"],
  "focusArea": "single focus area"
}}"#,
        days = window_days,
        data = request_data
    )
}

/// Result of parsing model output against a fallback template.
#[derive(Debug)]
pub struct ParsedPlan {
    pub plan: AiPlan,
    /// Fields that were filled from the template.
    pub substituted: Vec<&'static str>,
}

/// The `{ ... }` span of `raw`, ignoring code fences and chatter around it.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parses model output. Non-JSON output is an error; individually missing or invalid
/// fields are taken from `fallback`. Tasks are capped at [`MAX_PLAN_TASKS`].
pub fn parse_plan(raw: &str, fallback: &AiPlan) -> Result<ParsedPlan, PlanError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| PlanError::Malformed("no JSON object in response".to_string()))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| PlanError::Malformed(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| PlanError::Malformed("response is not an object".to_string()))?;

    let mut substituted = Vec::new();

    let tasks: Vec<AiTaskSuggestion> = obj
        .get("tasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|t| serde_json::from_value(t.clone()).ok())
                .filter(|t: &AiTaskSuggestion| !t.title.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();
    let mut tasks = if tasks.is_empty() {
        substituted.push("tasks");
        fallback.tasks.clone()
    } else {
        tasks
    };
    tasks.truncate(MAX_PLAN_TASKS);

    let motivational_quote = match non_empty_str(obj.get("motivationalQuote")) {
        Some(q) => q,
        None => {
            substituted.push("motivationalQuote");
            fallback.motivational_quote.clone()
        }
    };

    let insights: Vec<String> = obj
        .get("insights")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|i| non_empty_str(Some(i))).collect())
        .unwrap_or_default();
    let insights = if insights.is_empty() {
        substituted.push("insights");
        fallback.insights.clone()
    } else {
        insights
    };

    let focus_area = match non_empty_str(obj.get("focusArea")) {
        Some(f) => f,
        None => {
            substituted.push("focusArea");
            fallback.focus_area.clone()
        }
    };

    Ok(ParsedPlan {
        plan: AiPlan {
            tasks,
            motivational_quote,
            insights,
            focus_area,
        },
        substituted,
    })
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
