//! Behavior Summarizer: turns a window of encrypted records into an anonymized profile.
//!
//! Records are fetched by the plaintext index (user + timestamp/date), then tasks and
//! reflections are decrypted one by one. A record whose blob does not open is dropped from
//! the aggregate (see [`DecryptOutcome`]); its siblings are unaffected. Any other failure
//! (store errors) yields [`AnonymizedData::neutral`] so the planner always has input.
//!
//! Hour-of-day and calendar-day bucketing use UTC.

use crate::crypto::{EncryptedBlob, EncryptionService};
use crate::error::{CryptoError, StoreError};
use crate::forecast::forecast_goal_completion;
use crate::records::{
    Behavior, BehaviorKind, Reflection, ReflectionPayload, Task, TaskCategory, TaskPayload,
};
use crate::sentiment::{analyze_sentiment, SentimentInput};
use crate::store::{query_records, RecordStore};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Default look-back window in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;
/// Placeholder category when there are no tasks.
pub const GENERAL_CATEGORY: &str = "general";
/// Peak hour reported when there are no behavior events.
pub const DEFAULT_PEAK_HOUR: &str = "14:00";
/// Productive hours reported when there are no behavior events.
pub const DEFAULT_PRODUCTIVE_HOURS: [&str; 3] = ["09:00", "14:00", "16:00"];

const TOP_CATEGORIES: usize = 3;
const TOP_BEHAVIORS: usize = 5;
const TOP_HOURS: usize = 3;
// No data at all vs. data with no aligned days.
const MOOD_CORRELATION_NO_DATA: f64 = 0.7;
const MOOD_CORRELATION_UNMATCHED: f64 = 0.0;

/// Aggregate counts and rates for the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// 0–100.
    pub completion_rate: f64,
    pub frequent_categories: Vec<String>,
    /// 0–100: share of window days with a reflection.
    pub reflection_consistency: f64,
    /// Mean mood (1–5), 0 when there are no reflections.
    pub average_mood: f64,
    pub productive_hours: Vec<String>,
    pub common_behaviors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorPatterns {
    pub best_performing_category: String,
    pub worst_performing_category: String,
    pub mood_correlation: f64,
    /// `HH:00`.
    pub peak_productivity: String,
}

/// Everything the planner may see. No titles, free text or identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymizedData {
    pub summary: BehaviorSummary,
    pub patterns: BehaviorPatterns,
    /// -1.0 ..= 1.0
    pub sentiment: f64,
    /// Goal success probability, 0.0 ..= 1.0.
    pub forecast: f64,
}

impl AnonymizedData {
    /// Fixed neutral profile used when aggregation fails.
    pub fn neutral() -> Self {
        Self {
            summary: BehaviorSummary {
                total_tasks: 0,
                completed_tasks: 0,
                completion_rate: 0.0,
                frequent_categories: Vec::new(),
                reflection_consistency: 0.0,
                average_mood: 3.0,
                productive_hours: default_productive_hours(),
                common_behaviors: Vec::new(),
            },
            patterns: BehaviorPatterns {
                best_performing_category: GENERAL_CATEGORY.to_string(),
                worst_performing_category: GENERAL_CATEGORY.to_string(),
                mood_correlation: 0.5,
                peak_productivity: DEFAULT_PEAK_HOUR.to_string(),
            },
            sentiment: 0.0,
            forecast: 0.0,
        }
    }
}

/// Outcome of opening one record's blob.
#[derive(Debug)]
pub enum DecryptOutcome<'a, R, P> {
    Decrypted { record: &'a R, payload: P },
    Dropped { id: String, error: CryptoError },
}

/// Records carrying an encrypted payload.
pub trait SealedRecord {
    fn record_id(&self) -> &str;
    fn sealed(&self) -> &EncryptedBlob;
}

impl SealedRecord for Task {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn sealed(&self) -> &EncryptedBlob {
        &self.encrypted_data
    }
}

impl SealedRecord for Reflection {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn sealed(&self) -> &EncryptedBlob {
        &self.encrypted_data
    }
}

impl SealedRecord for Behavior {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn sealed(&self) -> &EncryptedBlob {
        &self.encrypted_data
    }
}

/// Opens every record independently; a failure only affects its own entry.
pub fn decrypt_each<'a, R, P>(
    vault: &EncryptionService,
    records: &'a [R],
) -> Vec<DecryptOutcome<'a, R, P>>
where
    R: SealedRecord,
    P: DeserializeOwned,
{
    records
        .iter()
        .map(|record| match vault.decrypt_user_data::<P>(record.sealed()) {
            Ok(payload) => DecryptOutcome::Decrypted { record, payload },
            Err(error) => DecryptOutcome::Dropped {
                id: record.record_id().to_string(),
                error,
            },
        })
        .collect()
}

/// Keeps decrypted entries, logging and discarding the dropped ones.
pub fn keep_decrypted<'a, R, P>(
    outcomes: Vec<DecryptOutcome<'a, R, P>>,
    kind: &str,
) -> Vec<(&'a R, P)> {
    outcomes
        .into_iter()
        .filter_map(|o| match o {
            DecryptOutcome::Decrypted { record, payload } => Some((record, payload)),
            DecryptOutcome::Dropped { id, error } => {
                tracing::warn!(
                    target: "dayflow::summarizer",
                    kind,
                    id = %id,
                    error = %error,
                    "dropping record that failed to decrypt"
                );
                None
            }
        })
        .collect()
}

/// Plain facts the aggregation works on (already decrypted and filtered).
#[derive(Debug, Clone, Default)]
pub struct SummaryInput {
    pub tasks: Vec<TaskFact>,
    pub reflections: Vec<ReflectionFact>,
    /// Dates of every reflection in the window, decryptable or not.
    pub reflection_dates: Vec<NaiveDate>,
    pub behaviors: Vec<BehaviorFact>,
    pub days: u32,
}

#[derive(Debug, Clone)]
pub struct TaskFact {
    pub category: TaskCategory,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReflectionFact {
    pub date: NaiveDate,
    pub mood: u8,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct BehaviorFact {
    pub kind: BehaviorKind,
    pub timestamp: DateTime<Utc>,
}

/// Summarizer over a record store and the session's vault.
pub struct BehaviorSummarizer {
    store: Arc<dyn RecordStore>,
    vault: Arc<EncryptionService>,
    window_days: u32,
}

impl BehaviorSummarizer {
    pub fn new(store: Arc<dyn RecordStore>, vault: Arc<EncryptionService>) -> Self {
        Self {
            store,
            vault,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Window used by [`Self::prepare_ai_request_data`].
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days.max(1);
        self
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Anonymized profile of the last `days` days. Never fails.
    pub async fn generate_summary(&self, user_id: &str, days: u32) -> AnonymizedData {
        self.generate_summary_at(user_id, days, Utc::now()).await
    }

    /// Same as [`Self::generate_summary`] with an explicit "now".
    pub async fn generate_summary_at(
        &self,
        user_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> AnonymizedData {
        match self.collect(user_id, days, now).await {
            Ok(input) => summarize(&input),
            Err(e) => {
                tracing::warn!(
                    target: "dayflow::summarizer",
                    error = %e,
                    "summary generation failed; using neutral profile"
                );
                AnonymizedData::neutral()
            }
        }
    }

    async fn collect(
        &self,
        user_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<SummaryInput, StoreError> {
        let days = days.max(1);
        // Windows reaching past chrono's range start at the earliest representable instant.
        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let start_day = start.date_naive();
        let store = self.store.as_ref();

        let (mut tasks, mut behaviors, mut reflections) = tokio::try_join!(
            query_records::<Task, _>(store, user_id, |t| t.created_at >= start),
            query_records::<Behavior, _>(store, user_id, |b| b.timestamp >= start),
            query_records::<Reflection, _>(store, user_id, |r| r.date >= start_day),
        )?;
        tasks.sort_by_key(|t| t.created_at);
        behaviors.sort_by_key(|b| b.timestamp);
        reflections.sort_by_key(|r| r.date);

        let open_tasks = keep_decrypted(decrypt_each::<_, TaskPayload>(&self.vault, &tasks), "task");
        let open_reflections = keep_decrypted(
            decrypt_each::<_, ReflectionPayload>(&self.vault, &reflections),
            "reflection",
        );
        tracing::debug!(
            target: "dayflow::summarizer",
            tasks = tasks.len(),
            tasks_open = open_tasks.len(),
            reflections = reflections.len(),
            reflections_open = open_reflections.len(),
            behaviors = behaviors.len(),
            days,
            "window collected"
        );

        Ok(SummaryInput {
            tasks: open_tasks
                .into_iter()
                .map(|(t, _)| TaskFact {
                    category: t.category,
                    completed: t.completed,
                    created_at: t.created_at,
                })
                .collect(),
            reflections: open_reflections
                .into_iter()
                .map(|(r, p)| ReflectionFact {
                    date: r.date,
                    mood: p.mood,
                    text: p.text,
                })
                .collect(),
            reflection_dates: reflections.iter().map(|r| r.date).collect(),
            behaviors: behaviors
                .iter()
                .map(|b| BehaviorFact {
                    kind: b.kind,
                    timestamp: b.timestamp,
                })
                .collect(),
            days,
        })
    }

    /// Strictly anonymized JSON for the text-completion collaborator.
    pub async fn prepare_ai_request_data(&self, user_id: &str) -> String {
        let data = self.generate_summary(user_id, self.window_days).await;
        let payload = AiRequestPayload::from(&data);
        serde_json::to_string_pretty(&payload).unwrap_or_else(|e| {
            tracing::warn!(target: "dayflow::summarizer", error = %e, "request payload serialization failed");
            "{}".to_string()
        })
    }
}

/// The shape sent across the privacy boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequestPayload {
    pub productivity: ProductivityBlock,
    pub wellbeing: WellbeingBlock,
    pub patterns: BehaviorPatterns,
    pub productive_hours: Vec<String>,
    pub forecasting: ForecastBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityBlock {
    pub task_completion: i64,
    pub consistent_categories: Vec<String>,
    pub total_tasks_completed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellbeingBlock {
    pub mood_trend: f64,
    pub reflection_habit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastBlock {
    pub goal_success_probability: f64,
}

impl From<&AnonymizedData> for AiRequestPayload {
    fn from(data: &AnonymizedData) -> Self {
        let s = &data.summary;
        Self {
            productivity: ProductivityBlock {
                task_completion: s.completion_rate.round() as i64,
                consistent_categories: s.frequent_categories.clone(),
                total_tasks_completed: s.completed_tasks,
            },
            wellbeing: WellbeingBlock {
                mood_trend: round_to(s.average_mood, 1),
                reflection_habit: s.reflection_consistency.round() as i64,
            },
            patterns: data.patterns.clone(),
            productive_hours: s.productive_hours.clone(),
            forecasting: ForecastBlock {
                goal_success_probability: round_to(data.forecast, 2),
            },
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn default_productive_hours() -> Vec<String> {
    DEFAULT_PRODUCTIVE_HOURS.iter().map(|h| h.to_string()).collect()
}

/// Pure aggregation over decrypted facts.
pub fn summarize(input: &SummaryInput) -> AnonymizedData {
    let days = input.days.max(1);
    let total_tasks = input.tasks.len();
    let completed_tasks = input.tasks.iter().filter(|t| t.completed).count();
    let completion_rate = if total_tasks > 0 {
        completed_tasks as f64 / total_tasks as f64 * 100.0
    } else {
        0.0
    };

    let frequent_categories = ranked(input.tasks.iter().map(|t| t.category))
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|c| c.as_str().to_string())
        .collect();

    let average_mood = if input.reflections.is_empty() {
        0.0
    } else {
        input.reflections.iter().map(|r| f64::from(r.mood)).sum::<f64>()
            / input.reflections.len() as f64
    };

    let distinct_days: HashSet<NaiveDate> = input.reflection_dates.iter().copied().collect();
    let reflection_consistency = (distinct_days.len() as f64 / f64::from(days) * 100.0).min(100.0);

    let common_behaviors = ranked(input.behaviors.iter().map(|b| b.kind))
        .into_iter()
        .take(TOP_BEHAVIORS)
        .map(|k| k.as_str().to_string())
        .collect();

    let hours = ranked(input.behaviors.iter().map(|b| b.timestamp.hour()));
    let productive_hours = if hours.is_empty() {
        default_productive_hours()
    } else {
        hours.iter().take(TOP_HOURS).map(|h| format_hour(*h)).collect()
    };
    let peak_productivity = hours
        .first()
        .map(|h| format_hour(*h))
        .unwrap_or_else(|| DEFAULT_PEAK_HOUR.to_string());

    let (best, worst) = category_extremes(&input.tasks);

    let sentiment_inputs: Vec<SentimentInput<'_>> = input
        .reflections
        .iter()
        .map(|r| SentimentInput::new(Some(r.mood), Some(r.text.as_str())))
        .collect();

    AnonymizedData {
        summary: BehaviorSummary {
            total_tasks,
            completed_tasks,
            completion_rate,
            frequent_categories,
            reflection_consistency,
            average_mood,
            productive_hours,
            common_behaviors,
        },
        patterns: BehaviorPatterns {
            best_performing_category: best,
            worst_performing_category: worst,
            mood_correlation: mood_correlation(&input.tasks, &input.reflections),
            peak_productivity,
        },
        sentiment: analyze_sentiment(&sentiment_inputs),
        forecast: forecast_goal_completion(completion_rate, reflection_consistency),
    }
}

/// Distinct items by descending count; ties keep first-encounter order.
fn ranked<T: PartialEq + Copy>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(k, _)| *k == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(k, _)| k).collect()
}

fn format_hour(hour: u32) -> String {
    format!("{:02}:00", hour)
}

/// Best and worst category by completion rate.
fn category_extremes(tasks: &[TaskFact]) -> (String, String) {
    let mut stats: Vec<(TaskCategory, usize, usize)> = Vec::new();
    for t in tasks {
        let idx = match stats.iter().position(|(c, _, _)| *c == t.category) {
            Some(i) => i,
            None => {
                stats.push((t.category, 0, 0));
                stats.len() - 1
            }
        };
        stats[idx].1 += 1;
        if t.completed {
            stats[idx].2 += 1;
        }
    }

    let rates: Vec<(TaskCategory, f64)> = stats
        .into_iter()
        .filter(|(_, total, _)| *total >= 1)
        .map(|(c, total, done)| (c, done as f64 / total as f64))
        .collect();

    let mut best: Option<(TaskCategory, f64)> = None;
    let mut worst: Option<(TaskCategory, f64)> = None;
    for (c, rate) in rates {
        if best.map_or(true, |(_, r)| rate > r) {
            best = Some((c, rate));
        }
        if worst.map_or(true, |(_, r)| rate < r) {
            worst = Some((c, rate));
        }
    }
    let name = |e: Option<(TaskCategory, f64)>| {
        e.map(|(c, _)| c.as_str().to_string())
            .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
    };
    (name(best), name(worst))
}

/// Average of (day completion rate × mood/5) over reflection days that also have tasks.
fn mood_correlation(tasks: &[TaskFact], reflections: &[ReflectionFact]) -> f64 {
    if tasks.is_empty() || reflections.is_empty() {
        return MOOD_CORRELATION_NO_DATA;
    }
    let mut by_day: HashMap<NaiveDate, (usize, usize)> = HashMap::new();
    for t in tasks {
        let entry = by_day.entry(t.created_at.date_naive()).or_insert((0, 0));
        entry.1 += 1;
        if t.completed {
            entry.0 += 1;
        }
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for r in reflections {
        if let Some((done, total)) = by_day.get(&r.date) {
            if *total > 0 {
                sum += (*done as f64 / *total as f64) * (f64::from(r.mood) / 5.0);
                count += 1;
            }
        }
    }
    if count == 0 {
        MOOD_CORRELATION_UNMATCHED
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 15, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn task(category: TaskCategory, completed: bool, day: u32) -> TaskFact {
        TaskFact {
            category,
            completed,
            created_at: at(day, 10),
        }
    }

    fn reflection(day: u32, mood: u8, text: &str) -> ReflectionFact {
        ReflectionFact {
            date: date(day),
            mood,
            text: text.to_string(),
        }
    }

    #[test]
    fn empty_window_uses_defaults() {
        let data = summarize(&SummaryInput {
            days: 7,
            ..Default::default()
        });
        assert_eq!(data.summary.total_tasks, 0);
        assert_eq!(data.summary.completion_rate, 0.0);
        assert_eq!(data.summary.average_mood, 0.0);
        assert_eq!(data.patterns.best_performing_category, GENERAL_CATEGORY);
        assert_eq!(data.patterns.worst_performing_category, GENERAL_CATEGORY);
        assert_eq!(data.patterns.mood_correlation, 0.7);
        assert_eq!(data.patterns.peak_productivity, "14:00");
        assert_eq!(data.summary.productive_hours, vec!["09:00", "14:00", "16:00"]);
        assert_eq!(data.sentiment, 0.0);
        assert_eq!(data.forecast, 0.0);
    }

    #[test]
    fn categories_ranked_with_insertion_tiebreak() {
        let input = SummaryInput {
            tasks: vec![
                task(TaskCategory::Health, true, 1),
                task(TaskCategory::Work, false, 1),
                task(TaskCategory::Learning, false, 1),
                task(TaskCategory::Work, true, 2),
                task(TaskCategory::Personal, false, 2),
            ],
            days: 7,
            ..Default::default()
        };
        let data = summarize(&input);
        assert_eq!(
            data.summary.frequent_categories,
            vec!["work", "health", "learning"]
        );
        assert_eq!(data.summary.completed_tasks, 2);
        assert!((data.summary.completion_rate - 40.0).abs() < 1e-9);
        assert_eq!(data.patterns.best_performing_category, "health");
        assert_eq!(data.patterns.worst_performing_category, "learning");
    }

    #[test]
    fn mood_correlation_aligns_days() {
        let input = SummaryInput {
            tasks: vec![
                task(TaskCategory::Work, true, 3),
                task(TaskCategory::Work, false, 3),
                task(TaskCategory::Health, true, 4),
            ],
            reflections: vec![reflection(3, 5, ""), reflection(4, 4, ""), reflection(6, 1, "")],
            reflection_dates: vec![date(3), date(4), date(6)],
            days: 7,
            ..Default::default()
        };
        let data = summarize(&input);
        // day 3: 0.5 * 1.0, day 4: 1.0 * 0.8
        assert!((data.patterns.mood_correlation - 0.65).abs() < 1e-9);
    }

    #[test]
    fn mood_correlation_zero_when_nothing_aligns() {
        let input = SummaryInput {
            tasks: vec![task(TaskCategory::Work, true, 1)],
            reflections: vec![reflection(5, 4, "")],
            reflection_dates: vec![date(5)],
            days: 7,
            ..Default::default()
        };
        assert_eq!(summarize(&input).patterns.mood_correlation, 0.0);
    }

    #[test]
    fn consistency_counts_distinct_dates_and_caps() {
        let mut input = SummaryInput {
            reflection_dates: vec![date(1), date(1), date(2)],
            days: 4,
            ..Default::default()
        };
        assert!((summarize(&input).summary.reflection_consistency - 50.0).abs() < 1e-9);

        input.reflection_dates = (1..=9).map(date).collect();
        assert_eq!(summarize(&input).summary.reflection_consistency, 100.0);
    }

    #[test]
    fn behaviors_drive_hours_and_common_kinds() {
        let input = SummaryInput {
            behaviors: vec![
                BehaviorFact { kind: BehaviorKind::AppOpen, timestamp: at(1, 8) },
                BehaviorFact { kind: BehaviorKind::TaskComplete, timestamp: at(1, 9) },
                BehaviorFact { kind: BehaviorKind::TaskComplete, timestamp: at(2, 9) },
                BehaviorFact { kind: BehaviorKind::TaskAdd, timestamp: at(2, 21) },
            ],
            days: 7,
            ..Default::default()
        };
        let data = summarize(&input);
        assert_eq!(data.patterns.peak_productivity, "09:00");
        assert_eq!(data.summary.productive_hours, vec!["09:00", "08:00", "21:00"]);
        assert_eq!(
            data.summary.common_behaviors,
            vec!["task_complete", "app_open", "task_add"]
        );
    }

    #[test]
    fn request_payload_rounds_fields() {
        let mut data = AnonymizedData::neutral();
        data.summary.completion_rate = 66.666;
        data.summary.average_mood = 3.46;
        data.summary.reflection_consistency = 42.857;
        data.forecast = 0.5954;
        data.sentiment = -0.126;
        let payload = AiRequestPayload::from(&data);
        assert_eq!(payload.productivity.task_completion, 67);
        assert_eq!(payload.wellbeing.mood_trend, 3.5);
        assert_eq!(payload.wellbeing.reflection_habit, 43);
        assert_eq!(payload.forecasting.goal_success_probability, 0.6);

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("sentiment").is_none());
    }
}
