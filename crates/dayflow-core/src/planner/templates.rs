//! Offline plan templates and their selection policy.

use super::{AiPlan, AiTaskSuggestion};
use crate::records::TaskCategory;
use std::sync::atomic::{AtomicUsize, Ordering};

fn suggestion(
    title: &str,
    category: TaskCategory,
    reason: &str,
    estimated_time: Option<&str>,
) -> AiTaskSuggestion {
    AiTaskSuggestion {
        title: title.to_string(),
        category,
        reason: reason.to_string(),
        estimated_time: estimated_time.map(str::to_string),
    }
}

/// Number of built-in templates.
pub const TEMPLATE_COUNT: usize = 2;

/// Built-in offline template `index % TEMPLATE_COUNT`.
pub fn offline_template(index: usize) -> AiPlan {
    match index % TEMPLATE_COUNT {
        0 => AiPlan {
            tasks: vec![
                suggestion(
                    "Review your goals for the week",
                    TaskCategory::Personal,
                    "Regular goal review helps maintain focus and direction",
                    Some("15 minutes"),
                ),
                suggestion(
                    "Take a mindful break outdoors",
                    TaskCategory::Health,
                    "Fresh air and movement boost creativity and wellbeing",
                    Some("20 minutes"),
                ),
                suggestion(
                    "Learn something new related to your interests",
                    TaskCategory::Learning,
                    "Continuous learning keeps the mind engaged and growing",
                    None,
                ),
            ],
            motivational_quote: "The secret of getting ahead is getting started. - Mark Twain"
                .to_string(),
            insights: vec![
                "Small consistent actions lead to big results over time".to_string(),
                "Balance is key - remember to include rest and reflection".to_string(),
            ],
            focus_area: "Consistent Progress".to_string(),
        },
        _ => AiPlan {
            tasks: vec![
                suggestion(
                    "Tackle your most important task first",
                    TaskCategory::Work,
                    "Starting with priority tasks builds momentum for the day",
                    None,
                ),
                suggestion(
                    "Connect with someone important to you",
                    TaskCategory::Personal,
                    "Strong relationships contribute to overall happiness",
                    None,
                ),
                suggestion(
                    "Practice gratitude reflection",
                    TaskCategory::Personal,
                    "Acknowledging positives improves mindset and resilience",
                    None,
                ),
            ],
            motivational_quote: "Quality is not an act, it is a habit. - Aristotle".to_string(),
            insights: vec![
                "Your environment shapes your habits - optimize your space for success"
                    .to_string(),
                "Progress over perfection - every step forward counts".to_string(),
            ],
            focus_area: "Meaningful Connections".to_string(),
        },
    }
}

/// How the planner picks an offline template.
#[derive(Debug)]
pub enum TemplateSelector {
    /// Always the same template.
    Fixed(usize),
    /// Cycles through the templates, one step per pick.
    RoundRobin(AtomicUsize),
    /// Deterministic on the plan date, so a day always gets the same template.
    DateHash,
}

impl Default for TemplateSelector {
    fn default() -> Self {
        Self::RoundRobin(AtomicUsize::new(0))
    }
}

impl TemplateSelector {
    pub fn round_robin() -> Self {
        Self::default()
    }

    /// Template index for a plan dated `date_key` (`YYYY-MM-DD`).
    pub fn pick(&self, date_key: &str) -> usize {
        match self {
            Self::Fixed(i) => *i % TEMPLATE_COUNT,
            Self::RoundRobin(next) => next.fetch_add(1, Ordering::Relaxed) % TEMPLATE_COUNT,
            Self::DateHash => fnv1a(date_key.as_bytes()) as usize % TEMPLATE_COUNT,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_complete() {
        for i in 0..TEMPLATE_COUNT {
            let plan = offline_template(i);
            assert!((1..=5).contains(&plan.tasks.len()));
            assert!(!plan.motivational_quote.is_empty());
            assert!(!plan.focus_area.is_empty());
            assert!(!plan.insights.is_empty());
        }
    }

    #[test]
    fn round_robin_cycles() {
        let sel = TemplateSelector::round_robin();
        let picks: Vec<_> = (0..4).map(|_| sel.pick("2026-01-01")).collect();
        assert_eq!(picks, vec![0, 1, 0, 1]);
    }

    #[test]
    fn fixed_and_date_hash_are_stable() {
        assert_eq!(TemplateSelector::Fixed(3).pick("x"), 1);
        let sel = TemplateSelector::DateHash;
        assert_eq!(sel.pick("2026-10-18"), sel.pick("2026-10-18"));
    }
}
