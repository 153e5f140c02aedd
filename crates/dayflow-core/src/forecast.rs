//! Goal forecaster: next-day goal success probability from recent behavior.

/// Weight of the task completion rate.
const COMPLETION_WEIGHT: f64 = 0.7;
/// Weight of the reflection habit.
const CONSISTENCY_WEIGHT: f64 = 0.3;

/// Probability (0.0–1.0) of hitting tomorrow's goals. Both inputs are percentages and are
/// clamped to 0–100 before weighting.
pub fn forecast_goal_completion(completion_rate: f64, reflection_consistency: f64) -> f64 {
    let completion = unit(completion_rate);
    let consistency = unit(reflection_consistency);
    (COMPLETION_WEIGHT * completion + CONSISTENCY_WEIGHT * consistency).clamp(0.0, 1.0)
}

fn unit(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    (percent / 100.0).clamp(0.0, 1.0)
}
