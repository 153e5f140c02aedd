//! Consecutive-day habit streaks.

use crate::error::StoreError;
use crate::records::{day_key, Streak};
use crate::store::{get_record, put_record, RecordStore};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Habit advanced whenever a task is completed.
pub const DAILY_TASKS_HABIT: &str = "daily_tasks";

/// Records one day's outcome for `habit_type`.
///
/// At most one update per UTC day counts; later calls on the same day return the stored
/// streak unchanged. Completing the day after the last update extends the streak, any other
/// completion restarts it at 1, and a miss resets it to 0.
pub async fn update_streak(
    store: &dyn RecordStore,
    user_id: &str,
    habit_type: &str,
    completed: bool,
    today: DateTime<Utc>,
) -> Result<Streak, StoreError> {
    let count = u32::from(completed);
    let streak = match get_record::<Streak>(store, user_id, habit_type).await? {
        None => Streak {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            habit_type: habit_type.to_string(),
            start_date: today,
            current_count: count,
            longest_count: count,
            last_updated: today,
        },
        Some(existing) => {
            let last_day = existing.last_updated.date_naive();
            let today_day = today.date_naive();
            if last_day == today_day {
                tracing::debug!(target: "dayflow::streak", habit = habit_type, "already updated today");
                return Ok(existing);
            }
            let mut streak = existing;
            if completed && last_day == today_day - Duration::days(1) {
                streak.current_count += 1;
            } else if completed {
                streak.current_count = 1;
                streak.start_date = today;
            } else {
                streak.current_count = 0;
            }
            streak.longest_count = streak.longest_count.max(streak.current_count);
            streak.last_updated = today;
            streak
        }
    };
    put_record(store, &streak).await?;
    tracing::info!(
        target: "dayflow::streak",
        habit = habit_type,
        day = %day_key(today),
        current = streak.current_count,
        longest = streak.longest_count,
        "streak updated"
    );
    Ok(streak)
}

/// Current `daily_tasks` count; 0 when the user has no streak yet.
pub async fn current_streak(store: &dyn RecordStore, user_id: &str) -> Result<u32, StoreError> {
    Ok(get_record::<Streak>(store, user_id, DAILY_TASKS_HABIT)
        .await?
        .map(|s| s.current_count)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_update_creates_streak() {
        let store = MemoryRecordStore::new();
        let s = update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(1)).await.unwrap();
        assert_eq!(s.current_count, 1);
        assert_eq!(s.longest_count, 1);
        assert_eq!(current_streak(&store, "u1").await.unwrap(), 1);

        let s = update_streak(&store, "u2", DAILY_TASKS_HABIT, false, day(1)).await.unwrap();
        assert_eq!(s.current_count, 0);
    }

    #[tokio::test]
    async fn consecutive_days_extend_and_gaps_restart() {
        let store = MemoryRecordStore::new();
        update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(1)).await.unwrap();
        update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(2)).await.unwrap();
        let s = update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(3)).await.unwrap();
        assert_eq!(s.current_count, 3);

        let s = update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(6)).await.unwrap();
        assert_eq!(s.current_count, 1);
        assert_eq!(s.longest_count, 3);
        assert_eq!(s.start_date, day(6));

        let s = update_streak(&store, "u1", DAILY_TASKS_HABIT, false, day(7)).await.unwrap();
        assert_eq!(s.current_count, 0);
        assert_eq!(s.longest_count, 3);
    }

    #[tokio::test]
    async fn second_update_same_day_is_ignored() {
        let store = MemoryRecordStore::new();
        update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(1)).await.unwrap();
        update_streak(&store, "u1", DAILY_TASKS_HABIT, true, day(2)).await.unwrap();
        let s = update_streak(&store, "u1", DAILY_TASKS_HABIT, false, day(2) + Duration::hours(5))
            .await
            .unwrap();
        assert_eq!(s.current_count, 2);
    }

    #[tokio::test]
    async fn missing_streak_reads_zero() {
        let store = MemoryRecordStore::new();
        assert_eq!(current_streak(&store, "nobody").await.unwrap(), 0);
    }
}
