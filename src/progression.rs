//! Experience and levelling.
//!
//! Level and cumulative experience are stored server-side as two reserved
//! stats. Completing a task adds its reward (the task priority) to the
//! experience; crossing the current threshold grants one level and carries
//! the remainder over.

use serde::{Deserialize, Serialize};

use crate::api::model::{Stat, Task};

/// Reserved stat holding experience towards the next level.
pub const EXPERIENCE_STAT: &str = "Experience Gained";
/// Reserved stat holding the current level.
pub const LEVEL_STAT: &str = "Current Level";
/// Reward granted when a task has no usable priority.
pub const DEFAULT_REWARD_POINTS: i64 = 50;

/// Experience needed to go from `level` to `level + 1`: `(level + 1)^2 * 100`.
///
/// Saturates at `i64::MAX`; levels come from server data.
pub fn threshold(level: i64) -> i64 {
    let next = level.saturating_add(1);
    next.saturating_mul(next).saturating_mul(100)
}

/// Whether `name` is one of the reserved counter stats.
pub fn is_reserved_stat(name: &str) -> bool {
    name == EXPERIENCE_STAT || name == LEVEL_STAT
}

/// Stats the user may see and edit: default stats minus the reserved counters.
pub fn editable_stats(stats: &[Stat]) -> Vec<&Stat> {
    stats
        .iter()
        .filter(|s| s.is_default && !is_reserved_stat(&s.name))
        .collect()
}

/// Reward for completing `task`; missing or negative priorities use the default.
pub fn reward_points(task: &Task) -> i64 {
    match task.priority {
        Some(p) if p >= 0 => p,
        _ => DEFAULT_REWARD_POINTS,
    }
}

/// Level, experience and the threshold for the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub level: i64,
    pub experience: i64,
    pub next_level_threshold: i64,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl ProgressionState {
    pub fn new(level: i64, experience: i64) -> Self {
        Self {
            level,
            experience,
            next_level_threshold: threshold(level),
        }
    }

    /// Read level and experience from the reserved stats (missing → 0).
    pub fn from_stats(stats: &[Stat]) -> Self {
        let value_of = |name: &str| {
            stats
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.value)
                .unwrap_or(0)
        };
        Self::new(value_of(LEVEL_STAT), value_of(EXPERIENCE_STAT))
    }

    /// Percentage of the way to the next level.
    pub fn progress_percentage(&self) -> f32 {
        ProgressionCalculator::experience_progress_percentage(
            self.experience,
            self.next_level_threshold,
        )
    }
}

/// Result of applying one task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionResult {
    pub new_level: i64,
    pub new_experience: i64,
    pub new_threshold: i64,
    pub leveled_up: bool,
}

impl CompletionResult {
    pub fn state(&self) -> ProgressionState {
        ProgressionState {
            level: self.new_level,
            experience: self.new_experience,
            next_level_threshold: self.new_threshold,
        }
    }
}

/// Pure progression arithmetic.
pub struct ProgressionCalculator;

impl ProgressionCalculator {
    /// Add `reward_points` to the experience and grant at most one level.
    ///
    /// A reward large enough to cross two thresholds still yields a single
    /// level-up; the surplus stays in `new_experience` and may exceed the new
    /// threshold until the next completion.
    pub fn apply_completion(
        current_level: i64,
        current_experience: i64,
        reward_points: i64,
    ) -> CompletionResult {
        let mut level = current_level;
        let mut experience = current_experience.saturating_add(reward_points);
        let current_threshold = threshold(level);

        let leveled_up = experience >= current_threshold;
        if leveled_up {
            experience = experience.saturating_sub(current_threshold);
            level = level.saturating_add(1);
        }

        CompletionResult {
            new_level: level,
            new_experience: experience,
            new_threshold: threshold(level),
            leveled_up,
        }
    }

    /// Share of `tasks` that are completed, in percent. `0` for no tasks.
    pub fn daily_progress_percentage<'a, I>(tasks: I) -> f32
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let (completed, total) = tasks.into_iter().fold((0usize, 0usize), |(c, t), task| {
            (c + usize::from(task.is_completed), t + 1)
        });
        if total == 0 {
            return 0.0;
        }
        completed as f32 / total as f32 * 100.0
    }

    /// `experience / threshold` in percent; `0` when the threshold is not positive.
    pub fn experience_progress_percentage(experience: i64, threshold: i64) -> f32 {
        if threshold <= 0 {
            return 0.0;
        }
        experience as f32 / threshold as f32 * 100.0
    }
}
