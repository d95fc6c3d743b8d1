//! Calendar slot optimizer: free-gap discovery plus composite scoring.
//!
//! Finds the best time slot for a requested duration before a deadline,
//! weighing role time-of-day fit, energy match, external conditions and
//! deadline proximity. Transient: nothing here is persisted.

use crate::config::SchedulerConfig;
use crate::error::ScheduleError;
use crate::external::{BusyInterval, ConditionSource, FreeBusySource, TimeWindow};
use crate::roles::Role;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ─── Request / result ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SlotRequest {
    pub duration_minutes: u32,
    /// Search-window end; when absent, now + configured horizon.
    pub deadline: Option<DateTime<Utc>>,
    pub role: Role,
    /// Physiological recovery score in [0, 100].
    pub recovery: f64,
    pub calendar_ref: String,
}

/// Per-factor score breakdown, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub role_fit: f64,
    pub energy: f64,
    pub condition: f64,
    pub deadline: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Optimizer outcome: a slot, or an explicit deferral when nothing scores
/// high enough. Never a fabricated slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotOutcome {
    Scheduled(ScheduleSlot),
    Deferred { reason: String },
}

// ─── Free-gap arithmetic ────────────────────────────────────────────────────

/// Walk the busy intervals chronologically with a cursor starting at
/// `window.start`, emitting every free gap of at least `min_duration`,
/// including the trailing gap up to `window.end`.
pub fn free_gaps(
    busy: &[BusyInterval],
    window: TimeWindow,
    min_duration: Duration,
) -> Vec<TimeWindow> {
    let mut gaps = Vec::new();
    let mut cursor = window.start;

    let mut sorted: Vec<&BusyInterval> = busy.iter().collect();
    sorted.sort_by_key(|interval| interval.start);

    for interval in sorted {
        if cursor < interval.start {
            let gap_end = interval.start.min(window.end);
            if gap_end - cursor >= min_duration {
                gaps.push(TimeWindow {
                    start: cursor,
                    end: gap_end,
                });
            }
        }
        cursor = cursor.max(interval.end);
    }

    if cursor < window.end && window.end - cursor >= min_duration {
        gaps.push(TimeWindow {
            start: cursor,
            end: window.end,
        });
    }

    gaps
}

// ─── Scoring ────────────────────────────────────────────────────────────────

/// Role-specific peak/avoid hour bands (half-open, local hours).
fn role_hour_bands(role: Role) -> (&'static [(u32, u32)], &'static [(u32, u32)]) {
    match role {
        Role::Producer => (&[(9, 12), (15, 17)], &[(13, 14)]),
        Role::Administrator => (&[(10, 12), (14, 16)], &[]),
        Role::Entrepreneur => (&[(11, 13), (16, 18)], &[(9, 10)]),
        Role::Integrator => (&[(13, 15), (17, 19)], &[(9, 12)]),
    }
}

pub fn score_role_fit(start: DateTime<Utc>, role: Role) -> f64 {
    let hour = start.hour();
    let (peaks, avoids) = role_hour_bands(role);
    if peaks.iter().any(|&(a, b)| a <= hour && hour < b) {
        return 1.0;
    }
    if avoids.iter().any(|&(a, b)| a <= hour && hour < b) {
        return 0.2;
    }
    0.6
}

pub fn score_energy_match(start: DateTime<Utc>, recovery: f64) -> f64 {
    let hour = start.hour();
    if recovery > 70.0 && (9..12).contains(&hour) {
        return 1.0;
    }
    if recovery < 40.0 {
        return 0.3;
    }
    0.7
}

pub fn score_deadline_proximity(start: DateTime<Utc>, deadline: DateTime<Utc>) -> f64 {
    let hours = (deadline - start).num_minutes() as f64 / 60.0;
    if hours < 24.0 {
        return 1.0;
    }
    if hours < 72.0 {
        return 0.7;
    }
    0.4
}

// ─── Optimizer ──────────────────────────────────────────────────────────────

pub struct SlotOptimizer<'a> {
    free_busy: &'a dyn FreeBusySource,
    conditions: &'a dyn ConditionSource,
    config: &'a SchedulerConfig,
}

impl<'a> SlotOptimizer<'a> {
    pub fn new(
        free_busy: &'a dyn FreeBusySource,
        conditions: &'a dyn ConditionSource,
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            free_busy,
            conditions,
            config,
        }
    }

    /// Find the best-scoring slot for the request, or defer.
    pub async fn find_slot(
        &self,
        request: &SlotRequest,
        now: DateTime<Utc>,
    ) -> Result<SlotOutcome, ScheduleError> {
        if request.duration_minutes == 0 {
            return Err(ScheduleError::ZeroDuration);
        }

        let deadline = request
            .deadline
            .unwrap_or(now + Duration::hours(self.config.default_horizon_hours));
        if deadline <= now {
            return Err(ScheduleError::InvertedWindow {
                start: now.to_rfc3339(),
                end: deadline.to_rfc3339(),
            });
        }

        let window = TimeWindow {
            start: now,
            end: deadline,
        };
        let duration = Duration::minutes(i64::from(request.duration_minutes));

        // Fetch failure substitutes an empty busy list: the whole window is
        // one candidate gap rather than a failed turn.
        let busy = match self
            .free_busy
            .busy_intervals(&request.calendar_ref, window)
            .await
        {
            Ok(busy) => busy,
            Err(error) => {
                warn!(%error, "free/busy fetch failed; assuming open calendar");
                Vec::new()
            }
        };

        // One snapshot per search; neutral 0.5 on any fetch error.
        let condition_fit = match self.conditions.snapshot().await {
            Ok(snapshot) => snapshot.fit_score.unwrap_or(0.5),
            Err(error) => {
                warn!(%error, "condition fetch failed; using neutral fit");
                0.5
            }
        };

        let gaps = free_gaps(&busy, window, duration);
        debug!(gaps = gaps.len(), "free gaps computed");

        let weights = &self.config.weights;
        let mut best: Option<ScheduleSlot> = None;

        for gap in &gaps {
            let breakdown = ScoreBreakdown {
                role_fit: score_role_fit(gap.start, request.role),
                energy: score_energy_match(gap.start, request.recovery),
                condition: condition_fit,
                deadline: score_deadline_proximity(gap.start, deadline),
            };
            let score = weights.role * breakdown.role_fit
                + weights.energy * breakdown.energy
                + weights.condition * breakdown.condition
                + weights.deadline * breakdown.deadline;

            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(ScheduleSlot {
                    start: gap.start,
                    end: gap.start + duration,
                    score,
                    breakdown,
                });
            }
        }

        match best {
            Some(slot) if slot.score >= self.config.min_composite => {
                Ok(SlotOutcome::Scheduled(slot))
            }
            Some(slot) => Ok(SlotOutcome::Deferred {
                reason: format!(
                    "best candidate scored {:.2}, below the {:.2} floor",
                    slot.score, self.config.min_composite
                ),
            }),
            None => Ok(SlotOutcome::Deferred {
                reason: format!(
                    "no free gap of {} minutes before the deadline",
                    request.duration_minutes
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ConditionSnapshot;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedBusy(Vec<BusyInterval>);

    #[async_trait]
    impl FreeBusySource for FixedBusy {
        async fn busy_intervals(
            &self,
            _calendar_ref: &str,
            _window: TimeWindow,
        ) -> anyhow::Result<Vec<BusyInterval>> {
            Ok(self.0.clone())
        }
    }

    struct FailingBusy;

    #[async_trait]
    impl FreeBusySource for FailingBusy {
        async fn busy_intervals(
            &self,
            _calendar_ref: &str,
            _window: TimeWindow,
        ) -> anyhow::Result<Vec<BusyInterval>> {
            anyhow::bail!("calendar unavailable")
        }
    }

    struct FixedConditions(Option<f64>);

    #[async_trait]
    impl ConditionSource for FixedConditions {
        async fn snapshot(&self) -> anyhow::Result<ConditionSnapshot> {
            Ok(ConditionSnapshot {
                fit_score: self.0,
                ..ConditionSnapshot::default()
            })
        }
    }

    struct FailingConditions;

    #[async_trait]
    impl ConditionSource for FailingConditions {
        async fn snapshot(&self) -> anyhow::Result<ConditionSnapshot> {
            anyhow::bail!("conditions unavailable")
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap()
    }

    fn request(duration: u32, deadline: DateTime<Utc>) -> SlotRequest {
        SlotRequest {
            duration_minutes: duration,
            deadline: Some(deadline),
            role: Role::Producer,
            recovery: 80.0,
            calendar_ref: "primary".into(),
        }
    }

    #[test]
    fn gap_walk_emits_middle_and_trailing_gaps() {
        let window = TimeWindow {
            start: at(9, 0),
            end: at(18, 0),
        };
        let busy = vec![
            BusyInterval {
                start: at(10, 0),
                end: at(11, 0),
            },
            BusyInterval {
                start: at(12, 0),
                end: at(14, 0),
            },
        ];
        let gaps = free_gaps(&busy, window, Duration::minutes(30));
        assert_eq!(gaps.len(), 3);
        assert_eq!(gaps[0].start, at(9, 0));
        assert_eq!(gaps[0].end, at(10, 0));
        assert_eq!(gaps[2].start, at(14, 0));
        assert_eq!(gaps[2].end, at(18, 0));
    }

    #[test]
    fn short_gaps_are_not_emitted() {
        let window = TimeWindow {
            start: at(9, 0),
            end: at(10, 0),
        };
        let busy = vec![BusyInterval {
            start: at(9, 20),
            end: at(9, 50),
        }];
        let gaps = free_gaps(&busy, window, Duration::minutes(30));
        assert!(gaps.is_empty());
    }

    #[test]
    fn overlapping_busy_intervals_advance_the_cursor() {
        let window = TimeWindow {
            start: at(9, 0),
            end: at(12, 0),
        };
        let busy = vec![
            BusyInterval {
                start: at(9, 0),
                end: at(10, 30),
            },
            BusyInterval {
                start: at(10, 0),
                end: at(10, 15),
            },
        ];
        let gaps = free_gaps(&busy, window, Duration::minutes(30));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, at(10, 30));
    }

    #[test]
    fn role_fit_uses_peak_and_avoid_bands() {
        assert_eq!(score_role_fit(at(9, 30), Role::Producer), 1.0);
        assert_eq!(score_role_fit(at(13, 30), Role::Producer), 0.2);
        assert_eq!(score_role_fit(at(18, 30), Role::Producer), 0.6);
        assert_eq!(score_role_fit(at(9, 30), Role::Integrator), 0.2);
    }

    #[test]
    fn energy_match_prefers_rested_mornings() {
        assert_eq!(score_energy_match(at(10, 0), 80.0), 1.0);
        assert_eq!(score_energy_match(at(15, 0), 80.0), 0.7);
        assert_eq!(score_energy_match(at(10, 0), 30.0), 0.3);
    }

    #[test]
    fn deadline_proximity_tiers() {
        let deadline = at(18, 0) + Duration::days(4);
        assert_eq!(score_deadline_proximity(deadline - Duration::hours(3), deadline), 1.0);
        assert_eq!(score_deadline_proximity(deadline - Duration::hours(48), deadline), 0.7);
        assert_eq!(score_deadline_proximity(deadline - Duration::hours(96), deadline), 0.4);
    }

    #[tokio::test]
    async fn single_busy_block_yields_afternoon_slot() {
        // Busy 09:00-12:00, window 09:00-18:00, 30 minutes requested:
        // exactly one gap (12:00, 18:00) and the slot starts at or after noon.
        let busy = FixedBusy(vec![BusyInterval {
            start: at(9, 0),
            end: at(12, 0),
        }]);
        let conditions = FixedConditions(Some(0.8));
        let config = SchedulerConfig::default();
        let optimizer = SlotOptimizer::new(&busy, &conditions, &config);

        let outcome = optimizer
            .find_slot(&request(30, at(18, 0)), at(9, 0))
            .await
            .unwrap();

        let SlotOutcome::Scheduled(slot) = outcome else {
            panic!("expected a scheduled slot");
        };
        assert!(slot.start >= at(12, 0));
        assert_eq!(slot.end - slot.start, Duration::minutes(30));
        assert!(slot.end <= at(18, 0));
    }

    #[tokio::test]
    async fn no_sufficient_gap_defers() {
        let busy = FixedBusy(vec![BusyInterval {
            start: at(9, 0),
            end: at(17, 45),
        }]);
        let conditions = FixedConditions(Some(0.5));
        let config = SchedulerConfig::default();
        let optimizer = SlotOptimizer::new(&busy, &conditions, &config);

        let outcome = optimizer
            .find_slot(&request(30, at(18, 0)), at(9, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, SlotOutcome::Deferred { .. }));
    }

    #[tokio::test]
    async fn failed_sources_fall_back_to_neutral_defaults() {
        let config = SchedulerConfig::default();
        let optimizer = SlotOptimizer::new(&FailingBusy, &FailingConditions, &config);

        let outcome = optimizer
            .find_slot(&request(60, at(18, 0)), at(9, 0))
            .await
            .unwrap();

        // Empty busy list + neutral 0.5 condition still schedules.
        let SlotOutcome::Scheduled(slot) = outcome else {
            panic!("expected a scheduled slot");
        };
        assert!((slot.breakdown.condition - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_duration_is_rejected() {
        let busy = FixedBusy(Vec::new());
        let conditions = FixedConditions(None);
        let config = SchedulerConfig::default();
        let optimizer = SlotOptimizer::new(&busy, &conditions, &config);

        let result = optimizer.find_slot(&request(0, at(18, 0)), at(9, 0)).await;
        assert!(matches!(result, Err(ScheduleError::ZeroDuration)));
    }
}
