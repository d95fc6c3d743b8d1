//! Slot optimizer scenarios exercised through the public API.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use steward::config::SchedulerConfig;
use steward::external::{
    BusyInterval, ConditionSnapshot, ConditionSource, FreeBusySource, RiskLevel, TimeWindow,
};
use steward::roles::Role;
use steward::scheduler::{SlotOptimizer, SlotOutcome, SlotRequest};

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

struct OfflineBusy;

#[async_trait]
impl FreeBusySource for OfflineBusy {
    async fn busy_intervals(
        &self,
        _calendar_ref: &str,
        _window: TimeWindow,
    ) -> anyhow::Result<Vec<BusyInterval>> {
        anyhow::bail!("calendar unreachable")
    }
}

struct FairConditions;

#[async_trait]
impl ConditionSource for FairConditions {
    async fn snapshot(&self) -> anyhow::Result<ConditionSnapshot> {
        Ok(ConditionSnapshot {
            fit_score: Some(0.8),
            activity_metric: Some(12.0),
            risk: RiskLevel::Low,
            taken_at: None,
        })
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap()
}

fn request(duration_minutes: u32, deadline: DateTime<Utc>) -> SlotRequest {
    SlotRequest {
        duration_minutes,
        deadline: Some(deadline),
        role: Role::Producer,
        recovery: 80.0,
        calendar_ref: "primary".to_string(),
    }
}

#[tokio::test]
async fn morning_block_pushes_the_slot_past_noon() {
    let busy = FixedBusy(vec![BusyInterval {
        start: at(9, 0),
        end: at(12, 0),
    }]);
    let conditions = FairConditions;
    let config = SchedulerConfig::default();
    let optimizer = SlotOptimizer::new(&busy, &conditions, &config);

    let outcome = optimizer
        .find_slot(&request(30, at(18, 0)), at(9, 0))
        .await
        .expect("search succeeds");

    let SlotOutcome::Scheduled(slot) = outcome else {
        panic!("expected a slot, got {outcome:?}");
    };
    assert!(slot.start >= at(12, 0));
    assert_eq!(slot.end - slot.start, chrono::Duration::minutes(30));
    assert!(slot.end <= at(18, 0));
}

#[tokio::test]
async fn fully_booked_window_defers() {
    let busy = FixedBusy(vec![BusyInterval {
        start: at(9, 0),
        end: at(18, 0),
    }]);
    let conditions = FairConditions;
    let config = SchedulerConfig::default();
    let optimizer = SlotOptimizer::new(&busy, &conditions, &config);

    let outcome = optimizer
        .find_slot(&request(30, at(18, 0)), at(9, 0))
        .await
        .expect("search succeeds");
    assert!(matches!(outcome, SlotOutcome::Deferred { .. }));
}

#[tokio::test]
async fn unreachable_calendar_is_treated_as_open() {
    let busy = OfflineBusy;
    let conditions = FairConditions;
    let config = SchedulerConfig::default();
    let optimizer = SlotOptimizer::new(&busy, &conditions, &config);

    let outcome = optimizer
        .find_slot(&request(60, at(17, 0)), at(9, 0))
        .await
        .expect("search succeeds");
    assert!(matches!(outcome, SlotOutcome::Scheduled(_)));
}
