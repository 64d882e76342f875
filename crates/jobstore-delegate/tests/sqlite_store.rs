// End-to-end persistence against an in-memory SQLite database through a
// delegate resolved from the connection's own metadata.

mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use common::store_config;
use jobstore_core::types::{
    new_entry_id, store_now, Calendar, FiredTrigger, GroupMatcher, JobDetail, JobKey, Trigger, TriggerKey,
    TriggerState, LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS, MISFIRE_IGNORE,
};
use jobstore_delegate::db::init_sqlite;
use jobstore_delegate::{
    Connection, DelegateError, DelegateRegistry, DelegateSettings, DriverDelegate, SqliteConnection, StdDelegate,
};

fn open() -> (SqliteConnection, Arc<dyn DriverDelegate>) {
    let conn = SqliteConnection::open_in_memory().unwrap();
    init_sqlite(conn.raw(), "jobstore_").unwrap();
    let meta = conn.metadata().unwrap();
    let resolved = DelegateRegistry::new()
        .resolve(&store_config(None), Some(&meta))
        .unwrap();
    (conn, resolved.delegate)
}

fn job(name: &str, group: &str) -> JobDetail {
    JobDetail::new(JobKey::new(name, group).unwrap(), "ReportJob")
}

fn trigger(name: &str, job: &JobDetail, minutes: i64) -> Trigger {
    let start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
    Trigger::new(TriggerKey::new(name, "reports").unwrap(), job.key.clone(), start)
}

#[test]
fn sqlite_metadata_resolves_integer_boolean_dialect() {
    let (_conn, delegate) = open();
    assert_eq!(delegate.dialect(), "SQLite");
    assert_eq!(delegate.marshaller().name(), "integer_boolean");
}

#[test]
fn job_details_round_trip() {
    let (conn, delegate) = open();
    let mut detail = job("nightly", "reports");
    detail.description = Some("Nightly report".into());
    detail.durable = true;
    detail.nonconcurrent = true;
    detail.job_data.insert("recipients", serde_json::json!(["ops@example.com"]));

    assert_eq!(delegate.insert_job_detail(&conn, &detail).unwrap(), 1);
    assert!(delegate.job_exists(&conn, &detail.key).unwrap());
    assert!(delegate.is_job_nonconcurrent(&conn, &detail.key).unwrap());
    assert_eq!(
        delegate.select_job_detail(&conn, &detail.key).unwrap(),
        Some(detail.clone())
    );

    detail.nonconcurrent = false;
    detail.job_data.insert("retries", 2);
    assert_eq!(delegate.update_job_detail(&conn, &detail).unwrap(), 1);
    let stored = delegate.select_job_detail(&conn, &detail.key).unwrap().unwrap();
    assert!(!stored.nonconcurrent);
    assert_eq!(stored.job_data.get("retries"), Some(&serde_json::json!(2)));

    detail.job_data.insert("retries", 3);
    delegate.update_job_data(&conn, &detail).unwrap();
    let stored = delegate.select_job_detail(&conn, &detail.key).unwrap().unwrap();
    assert_eq!(stored.job_data.get("retries"), Some(&serde_json::json!(3)));

    let missing = JobKey::named("absent").unwrap();
    assert!(!delegate.job_exists(&conn, &missing).unwrap());
    assert!(!delegate.is_job_nonconcurrent(&conn, &missing).unwrap());
    assert_eq!(delegate.select_job_detail(&conn, &missing).unwrap(), None);

    assert_eq!(delegate.delete_job_detail(&conn, &detail.key).unwrap(), 1);
    assert_eq!(delegate.select_num_jobs(&conn).unwrap(), 0);
}

#[test]
fn job_keys_by_group_matcher() {
    let (conn, delegate) = open();
    for (name, group) in [("a", "reports"), ("b", "reports"), ("c", "billing"), ("d", "rep-archive")] {
        delegate.insert_job_detail(&conn, &job(name, group)).unwrap();
    }

    let names = |matcher: GroupMatcher| -> Vec<String> {
        delegate
            .select_job_keys(&conn, &matcher)
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect()
    };
    assert_eq!(names(GroupMatcher::equals("reports")), ["a", "b"]);
    assert_eq!(names(GroupMatcher::StartsWith("rep".into())), ["d", "a", "b"]);
    assert_eq!(names(GroupMatcher::EndsWith("ing".into())), ["c"]);
    assert_eq!(names(GroupMatcher::Anything).len(), 4);
    assert_eq!(
        delegate.select_job_groups(&conn).unwrap(),
        ["billing", "rep-archive", "reports"]
    );
    assert_eq!(delegate.select_num_jobs(&conn).unwrap(), 4);
}

#[test]
fn group_matchers_treat_wildcards_literally() {
    let (conn, delegate) = open();
    for (name, group) in [("a", "team_a"), ("b", "teamXa"), ("c", "team%b"), ("d", "50%!off")] {
        let detail = job(name, group);
        delegate.insert_job_detail(&conn, &detail).unwrap();
        delegate
            .insert_trigger(
                &conn,
                &Trigger::new(TriggerKey::new(name, group).unwrap(), detail.key.clone(), Utc::now()),
            )
            .unwrap();
    }

    let job_groups = |matcher: GroupMatcher| -> Vec<String> {
        delegate
            .select_job_keys(&conn, &matcher)
            .unwrap()
            .into_iter()
            .map(|k| k.group)
            .collect()
    };
    assert_eq!(job_groups(GroupMatcher::StartsWith("team_".into())), ["team_a"]);
    assert_eq!(job_groups(GroupMatcher::Contains("%".into())), ["50%!off", "team%b"]);
    assert_eq!(job_groups(GroupMatcher::EndsWith("%!off".into())), ["50%!off"]);

    let trigger_groups: Vec<String> = delegate
        .select_trigger_keys(&conn, &GroupMatcher::StartsWith("team%".into()))
        .unwrap()
        .into_iter()
        .map(|k| k.group)
        .collect();
    assert_eq!(trigger_groups, ["team%b"]);
}

#[test]
fn triggers_built_from_the_clock_read_back_unchanged() {
    let (conn, delegate) = open();
    let detail = job("nightly", "reports");
    delegate.insert_job_detail(&conn, &detail).unwrap();
    let mut stored = Trigger::new(
        TriggerKey::new("now", "reports").unwrap(),
        detail.key.clone(),
        Utc::now(),
    );
    stored.end_time = Some(store_now() + Duration::hours(1));
    delegate.insert_trigger(&conn, &stored).unwrap();
    assert_eq!(
        delegate.select_trigger(&conn, &stored.key).unwrap(),
        Some(stored.clone())
    );

    let fired = FiredTrigger::acquired(
        new_entry_id(&delegate.settings().instance_id),
        stored.key.clone(),
        Utc::now(),
        stored.priority,
    );
    delegate.insert_fired_trigger(&conn, &fired).unwrap();
    let records = delegate.select_fired_trigger_records(&conn, None).unwrap();
    assert_eq!(records[0].fired, fired);

    let checkin = store_now();
    delegate.insert_scheduler_state(&conn, checkin, 7_500).unwrap();
    let states = delegate.select_scheduler_state_records(&conn, None).unwrap();
    assert_eq!(states[0].last_checkin_time, checkin);
}

#[test]
fn invalid_utf8_key_surfaces_as_statement_error() {
    let (conn, delegate) = open();
    conn.raw()
        .execute(
            "INSERT INTO jobstore_job_details VALUES \
             (?1, CAST(X'FF' AS TEXT), 'reports', NULL, 'ReportJob', 0, 0, 0, 0, NULL)",
            [&delegate.settings().scheduler_name],
        )
        .unwrap();
    let err = delegate
        .select_job_keys(&conn, &GroupMatcher::equals("reports"))
        .unwrap_err();
    assert!(matches!(err, DelegateError::Statement { .. }), "{err}");
    assert!(err.to_string().contains("UTF-8"), "{err}");
}

#[test]
fn triggers_round_trip_and_change_state() {
    let (conn, delegate) = open();
    let detail = job("nightly", "reports");
    delegate.insert_job_detail(&conn, &detail).unwrap();

    let mut t = trigger("t1", &detail, 0);
    t.description = Some("every night".into());
    t.end_time = Some(t.start_time + Duration::days(30));
    t.calendar_name = Some("holidays".into());
    t.job_data.insert("mode", "full");
    delegate.insert_trigger(&conn, &t).unwrap();

    assert!(delegate.trigger_exists(&conn, &t.key).unwrap());
    assert_eq!(delegate.select_trigger(&conn, &t.key).unwrap(), Some(t.clone()));
    assert_eq!(delegate.select_triggers_for_job(&conn, &detail.key).unwrap(), [t.key.clone()]);
    assert_eq!(delegate.select_num_triggers_for_job(&conn, &detail.key).unwrap(), 1);

    assert_eq!(
        delegate
            .update_trigger_state_from_other_state(
                &conn,
                &t.key,
                TriggerState::Acquired,
                TriggerState::Paused
            )
            .unwrap(),
        0
    );
    assert_eq!(
        delegate
            .update_trigger_state_from_other_state(
                &conn,
                &t.key,
                TriggerState::Acquired,
                TriggerState::Waiting
            )
            .unwrap(),
        1
    );
    assert_eq!(
        delegate.select_trigger_state(&conn, &t.key).unwrap(),
        Some(TriggerState::Acquired)
    );
    assert_eq!(
        delegate.select_triggers_in_state(&conn, TriggerState::Acquired).unwrap(),
        [t.key.clone()]
    );

    delegate
        .update_trigger_states_for_job(&conn, &detail.key, TriggerState::Paused)
        .unwrap();
    assert_eq!(
        delegate.select_trigger_state(&conn, &t.key).unwrap(),
        Some(TriggerState::Paused)
    );

    t.priority = 9;
    t.prev_fire_time = Some(t.start_time);
    t.state = TriggerState::Waiting;
    delegate.update_trigger(&conn, &t).unwrap();
    assert_eq!(delegate.select_trigger(&conn, &t.key).unwrap(), Some(t.clone()));

    delegate.update_trigger_state(&conn, &t.key, TriggerState::Complete).unwrap();
    assert_eq!(
        delegate.select_trigger_state(&conn, &t.key).unwrap(),
        Some(TriggerState::Complete)
    );
    assert_eq!(delegate.select_trigger_groups(&conn).unwrap(), ["reports"]);
    assert_eq!(
        delegate
            .select_trigger_keys(&conn, &GroupMatcher::Contains("port".into()))
            .unwrap(),
        [t.key.clone()]
    );

    assert_eq!(delegate.delete_trigger(&conn, &t.key).unwrap(), 1);
    assert_eq!(delegate.select_trigger_state(&conn, &t.key).unwrap(), None);
    assert_eq!(delegate.select_num_triggers(&conn).unwrap(), 0);
}

#[test]
fn acquisition_orders_by_fire_time_then_priority_and_honours_window() {
    let (conn, delegate) = open();
    let detail = job("nightly", "reports");
    delegate.insert_job_detail(&conn, &detail).unwrap();

    let base = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let mut low = trigger("low", &detail, 10);
    low.priority = 1;
    let mut high = trigger("high", &detail, 10);
    high.priority = 10;
    let early = trigger("early", &detail, 5);
    let late = trigger("late", &detail, 120);
    // Long overdue; only eligible when misfires are ignored.
    let stale = trigger("stale", &detail, -600);
    let mut stale_ignored = trigger("stale-ignored", &detail, -600);
    stale_ignored.misfire_instruction = MISFIRE_IGNORE;
    let mut paused = trigger("paused", &detail, 1);
    paused.state = TriggerState::Paused;

    for t in [&low, &high, &early, &late, &stale, &stale_ignored, &paused] {
        delegate.insert_trigger(&conn, t).unwrap();
    }

    let no_later_than = base + Duration::minutes(30);
    let no_earlier_than = base - Duration::minutes(60);
    let names = |max: usize| -> Vec<String> {
        delegate
            .select_triggers_to_acquire(&conn, no_later_than, no_earlier_than, max)
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect()
    };
    assert_eq!(names(10), ["stale-ignored", "early", "high", "low"]);
    assert_eq!(names(2), ["stale-ignored", "early"]);

    let misfired = delegate
        .select_misfired_triggers_in_state(&conn, TriggerState::Waiting, no_earlier_than)
        .unwrap();
    assert_eq!(misfired, [stale.key.clone()]);
}

#[test]
fn paused_groups() {
    let (conn, delegate) = open();
    assert!(!delegate.is_trigger_group_paused(&conn, "reports").unwrap());
    delegate.insert_paused_trigger_group(&conn, "reports").unwrap();
    delegate.insert_paused_trigger_group(&conn, "billing").unwrap();
    assert!(delegate.is_trigger_group_paused(&conn, "reports").unwrap());
    assert_eq!(
        delegate.select_paused_trigger_groups(&conn).unwrap(),
        ["billing", "reports"]
    );
    assert!(delegate.insert_paused_trigger_group(&conn, "reports").is_err());
    assert_eq!(delegate.delete_paused_trigger_group(&conn, "reports").unwrap(), 1);
    assert!(!delegate.is_trigger_group_paused(&conn, "reports").unwrap());
}

#[test]
fn calendars_round_trip_and_report_references() {
    let (conn, delegate) = open();
    let mut calendar = Calendar {
        name: "holidays".into(),
        data: vec![0, 1, 2, 255],
    };
    delegate.insert_calendar(&conn, &calendar).unwrap();
    assert!(delegate.calendar_exists(&conn, "holidays").unwrap());
    assert_eq!(
        delegate.select_calendar(&conn, "holidays").unwrap(),
        Some(calendar.clone())
    );
    assert!(!delegate.calendar_is_referenced(&conn, "holidays").unwrap());

    let detail = job("nightly", "reports");
    delegate.insert_job_detail(&conn, &detail).unwrap();
    let mut t = trigger("t1", &detail, 0);
    t.calendar_name = Some("holidays".into());
    delegate.insert_trigger(&conn, &t).unwrap();
    assert!(delegate.calendar_is_referenced(&conn, "holidays").unwrap());

    calendar.data = b"weekends".to_vec();
    delegate.update_calendar(&conn, &calendar).unwrap();
    assert_eq!(
        delegate.select_calendar(&conn, "holidays").unwrap().map(|c| c.data),
        Some(b"weekends".to_vec())
    );
    assert_eq!(delegate.select_calendar_names(&conn).unwrap(), ["holidays"]);
    assert_eq!(delegate.delete_calendar(&conn, "holidays").unwrap(), 1);
    assert_eq!(delegate.select_calendar(&conn, "missing").unwrap(), None);
}

#[test]
fn fired_triggers_are_owned_by_the_instance() {
    let (conn, delegate) = open();
    let instance = delegate.settings().instance_id.clone();
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let mut fired = FiredTrigger {
        entry_id: new_entry_id(&instance),
        trigger_key: TriggerKey::new("t1", "reports").unwrap(),
        job_key: None,
        fired_time: now,
        scheduled_time: now,
        priority: 5,
        state: TriggerState::Acquired,
        nonconcurrent: false,
        requests_recovery: false,
    };
    delegate.insert_fired_trigger(&conn, &fired).unwrap();

    fired.state = TriggerState::Executing;
    fired.job_key = Some(JobKey::new("nightly", "reports").unwrap());
    fired.nonconcurrent = true;
    fired.requests_recovery = true;
    assert_eq!(delegate.update_fired_trigger(&conn, &fired).unwrap(), 1);

    // A second node's row, written by a delegate with another instance id.
    let other = StdDelegate::new(DelegateSettings::new("jobstore_", "node-b", "main"));
    let other_fired = FiredTrigger {
        entry_id: new_entry_id("node-b"),
        ..fired.clone()
    };
    other.insert_fired_trigger(&conn, &other_fired).unwrap();

    let mine = delegate
        .select_fired_trigger_records(&conn, Some(&instance))
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].instance_id, instance);
    assert_eq!(mine[0].fired, fired);

    assert_eq!(delegate.select_fired_trigger_records(&conn, None).unwrap().len(), 2);
    let mut names = vec![instance.clone(), "node-b".to_string()];
    names.sort();
    assert_eq!(delegate.select_fired_trigger_instance_names(&conn).unwrap(), names);

    assert_eq!(
        delegate.delete_fired_triggers_for_instance(&conn, "node-b").unwrap(),
        1
    );
    assert_eq!(delegate.delete_fired_trigger(&conn, &fired.entry_id).unwrap(), 1);
    assert!(delegate.select_fired_trigger_records(&conn, None).unwrap().is_empty());
}

#[test]
fn scheduler_state_check_ins() {
    let (conn, delegate) = open();
    let instance = delegate.settings().instance_id.clone();
    let first = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    delegate.insert_scheduler_state(&conn, first, 7_500).unwrap();

    let later = first + Duration::seconds(7);
    assert_eq!(delegate.update_scheduler_state(&conn, later).unwrap(), 1);

    let records = delegate
        .select_scheduler_state_records(&conn, Some(&instance))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].last_checkin_time, later);
    assert_eq!(records[0].checkin_interval_ms, 7_500);
    assert!(delegate
        .select_scheduler_state_records(&conn, Some("node-z"))
        .unwrap()
        .is_empty());

    assert_eq!(delegate.delete_scheduler_state(&conn, &instance).unwrap(), 1);
    assert!(delegate.select_scheduler_state_records(&conn, None).unwrap().is_empty());
}

#[test]
fn locks_and_clear_data() {
    let (conn, delegate) = open();
    delegate.insert_lock(&conn, LOCK_TRIGGER_ACCESS).unwrap();
    delegate.insert_lock(&conn, LOCK_STATE_ACCESS).unwrap();
    assert_eq!(
        delegate.select_lock_names(&conn).unwrap(),
        [LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS]
    );

    let detail = job("nightly", "reports");
    delegate.insert_job_detail(&conn, &detail).unwrap();
    delegate.insert_trigger(&conn, &trigger("t1", &detail, 0)).unwrap();
    delegate.insert_paused_trigger_group(&conn, "reports").unwrap();
    delegate
        .insert_calendar(&conn, &Calendar { name: "c".into(), data: vec![1] })
        .unwrap();

    delegate.clear_data(&conn).unwrap();
    assert_eq!(delegate.select_num_jobs(&conn).unwrap(), 0);
    assert_eq!(delegate.select_num_triggers(&conn).unwrap(), 0);
    assert!(delegate.select_paused_trigger_groups(&conn).unwrap().is_empty());
    assert!(delegate.select_calendar_names(&conn).unwrap().is_empty());
    assert_eq!(delegate.select_lock_names(&conn).unwrap().len(), 2);
}

#[test]
fn standard_rules_also_round_trip_on_sqlite() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    init_sqlite(conn.raw(), "jobstore_").unwrap();
    let delegate = StdDelegate::new(DelegateSettings::new("jobstore_", "node-a", "main"));
    let mut detail = job("nightly", "reports");
    detail.update_data = true;
    delegate.insert_job_detail(&conn, &detail).unwrap();
    assert_eq!(
        delegate.select_job_detail(&conn, &detail.key).unwrap(),
        Some(detail)
    );
}

#[test]
fn schedulers_sharing_tables_are_isolated() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    init_sqlite(conn.raw(), "jobstore_").unwrap();
    let a = StdDelegate::new(DelegateSettings::new("jobstore_", "node-a", "alpha"));
    let b = StdDelegate::new(DelegateSettings::new("jobstore_", "node-a", "o'beta"));

    a.insert_job_detail(&conn, &job("nightly", "reports")).unwrap();
    b.insert_job_detail(&conn, &job("nightly", "reports")).unwrap();
    a.clear_data(&conn).unwrap();

    assert_eq!(a.select_num_jobs(&conn).unwrap(), 0);
    assert_eq!(b.select_num_jobs(&conn).unwrap(), 1);
}
