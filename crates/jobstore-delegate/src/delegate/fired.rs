use chrono::{DateTime, Utc};
use jobstore_core::types::{FiredTrigger, FiredTriggerRecord, JobKey, SchedulerStateRecord};

use super::call::{flag, val, Call, Param};
use super::DriverDelegate;
use crate::conn::{Connection, Row};
use crate::error::Result;
use crate::sql;

// --- fired triggers ---------------------------------------------------------

pub(super) fn insert_fired_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    fired: &FiredTrigger,
) -> Result<usize> {
    let call = Call::new(d, "insert_fired_trigger");
    let mut params = vec![
        val(fired.entry_id.as_str()),
        val(fired.trigger_key.name.as_str()),
        val(fired.trigger_key.group.as_str()),
        val(d.settings().instance_id.as_str()),
        call.timestamp_param(Some(fired.fired_time))?,
        call.timestamp_param(Some(fired.scheduled_time))?,
        val(fired.priority),
        val(fired.state.as_str()),
    ];
    params.extend(job_params(fired));
    call.execute(conn, sql::INSERT_FIRED_TRIGGER, params)
}

pub(super) fn update_fired_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    fired: &FiredTrigger,
) -> Result<usize> {
    let call = Call::new(d, "update_fired_trigger");
    let mut params = vec![
        val(d.settings().instance_id.as_str()),
        call.timestamp_param(Some(fired.fired_time))?,
        call.timestamp_param(Some(fired.scheduled_time))?,
        val(fired.state.as_str()),
    ];
    params.extend(job_params(fired));
    params.push(val(fired.entry_id.as_str()));
    call.execute(conn, sql::UPDATE_FIRED_TRIGGER, params)
}

/// Job columns and flags; NULL job columns while only acquired.
fn job_params(fired: &FiredTrigger) -> [Param; 4] {
    let (name, group) = match &fired.job_key {
        Some(key) => (Some(key.name.as_str()), Some(key.group.as_str())),
        None => (None, None),
    };
    [
        val(name),
        val(group),
        flag(fired.nonconcurrent),
        flag(fired.requests_recovery),
    ]
}

pub(super) fn delete_fired_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    entry_id: &str,
) -> Result<usize> {
    Call::new(d, "delete_fired_trigger").execute(conn, sql::DELETE_FIRED_TRIGGER, vec![val(entry_id)])
}

pub(super) fn delete_fired_triggers_for_instance<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    instance_id: &str,
) -> Result<usize> {
    Call::new(d, "delete_fired_triggers_for_instance").execute(
        conn,
        sql::DELETE_INSTANCES_FIRED_TRIGGERS,
        vec![val(instance_id)],
    )
}

pub(super) fn select_fired_trigger_records<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    instance_id: Option<&str>,
) -> Result<Vec<FiredTriggerRecord>> {
    let call = Call::new(d, "select_fired_trigger_records");
    let rows = match instance_id {
        Some(instance) => call.query(conn, sql::SELECT_INSTANCES_FIRED_TRIGGERS, vec![val(instance)])?,
        None => call.query(conn, sql::SELECT_FIRED_TRIGGERS, Vec::new())?,
    };
    rows.iter().map(|row| fired_from_row(&call, row)).collect()
}

fn fired_from_row<D: DriverDelegate + ?Sized>(
    call: &Call<'_, D>,
    row: &Row,
) -> Result<FiredTriggerRecord> {
    let job_key = match (call.opt_text(row, 8)?, call.opt_text(row, 9)?) {
        (Some(name), Some(group)) => {
            Some(JobKey::new(name, group).map_err(|e| call.corrupt(e.to_string()))?)
        }
        (None, None) => None,
        (name, group) => {
            return Err(call.corrupt(format!(
                "job name {name:?} and group {group:?} must both be set or both be NULL"
            )))
        }
    };
    Ok(FiredTriggerRecord {
        instance_id: call.text(row, 3)?,
        fired: FiredTrigger {
            entry_id: call.text(row, 0)?,
            trigger_key: call.trigger_key(row, 1, 2)?,
            job_key,
            fired_time: call.timestamp(row, 4)?,
            scheduled_time: call.timestamp(row, 5)?,
            priority: call.i32_or(row, 6, 0)?,
            state: call.state(row, 7)?,
            nonconcurrent: call.boolean_or_false(row, 10)?,
            requests_recovery: call.boolean_or_false(row, 11)?,
        },
    })
}

pub(super) fn select_fired_trigger_instance_names<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<Vec<String>> {
    let call = Call::new(d, "select_fired_trigger_instance_names");
    let rows = call.query(conn, sql::SELECT_FIRED_TRIGGER_INSTANCE_NAMES, Vec::new())?;
    call.texts(&rows)
}

// --- scheduler state --------------------------------------------------------

pub(super) fn insert_scheduler_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    checkin_time: DateTime<Utc>,
    checkin_interval_ms: i64,
) -> Result<usize> {
    let call = Call::new(d, "insert_scheduler_state");
    call.execute(
        conn,
        sql::INSERT_SCHEDULER_STATE,
        vec![
            val(d.settings().instance_id.as_str()),
            call.timestamp_param(Some(checkin_time))?,
            val(checkin_interval_ms),
        ],
    )
}

pub(super) fn update_scheduler_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    checkin_time: DateTime<Utc>,
) -> Result<usize> {
    let call = Call::new(d, "update_scheduler_state");
    call.execute(
        conn,
        sql::UPDATE_SCHEDULER_STATE,
        vec![
            call.timestamp_param(Some(checkin_time))?,
            val(d.settings().instance_id.as_str()),
        ],
    )
}

pub(super) fn delete_scheduler_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    instance_id: &str,
) -> Result<usize> {
    Call::new(d, "delete_scheduler_state").execute(
        conn,
        sql::DELETE_SCHEDULER_STATE,
        vec![val(instance_id)],
    )
}

pub(super) fn select_scheduler_state_records<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    instance_id: Option<&str>,
) -> Result<Vec<SchedulerStateRecord>> {
    let call = Call::new(d, "select_scheduler_state_records");
    let rows = match instance_id {
        Some(instance) => call.query(conn, sql::SELECT_SCHEDULER_STATE, vec![val(instance)])?,
        None => call.query(conn, sql::SELECT_SCHEDULER_STATES, Vec::new())?,
    };
    rows.iter()
        .map(|row| {
            Ok(SchedulerStateRecord {
                instance_id: call.text(row, 0)?,
                last_checkin_time: call.timestamp(row, 1)?,
                checkin_interval_ms: call.int(row, 2)?,
            })
        })
        .collect()
}

// --- locks ------------------------------------------------------------------

pub(super) fn insert_lock<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    lock_name: &str,
) -> Result<usize> {
    Call::new(d, "insert_lock").execute(conn, sql::INSERT_LOCK, vec![val(lock_name)])
}

pub(super) fn select_lock_names<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<Vec<String>> {
    let call = Call::new(d, "select_lock_names");
    let rows = call.query(conn, sql::SELECT_LOCK_NAMES, Vec::new())?;
    call.texts(&rows)
}

// --- maintenance ------------------------------------------------------------

pub(super) fn clear_data<D: DriverDelegate + ?Sized>(d: &D, conn: &dyn Connection) -> Result<()> {
    let call = Call::new(d, "clear_data");
    // Triggers reference job details, so they go first.
    for template in [
        sql::DELETE_ALL_FIRED_TRIGGERS,
        sql::DELETE_ALL_TRIGGERS,
        sql::DELETE_ALL_JOB_DETAILS,
        sql::DELETE_ALL_CALENDARS,
        sql::DELETE_ALL_PAUSED_TRIGGER_GROUPS,
    ] {
        call.execute(conn, template, Vec::new())?;
    }
    Ok(())
}
