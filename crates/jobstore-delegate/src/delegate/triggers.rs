use chrono::{DateTime, Utc};
use jobstore_core::types::{GroupMatcher, JobKey, Trigger, TriggerKey, TriggerState};

use super::call::{val, Call, Param};
use super::{jobs, DriverDelegate};
use crate::conn::{Connection, Row};
use crate::error::Result;
use crate::sql;

pub(super) fn insert_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    trigger: &Trigger,
) -> Result<usize> {
    let call = Call::new(d, "insert_trigger");
    let data = call.job_data_param(&trigger.job_data)?;
    call.execute(
        conn,
        sql::INSERT_TRIGGER,
        vec![
            val(trigger.key.name.as_str()),
            val(trigger.key.group.as_str()),
            val(trigger.job_key.name.as_str()),
            val(trigger.job_key.group.as_str()),
            val(trigger.description.as_deref()),
            call.timestamp_param(trigger.next_fire_time)?,
            call.timestamp_param(trigger.prev_fire_time)?,
            val(trigger.priority),
            val(trigger.state.as_str()),
            val(trigger.trigger_type.as_str()),
            call.timestamp_param(Some(trigger.start_time))?,
            call.timestamp_param(trigger.end_time)?,
            val(trigger.calendar_name.as_deref()),
            val(trigger.misfire_instruction),
            data,
        ],
    )
}

pub(super) fn update_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    trigger: &Trigger,
) -> Result<usize> {
    let call = Call::new(d, "update_trigger");
    let data = call.job_data_param(&trigger.job_data)?;
    call.execute(
        conn,
        sql::UPDATE_TRIGGER,
        vec![
            val(trigger.job_key.name.as_str()),
            val(trigger.job_key.group.as_str()),
            val(trigger.description.as_deref()),
            call.timestamp_param(trigger.next_fire_time)?,
            call.timestamp_param(trigger.prev_fire_time)?,
            val(trigger.priority),
            val(trigger.state.as_str()),
            val(trigger.trigger_type.as_str()),
            call.timestamp_param(Some(trigger.start_time))?,
            call.timestamp_param(trigger.end_time)?,
            val(trigger.calendar_name.as_deref()),
            val(trigger.misfire_instruction),
            data,
            val(trigger.key.name.as_str()),
            val(trigger.key.group.as_str()),
        ],
    )
}

pub(super) fn delete_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &TriggerKey,
) -> Result<usize> {
    Call::new(d, "delete_trigger").execute(conn, sql::DELETE_TRIGGER, key_params(key))
}

pub(super) fn trigger_exists<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &TriggerKey,
) -> Result<bool> {
    let rows =
        Call::new(d, "trigger_exists").query(conn, sql::SELECT_TRIGGER_EXISTENCE, key_params(key))?;
    Ok(!rows.is_empty())
}

pub(super) fn select_trigger<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &TriggerKey,
) -> Result<Option<Trigger>> {
    let call = Call::new(d, "select_trigger");
    let rows = call.query(conn, sql::SELECT_TRIGGER, key_params(key))?;
    rows.first().map(|row| trigger_from_row(&call, row)).transpose()
}

fn trigger_from_row<D: DriverDelegate + ?Sized>(call: &Call<'_, D>, row: &Row) -> Result<Trigger> {
    Ok(Trigger {
        key: call.trigger_key(row, 0, 1)?,
        job_key: call.job_key(row, 2, 3)?,
        description: call.opt_text(row, 4)?,
        next_fire_time: call.opt_timestamp(row, 5)?,
        prev_fire_time: call.opt_timestamp(row, 6)?,
        priority: call.i32_or(row, 7, Trigger::DEFAULT_PRIORITY)?,
        state: call.state(row, 8)?,
        trigger_type: call.text(row, 9)?,
        start_time: call.timestamp(row, 10)?,
        end_time: call.opt_timestamp(row, 11)?,
        calendar_name: call.opt_text(row, 12)?,
        misfire_instruction: call.i32_or(row, 13, 0)?,
        job_data: call.job_data(row, 14)?,
    })
}

pub(super) fn select_triggers_for_job<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    job: &JobKey,
) -> Result<Vec<TriggerKey>> {
    let call = Call::new(d, "select_triggers_for_job");
    let rows = call.query(conn, sql::SELECT_TRIGGERS_FOR_JOB, jobs::key_params(job))?;
    keys(&call, &rows)
}

pub(super) fn select_num_triggers_for_job<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    job: &JobKey,
) -> Result<u64> {
    let call = Call::new(d, "select_num_triggers_for_job");
    let rows = call.query(conn, sql::SELECT_NUM_TRIGGERS_FOR_JOB, jobs::key_params(job))?;
    call.count(&rows)
}

pub(super) fn select_trigger_keys<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    matcher: &GroupMatcher,
) -> Result<Vec<TriggerKey>> {
    let call = Call::new(d, "select_trigger_keys");
    let rows = match matcher {
        GroupMatcher::Equals(group) => {
            call.query(conn, sql::SELECT_TRIGGERS_IN_GROUP, vec![val(group.as_str())])?
        }
        _ => {
            let pattern = matcher.like_pattern().unwrap_or_default();
            call.query(conn, sql::SELECT_TRIGGERS_IN_GROUP_LIKE, vec![val(pattern)])?
        }
    };
    keys(&call, &rows)
}

pub(super) fn select_trigger_groups<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<Vec<String>> {
    let call = Call::new(d, "select_trigger_groups");
    let rows = call.query(conn, sql::SELECT_TRIGGER_GROUPS, Vec::new())?;
    call.texts(&rows)
}

pub(super) fn select_num_triggers<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<u64> {
    let call = Call::new(d, "select_num_triggers");
    let rows = call.query(conn, sql::SELECT_NUM_TRIGGERS, Vec::new())?;
    call.count(&rows)
}

pub(super) fn select_trigger_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &TriggerKey,
) -> Result<Option<TriggerState>> {
    let call = Call::new(d, "select_trigger_state");
    let rows = call.query(conn, sql::SELECT_TRIGGER_STATE, key_params(key))?;
    rows.first().map(|row| call.state(row, 0)).transpose()
}

pub(super) fn update_trigger_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &TriggerKey,
    state: TriggerState,
) -> Result<usize> {
    Call::new(d, "update_trigger_state").execute(
        conn,
        sql::UPDATE_TRIGGER_STATE,
        vec![
            val(state.as_str()),
            val(key.name.as_str()),
            val(key.group.as_str()),
        ],
    )
}

pub(super) fn update_trigger_state_from_other_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &TriggerKey,
    new_state: TriggerState,
    old_state: TriggerState,
) -> Result<usize> {
    Call::new(d, "update_trigger_state_from_other_state").execute(
        conn,
        sql::UPDATE_TRIGGER_STATE_FROM_STATE,
        vec![
            val(new_state.as_str()),
            val(key.name.as_str()),
            val(key.group.as_str()),
            val(old_state.as_str()),
        ],
    )
}

pub(super) fn update_trigger_states_for_job<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    job: &JobKey,
    state: TriggerState,
) -> Result<usize> {
    Call::new(d, "update_trigger_states_for_job").execute(
        conn,
        sql::UPDATE_JOB_TRIGGER_STATES,
        vec![
            val(state.as_str()),
            val(job.name.as_str()),
            val(job.group.as_str()),
        ],
    )
}

pub(super) fn select_triggers_in_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    state: TriggerState,
) -> Result<Vec<TriggerKey>> {
    let call = Call::new(d, "select_triggers_in_state");
    let rows = call.query(conn, sql::SELECT_TRIGGERS_IN_STATE, vec![val(state.as_str())])?;
    keys(&call, &rows)
}

pub(super) fn select_triggers_to_acquire<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    no_later_than: DateTime<Utc>,
    no_earlier_than: DateTime<Utc>,
    max_count: usize,
) -> Result<Vec<TriggerKey>> {
    let call = Call::new(d, "select_triggers_to_acquire");
    if max_count == 0 {
        return Ok(Vec::new());
    }
    let rows = call.query_limited(
        conn,
        sql::SELECT_NEXT_TRIGGERS_TO_ACQUIRE,
        vec![
            val(TriggerState::Waiting.as_str()),
            call.at_most_param(no_later_than)?,
            call.at_least_param(no_earlier_than)?,
        ],
        max_count,
    )?;
    keys(&call, &rows)
}

pub(super) fn select_misfired_triggers_in_state<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    state: TriggerState,
    before: DateTime<Utc>,
) -> Result<Vec<TriggerKey>> {
    let call = Call::new(d, "select_misfired_triggers_in_state");
    let rows = call.query(
        conn,
        sql::SELECT_MISFIRED_TRIGGERS_IN_STATE,
        vec![call.at_least_param(before)?, val(state.as_str())],
    )?;
    keys(&call, &rows)
}

// --- paused groups ----------------------------------------------------------

pub(super) fn insert_paused_trigger_group<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    group: &str,
) -> Result<usize> {
    Call::new(d, "insert_paused_trigger_group").execute(
        conn,
        sql::INSERT_PAUSED_TRIGGER_GROUP,
        vec![val(group)],
    )
}

pub(super) fn delete_paused_trigger_group<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    group: &str,
) -> Result<usize> {
    Call::new(d, "delete_paused_trigger_group").execute(
        conn,
        sql::DELETE_PAUSED_TRIGGER_GROUP,
        vec![val(group)],
    )
}

pub(super) fn is_trigger_group_paused<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    group: &str,
) -> Result<bool> {
    let rows = Call::new(d, "is_trigger_group_paused").query(
        conn,
        sql::SELECT_PAUSED_TRIGGER_GROUP,
        vec![val(group)],
    )?;
    Ok(!rows.is_empty())
}

pub(super) fn select_paused_trigger_groups<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<Vec<String>> {
    let call = Call::new(d, "select_paused_trigger_groups");
    let rows = call.query(conn, sql::SELECT_PAUSED_TRIGGER_GROUPS, Vec::new())?;
    call.texts(&rows)
}

fn key_params(key: &TriggerKey) -> Vec<Param> {
    vec![val(key.name.as_str()), val(key.group.as_str())]
}

fn keys<D: DriverDelegate + ?Sized>(call: &Call<'_, D>, rows: &[Row]) -> Result<Vec<TriggerKey>> {
    rows.iter().map(|row| call.trigger_key(row, 0, 1)).collect()
}
