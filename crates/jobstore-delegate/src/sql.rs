//! Statement text shared by every dialect.
//!
//! `{prefix}` is replaced by the configured table prefix and `{sched}` by the
//! quoted scheduler name. Parameters are positional `?` markers.

/// Substitute the table prefix and scheduler name into `template`.
pub fn render(template: &str, table_prefix: &str, scheduler_name: &str) -> String {
    template
        .replace("{prefix}", table_prefix)
        .replace("{sched}", &quote_literal(scheduler_name))
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// --- jobs -------------------------------------------------------------------

pub const INSERT_JOB_DETAIL: &str = "INSERT INTO {prefix}job_details
    (sched_name, job_name, job_group, description, job_type,
     is_durable, is_nonconcurrent, is_update_data, requests_recovery, job_data)
    VALUES ({sched}, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub const UPDATE_JOB_DETAIL: &str = "UPDATE {prefix}job_details
    SET description = ?, job_type = ?, is_durable = ?, is_nonconcurrent = ?,
        is_update_data = ?, requests_recovery = ?, job_data = ?
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const UPDATE_JOB_DATA: &str = "UPDATE {prefix}job_details SET job_data = ?
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const DELETE_JOB_DETAIL: &str = "DELETE FROM {prefix}job_details
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const SELECT_JOB_EXISTENCE: &str = "SELECT job_name FROM {prefix}job_details
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const SELECT_JOB_DETAIL: &str = "SELECT job_name, job_group, description, job_type,
        is_durable, is_nonconcurrent, is_update_data, requests_recovery, job_data
    FROM {prefix}job_details
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const SELECT_JOB_NONCONCURRENT: &str = "SELECT is_nonconcurrent FROM {prefix}job_details
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const SELECT_JOBS_IN_GROUP: &str = "SELECT job_name, job_group FROM {prefix}job_details
    WHERE sched_name = {sched} AND job_group = ?
    ORDER BY job_group, job_name";

pub const SELECT_JOBS_IN_GROUP_LIKE: &str = "SELECT job_name, job_group FROM {prefix}job_details
    WHERE sched_name = {sched} AND job_group LIKE ? ESCAPE '!'
    ORDER BY job_group, job_name";

pub const SELECT_JOB_GROUPS: &str = "SELECT DISTINCT job_group FROM {prefix}job_details
    WHERE sched_name = {sched} ORDER BY job_group";

pub const SELECT_NUM_JOBS: &str = "SELECT COUNT(job_name) FROM {prefix}job_details
    WHERE sched_name = {sched}";

// --- triggers ---------------------------------------------------------------

pub const INSERT_TRIGGER: &str = "INSERT INTO {prefix}triggers
    (sched_name, trigger_name, trigger_group, job_name, job_group, description,
     next_fire_time, prev_fire_time, priority, trigger_state, trigger_type,
     start_time, end_time, calendar_name, misfire_instr, job_data)
    VALUES ({sched}, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub const UPDATE_TRIGGER: &str = "UPDATE {prefix}triggers
    SET job_name = ?, job_group = ?, description = ?, next_fire_time = ?,
        prev_fire_time = ?, priority = ?, trigger_state = ?, trigger_type = ?,
        start_time = ?, end_time = ?, calendar_name = ?, misfire_instr = ?, job_data = ?
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ?";

pub const DELETE_TRIGGER: &str = "DELETE FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ?";

pub const SELECT_TRIGGER_EXISTENCE: &str = "SELECT trigger_name FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ?";

pub const SELECT_TRIGGER: &str = "SELECT trigger_name, trigger_group, job_name, job_group,
        description, next_fire_time, prev_fire_time, priority, trigger_state,
        trigger_type, start_time, end_time, calendar_name, misfire_instr, job_data
    FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ?";

pub const SELECT_TRIGGERS_FOR_JOB: &str = "SELECT trigger_name, trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?
    ORDER BY trigger_group, trigger_name";

pub const SELECT_NUM_TRIGGERS_FOR_JOB: &str = "SELECT COUNT(trigger_name) FROM {prefix}triggers
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const SELECT_TRIGGERS_IN_GROUP: &str = "SELECT trigger_name, trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_group = ?
    ORDER BY trigger_group, trigger_name";

pub const SELECT_TRIGGERS_IN_GROUP_LIKE: &str = "SELECT trigger_name, trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_group LIKE ? ESCAPE '!'
    ORDER BY trigger_group, trigger_name";

pub const SELECT_TRIGGER_GROUPS: &str = "SELECT DISTINCT trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} ORDER BY trigger_group";

pub const SELECT_NUM_TRIGGERS: &str = "SELECT COUNT(trigger_name) FROM {prefix}triggers
    WHERE sched_name = {sched}";

pub const SELECT_TRIGGER_STATE: &str = "SELECT trigger_state FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ?";

pub const UPDATE_TRIGGER_STATE: &str = "UPDATE {prefix}triggers SET trigger_state = ?
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ?";

pub const UPDATE_TRIGGER_STATE_FROM_STATE: &str = "UPDATE {prefix}triggers SET trigger_state = ?
    WHERE sched_name = {sched} AND trigger_name = ? AND trigger_group = ? AND trigger_state = ?";

pub const UPDATE_JOB_TRIGGER_STATES: &str = "UPDATE {prefix}triggers SET trigger_state = ?
    WHERE sched_name = {sched} AND job_name = ? AND job_group = ?";

pub const SELECT_TRIGGERS_IN_STATE: &str = "SELECT trigger_name, trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_state = ?
    ORDER BY trigger_group, trigger_name";

pub const SELECT_NEXT_TRIGGERS_TO_ACQUIRE: &str = "SELECT trigger_name, trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} AND trigger_state = ? AND next_fire_time <= ?
      AND (misfire_instr = -1 OR (misfire_instr <> -1 AND next_fire_time >= ?))
    ORDER BY next_fire_time ASC, priority DESC";

pub const SELECT_MISFIRED_TRIGGERS_IN_STATE: &str = "SELECT trigger_name, trigger_group FROM {prefix}triggers
    WHERE sched_name = {sched} AND misfire_instr <> -1 AND next_fire_time < ? AND trigger_state = ?
    ORDER BY next_fire_time ASC, priority DESC";

// --- paused trigger groups --------------------------------------------------

pub const INSERT_PAUSED_TRIGGER_GROUP: &str = "INSERT INTO {prefix}paused_trigger_grps
    (sched_name, trigger_group) VALUES ({sched}, ?)";

pub const DELETE_PAUSED_TRIGGER_GROUP: &str = "DELETE FROM {prefix}paused_trigger_grps
    WHERE sched_name = {sched} AND trigger_group = ?";

pub const SELECT_PAUSED_TRIGGER_GROUP: &str = "SELECT trigger_group FROM {prefix}paused_trigger_grps
    WHERE sched_name = {sched} AND trigger_group = ?";

pub const SELECT_PAUSED_TRIGGER_GROUPS: &str = "SELECT trigger_group FROM {prefix}paused_trigger_grps
    WHERE sched_name = {sched} ORDER BY trigger_group";

// --- calendars --------------------------------------------------------------

pub const INSERT_CALENDAR: &str = "INSERT INTO {prefix}calendars
    (sched_name, calendar_name, calendar) VALUES ({sched}, ?, ?)";

pub const UPDATE_CALENDAR: &str = "UPDATE {prefix}calendars SET calendar = ?
    WHERE sched_name = {sched} AND calendar_name = ?";

pub const DELETE_CALENDAR: &str = "DELETE FROM {prefix}calendars
    WHERE sched_name = {sched} AND calendar_name = ?";

pub const SELECT_CALENDAR_EXISTENCE: &str = "SELECT calendar_name FROM {prefix}calendars
    WHERE sched_name = {sched} AND calendar_name = ?";

pub const SELECT_CALENDAR: &str = "SELECT calendar_name, calendar FROM {prefix}calendars
    WHERE sched_name = {sched} AND calendar_name = ?";

pub const SELECT_REFERENCED_CALENDAR: &str = "SELECT calendar_name FROM {prefix}triggers
    WHERE sched_name = {sched} AND calendar_name = ?";

pub const SELECT_CALENDARS: &str = "SELECT calendar_name FROM {prefix}calendars
    WHERE sched_name = {sched} ORDER BY calendar_name";

// --- fired triggers ---------------------------------------------------------

pub const INSERT_FIRED_TRIGGER: &str = "INSERT INTO {prefix}fired_triggers
    (sched_name, entry_id, trigger_name, trigger_group, instance_name, fired_time,
     sched_time, priority, state, job_name, job_group, is_nonconcurrent, requests_recovery)
    VALUES ({sched}, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub const UPDATE_FIRED_TRIGGER: &str = "UPDATE {prefix}fired_triggers
    SET instance_name = ?, fired_time = ?, sched_time = ?, state = ?, job_name = ?,
        job_group = ?, is_nonconcurrent = ?, requests_recovery = ?
    WHERE sched_name = {sched} AND entry_id = ?";

pub const DELETE_FIRED_TRIGGER: &str = "DELETE FROM {prefix}fired_triggers
    WHERE sched_name = {sched} AND entry_id = ?";

pub const DELETE_INSTANCES_FIRED_TRIGGERS: &str = "DELETE FROM {prefix}fired_triggers
    WHERE sched_name = {sched} AND instance_name = ?";

pub const SELECT_FIRED_TRIGGERS: &str = "SELECT entry_id, trigger_name, trigger_group, instance_name,
        fired_time, sched_time, priority, state, job_name, job_group,
        is_nonconcurrent, requests_recovery
    FROM {prefix}fired_triggers
    WHERE sched_name = {sched} ORDER BY fired_time, entry_id";

pub const SELECT_INSTANCES_FIRED_TRIGGERS: &str = "SELECT entry_id, trigger_name, trigger_group, instance_name,
        fired_time, sched_time, priority, state, job_name, job_group,
        is_nonconcurrent, requests_recovery
    FROM {prefix}fired_triggers
    WHERE sched_name = {sched} AND instance_name = ? ORDER BY fired_time, entry_id";

pub const SELECT_FIRED_TRIGGER_INSTANCE_NAMES: &str = "SELECT DISTINCT instance_name FROM {prefix}fired_triggers
    WHERE sched_name = {sched} ORDER BY instance_name";

// --- scheduler state --------------------------------------------------------

pub const INSERT_SCHEDULER_STATE: &str = "INSERT INTO {prefix}scheduler_state
    (sched_name, instance_name, last_checkin_time, checkin_interval)
    VALUES ({sched}, ?, ?, ?)";

pub const UPDATE_SCHEDULER_STATE: &str = "UPDATE {prefix}scheduler_state SET last_checkin_time = ?
    WHERE sched_name = {sched} AND instance_name = ?";

pub const DELETE_SCHEDULER_STATE: &str = "DELETE FROM {prefix}scheduler_state
    WHERE sched_name = {sched} AND instance_name = ?";

pub const SELECT_SCHEDULER_STATES: &str = "SELECT instance_name, last_checkin_time, checkin_interval
    FROM {prefix}scheduler_state WHERE sched_name = {sched} ORDER BY instance_name";

pub const SELECT_SCHEDULER_STATE: &str = "SELECT instance_name, last_checkin_time, checkin_interval
    FROM {prefix}scheduler_state WHERE sched_name = {sched} AND instance_name = ?";

// --- locks ------------------------------------------------------------------

pub const INSERT_LOCK: &str = "INSERT INTO {prefix}locks (sched_name, lock_name) VALUES ({sched}, ?)";

pub const SELECT_LOCK_NAMES: &str = "SELECT lock_name FROM {prefix}locks
    WHERE sched_name = {sched} ORDER BY lock_name";

// --- maintenance ------------------------------------------------------------

pub const DELETE_ALL_FIRED_TRIGGERS: &str = "DELETE FROM {prefix}fired_triggers WHERE sched_name = {sched}";
pub const DELETE_ALL_TRIGGERS: &str = "DELETE FROM {prefix}triggers WHERE sched_name = {sched}";
pub const DELETE_ALL_JOB_DETAILS: &str = "DELETE FROM {prefix}job_details WHERE sched_name = {sched}";
pub const DELETE_ALL_CALENDARS: &str = "DELETE FROM {prefix}calendars WHERE sched_name = {sched}";
pub const DELETE_ALL_PAUSED_TRIGGER_GROUPS: &str =
    "DELETE FROM {prefix}paused_trigger_grps WHERE sched_name = {sched}";
