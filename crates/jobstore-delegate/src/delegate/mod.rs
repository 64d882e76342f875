//! The driver delegate contract and its standard-SQL implementation.
//!
//! Every persistence operation is a provided method on [`DriverDelegate`]
//! built from three required accessors. Dialects diverge only through the
//! injected [`TypeMarshaller`], so statement text is identical across them;
//! a plugin that needs more can override individual operations.

mod calendars;
mod call;
mod fired;
mod jobs;
mod triggers;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobstore_core::types::{
    Calendar, FiredTrigger, FiredTriggerRecord, GroupMatcher, JobDetail, JobKey,
    SchedulerStateRecord, Trigger, TriggerKey, TriggerState,
};
use jobstore_core::StoreConfig;
use serde::Serialize;

use crate::conn::{Connection, Row, Statement};
use crate::dialect::Dialect;
use crate::error::{DelegateError, Result};
use crate::marshal::{StandardMarshaller, TypeMarshaller};
use crate::sql;

/// Configuration a delegate holds for the lifetime of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateSettings {
    pub table_prefix: String,
    /// Owner recorded in fired-trigger and check-in rows.
    pub instance_id: String,
    pub scheduler_name: String,
}

impl DelegateSettings {
    pub fn new(
        table_prefix: impl Into<String>,
        instance_id: impl Into<String>,
        scheduler_name: impl Into<String>,
    ) -> Self {
        Self {
            table_prefix: table_prefix.into(),
            instance_id: instance_id.into(),
            scheduler_name: scheduler_name.into(),
        }
    }

    /// Settings for a store, with an `AUTO` instance id expanded.
    pub fn from_store_config(config: &StoreConfig) -> Self {
        Self::new(
            config.table_prefix.clone(),
            config.resolved_instance_id(),
            config.scheduler_name.clone(),
        )
    }
}

pub trait DriverDelegate: Send + Sync + fmt::Debug {
    /// Identifier reported in errors and logs (e.g. "DB2v8").
    fn dialect(&self) -> &str;

    fn settings(&self) -> &DelegateSettings;

    fn marshaller(&self) -> &dyn TypeMarshaller;

    /// Render a statement template for this delegate's prefix and scheduler.
    fn sql(&self, template: &str) -> String {
        let settings = self.settings();
        sql::render(template, &settings.table_prefix, &settings.scheduler_name)
    }

    fn bind_boolean(
        &self,
        statement: &mut dyn Statement,
        position: usize,
        value: bool,
    ) -> Result<()> {
        statement
            .bind(position, self.marshaller().encode_bool(value))
            .map_err(|source| DelegateError::Statement {
                operation: "bind_boolean",
                dialect: self.dialect().to_string(),
                source,
            })
    }

    fn read_boolean(&self, row: &Row, column: usize) -> Result<bool> {
        let value = row.column(column).map_err(|source| DelegateError::Statement {
            operation: "read_boolean",
            dialect: self.dialect().to_string(),
            source,
        })?;
        self.marshaller()
            .decode_bool(value)
            .map_err(|source| DelegateError::Marshal {
                operation: "read_boolean",
                dialect: self.dialect().to_string(),
                source,
            })
    }

    // --- jobs ---------------------------------------------------------------

    fn insert_job_detail(&self, conn: &dyn Connection, job: &JobDetail) -> Result<usize> {
        jobs::insert_job_detail(self, conn, job)
    }

    fn update_job_detail(&self, conn: &dyn Connection, job: &JobDetail) -> Result<usize> {
        jobs::update_job_detail(self, conn, job)
    }

    /// Rewrite only the data map of an existing job.
    fn update_job_data(&self, conn: &dyn Connection, job: &JobDetail) -> Result<usize> {
        jobs::update_job_data(self, conn, job)
    }

    fn delete_job_detail(&self, conn: &dyn Connection, key: &JobKey) -> Result<usize> {
        jobs::delete_job_detail(self, conn, key)
    }

    fn job_exists(&self, conn: &dyn Connection, key: &JobKey) -> Result<bool> {
        jobs::job_exists(self, conn, key)
    }

    fn select_job_detail(&self, conn: &dyn Connection, key: &JobKey) -> Result<Option<JobDetail>> {
        jobs::select_job_detail(self, conn, key)
    }

    /// `false` for unknown jobs.
    fn is_job_nonconcurrent(&self, conn: &dyn Connection, key: &JobKey) -> Result<bool> {
        jobs::is_job_nonconcurrent(self, conn, key)
    }

    fn select_job_keys(&self, conn: &dyn Connection, matcher: &GroupMatcher) -> Result<Vec<JobKey>> {
        jobs::select_job_keys(self, conn, matcher)
    }

    fn select_job_groups(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        jobs::select_job_groups(self, conn)
    }

    fn select_num_jobs(&self, conn: &dyn Connection) -> Result<u64> {
        jobs::select_num_jobs(self, conn)
    }

    // --- triggers -----------------------------------------------------------

    fn insert_trigger(&self, conn: &dyn Connection, trigger: &Trigger) -> Result<usize> {
        triggers::insert_trigger(self, conn, trigger)
    }

    fn update_trigger(&self, conn: &dyn Connection, trigger: &Trigger) -> Result<usize> {
        triggers::update_trigger(self, conn, trigger)
    }

    fn delete_trigger(&self, conn: &dyn Connection, key: &TriggerKey) -> Result<usize> {
        triggers::delete_trigger(self, conn, key)
    }

    fn trigger_exists(&self, conn: &dyn Connection, key: &TriggerKey) -> Result<bool> {
        triggers::trigger_exists(self, conn, key)
    }

    fn select_trigger(&self, conn: &dyn Connection, key: &TriggerKey) -> Result<Option<Trigger>> {
        triggers::select_trigger(self, conn, key)
    }

    fn select_triggers_for_job(&self, conn: &dyn Connection, job: &JobKey) -> Result<Vec<TriggerKey>> {
        triggers::select_triggers_for_job(self, conn, job)
    }

    fn select_num_triggers_for_job(&self, conn: &dyn Connection, job: &JobKey) -> Result<u64> {
        triggers::select_num_triggers_for_job(self, conn, job)
    }

    fn select_trigger_keys(
        &self,
        conn: &dyn Connection,
        matcher: &GroupMatcher,
    ) -> Result<Vec<TriggerKey>> {
        triggers::select_trigger_keys(self, conn, matcher)
    }

    fn select_trigger_groups(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        triggers::select_trigger_groups(self, conn)
    }

    fn select_num_triggers(&self, conn: &dyn Connection) -> Result<u64> {
        triggers::select_num_triggers(self, conn)
    }

    fn select_trigger_state(
        &self,
        conn: &dyn Connection,
        key: &TriggerKey,
    ) -> Result<Option<TriggerState>> {
        triggers::select_trigger_state(self, conn, key)
    }

    fn update_trigger_state(
        &self,
        conn: &dyn Connection,
        key: &TriggerKey,
        state: TriggerState,
    ) -> Result<usize> {
        triggers::update_trigger_state(self, conn, key, state)
    }

    /// Compare-and-set: only rows currently in `old_state` change.
    fn update_trigger_state_from_other_state(
        &self,
        conn: &dyn Connection,
        key: &TriggerKey,
        new_state: TriggerState,
        old_state: TriggerState,
    ) -> Result<usize> {
        triggers::update_trigger_state_from_other_state(self, conn, key, new_state, old_state)
    }

    fn update_trigger_states_for_job(
        &self,
        conn: &dyn Connection,
        job: &JobKey,
        state: TriggerState,
    ) -> Result<usize> {
        triggers::update_trigger_states_for_job(self, conn, job, state)
    }

    fn select_triggers_in_state(
        &self,
        conn: &dyn Connection,
        state: TriggerState,
    ) -> Result<Vec<TriggerKey>> {
        triggers::select_triggers_in_state(self, conn, state)
    }

    /// Waiting triggers due by `no_later_than`, earliest first then by
    /// priority. Triggers that honour misfires must also be due after
    /// `no_earlier_than`. At most `max_count` keys are returned.
    fn select_triggers_to_acquire(
        &self,
        conn: &dyn Connection,
        no_later_than: DateTime<Utc>,
        no_earlier_than: DateTime<Utc>,
        max_count: usize,
    ) -> Result<Vec<TriggerKey>> {
        triggers::select_triggers_to_acquire(self, conn, no_later_than, no_earlier_than, max_count)
    }

    fn select_misfired_triggers_in_state(
        &self,
        conn: &dyn Connection,
        state: TriggerState,
        before: DateTime<Utc>,
    ) -> Result<Vec<TriggerKey>> {
        triggers::select_misfired_triggers_in_state(self, conn, state, before)
    }

    fn insert_paused_trigger_group(&self, conn: &dyn Connection, group: &str) -> Result<usize> {
        triggers::insert_paused_trigger_group(self, conn, group)
    }

    fn delete_paused_trigger_group(&self, conn: &dyn Connection, group: &str) -> Result<usize> {
        triggers::delete_paused_trigger_group(self, conn, group)
    }

    fn is_trigger_group_paused(&self, conn: &dyn Connection, group: &str) -> Result<bool> {
        triggers::is_trigger_group_paused(self, conn, group)
    }

    fn select_paused_trigger_groups(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        triggers::select_paused_trigger_groups(self, conn)
    }

    // --- calendars ----------------------------------------------------------

    fn insert_calendar(&self, conn: &dyn Connection, calendar: &Calendar) -> Result<usize> {
        calendars::insert_calendar(self, conn, calendar)
    }

    fn update_calendar(&self, conn: &dyn Connection, calendar: &Calendar) -> Result<usize> {
        calendars::update_calendar(self, conn, calendar)
    }

    fn delete_calendar(&self, conn: &dyn Connection, name: &str) -> Result<usize> {
        calendars::delete_calendar(self, conn, name)
    }

    fn calendar_exists(&self, conn: &dyn Connection, name: &str) -> Result<bool> {
        calendars::calendar_exists(self, conn, name)
    }

    /// Whether any trigger names this calendar.
    fn calendar_is_referenced(&self, conn: &dyn Connection, name: &str) -> Result<bool> {
        calendars::calendar_is_referenced(self, conn, name)
    }

    fn select_calendar(&self, conn: &dyn Connection, name: &str) -> Result<Option<Calendar>> {
        calendars::select_calendar(self, conn, name)
    }

    fn select_calendar_names(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        calendars::select_calendar_names(self, conn)
    }

    // --- fired triggers, scheduler state, locks -----------------------------

    /// Record a fired trigger owned by this delegate's instance.
    fn insert_fired_trigger(&self, conn: &dyn Connection, fired: &FiredTrigger) -> Result<usize> {
        fired::insert_fired_trigger(self, conn, fired)
    }

    /// Rewrite a fired-trigger row by entry id, claiming it for this instance.
    fn update_fired_trigger(&self, conn: &dyn Connection, fired: &FiredTrigger) -> Result<usize> {
        fired::update_fired_trigger(self, conn, fired)
    }

    fn delete_fired_trigger(&self, conn: &dyn Connection, entry_id: &str) -> Result<usize> {
        fired::delete_fired_trigger(self, conn, entry_id)
    }

    fn delete_fired_triggers_for_instance(
        &self,
        conn: &dyn Connection,
        instance_id: &str,
    ) -> Result<usize> {
        fired::delete_fired_triggers_for_instance(self, conn, instance_id)
    }

    /// All fired-trigger rows, or only those owned by `instance_id`.
    fn select_fired_trigger_records(
        &self,
        conn: &dyn Connection,
        instance_id: Option<&str>,
    ) -> Result<Vec<FiredTriggerRecord>> {
        fired::select_fired_trigger_records(self, conn, instance_id)
    }

    fn select_fired_trigger_instance_names(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        fired::select_fired_trigger_instance_names(self, conn)
    }

    fn insert_scheduler_state(
        &self,
        conn: &dyn Connection,
        checkin_time: DateTime<Utc>,
        checkin_interval_ms: i64,
    ) -> Result<usize> {
        fired::insert_scheduler_state(self, conn, checkin_time, checkin_interval_ms)
    }

    fn update_scheduler_state(&self, conn: &dyn Connection, checkin_time: DateTime<Utc>) -> Result<usize> {
        fired::update_scheduler_state(self, conn, checkin_time)
    }

    fn delete_scheduler_state(&self, conn: &dyn Connection, instance_id: &str) -> Result<usize> {
        fired::delete_scheduler_state(self, conn, instance_id)
    }

    fn select_scheduler_state_records(
        &self,
        conn: &dyn Connection,
        instance_id: Option<&str>,
    ) -> Result<Vec<SchedulerStateRecord>> {
        fired::select_scheduler_state_records(self, conn, instance_id)
    }

    fn insert_lock(&self, conn: &dyn Connection, lock_name: &str) -> Result<usize> {
        fired::insert_lock(self, conn, lock_name)
    }

    fn select_lock_names(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        fired::select_lock_names(self, conn)
    }

    /// Delete every job, trigger, calendar, paused group and fired trigger
    /// belonging to this scheduler. Check-in and lock rows are kept.
    fn clear_data(&self, conn: &dyn Connection) -> Result<()> {
        fired::clear_data(self, conn)
    }
}

/// The standard-SQL delegate. Dialect variants are this struct with a
/// different marshaller.
#[derive(Debug, Clone)]
pub struct StdDelegate {
    dialect: String,
    settings: DelegateSettings,
    marshaller: Arc<dyn TypeMarshaller>,
}

impl StdDelegate {
    pub fn new(settings: DelegateSettings) -> Self {
        Self::with_marshaller(
            Dialect::Standard.identifier(),
            settings,
            Arc::new(StandardMarshaller),
        )
    }

    pub fn for_dialect(dialect: Dialect, settings: DelegateSettings) -> Self {
        Self::with_marshaller(dialect.identifier(), settings, dialect.marshaller())
    }

    /// Base statements with a custom rule set, for plugin dialects.
    pub fn with_marshaller(
        dialect: impl Into<String>,
        settings: DelegateSettings,
        marshaller: Arc<dyn TypeMarshaller>,
    ) -> Self {
        Self {
            dialect: dialect.into(),
            settings,
            marshaller,
        }
    }
}

impl DriverDelegate for StdDelegate {
    fn dialect(&self) -> &str {
        &self.dialect
    }

    fn settings(&self) -> &DelegateSettings {
        &self.settings
    }

    fn marshaller(&self) -> &dyn TypeMarshaller {
        self.marshaller.as_ref()
    }
}
