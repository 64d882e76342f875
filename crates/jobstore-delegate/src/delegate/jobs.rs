use jobstore_core::types::{GroupMatcher, JobDetail, JobKey};

use super::call::{flag, val, Call, Param};
use super::DriverDelegate;
use crate::conn::{Connection, Row};
use crate::error::Result;
use crate::sql;

pub(super) fn insert_job_detail<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    job: &JobDetail,
) -> Result<usize> {
    let call = Call::new(d, "insert_job_detail");
    let data = call.job_data_param(&job.job_data)?;
    call.execute(
        conn,
        sql::INSERT_JOB_DETAIL,
        vec![
            val(job.key.name.as_str()),
            val(job.key.group.as_str()),
            val(job.description.as_deref()),
            val(job.job_type.as_str()),
            flag(job.durable),
            flag(job.nonconcurrent),
            flag(job.update_data),
            flag(job.requests_recovery),
            data,
        ],
    )
}

pub(super) fn update_job_detail<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    job: &JobDetail,
) -> Result<usize> {
    let call = Call::new(d, "update_job_detail");
    let data = call.job_data_param(&job.job_data)?;
    call.execute(
        conn,
        sql::UPDATE_JOB_DETAIL,
        vec![
            val(job.description.as_deref()),
            val(job.job_type.as_str()),
            flag(job.durable),
            flag(job.nonconcurrent),
            flag(job.update_data),
            flag(job.requests_recovery),
            data,
            val(job.key.name.as_str()),
            val(job.key.group.as_str()),
        ],
    )
}

pub(super) fn update_job_data<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    job: &JobDetail,
) -> Result<usize> {
    let call = Call::new(d, "update_job_data");
    let data = call.job_data_param(&job.job_data)?;
    call.execute(
        conn,
        sql::UPDATE_JOB_DATA,
        vec![data, val(job.key.name.as_str()), val(job.key.group.as_str())],
    )
}

pub(super) fn delete_job_detail<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &JobKey,
) -> Result<usize> {
    Call::new(d, "delete_job_detail").execute(conn, sql::DELETE_JOB_DETAIL, key_params(key))
}

pub(super) fn job_exists<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &JobKey,
) -> Result<bool> {
    let rows = Call::new(d, "job_exists").query(conn, sql::SELECT_JOB_EXISTENCE, key_params(key))?;
    Ok(!rows.is_empty())
}

pub(super) fn select_job_detail<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &JobKey,
) -> Result<Option<JobDetail>> {
    let call = Call::new(d, "select_job_detail");
    let rows = call.query(conn, sql::SELECT_JOB_DETAIL, key_params(key))?;
    rows.first().map(|row| job_from_row(&call, row)).transpose()
}

fn job_from_row<D: DriverDelegate + ?Sized>(call: &Call<'_, D>, row: &Row) -> Result<JobDetail> {
    Ok(JobDetail {
        key: call.job_key(row, 0, 1)?,
        description: call.opt_text(row, 2)?,
        job_type: call.text(row, 3)?,
        durable: call.boolean(row, 4)?,
        nonconcurrent: call.boolean(row, 5)?,
        update_data: call.boolean(row, 6)?,
        requests_recovery: call.boolean(row, 7)?,
        job_data: call.job_data(row, 8)?,
    })
}

pub(super) fn is_job_nonconcurrent<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    key: &JobKey,
) -> Result<bool> {
    let call = Call::new(d, "is_job_nonconcurrent");
    let rows = call.query(conn, sql::SELECT_JOB_NONCONCURRENT, key_params(key))?;
    match rows.first() {
        Some(row) => call.boolean(row, 0),
        None => Ok(false),
    }
}

pub(super) fn select_job_keys<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    matcher: &GroupMatcher,
) -> Result<Vec<JobKey>> {
    let call = Call::new(d, "select_job_keys");
    let rows = match matcher {
        GroupMatcher::Equals(group) => {
            call.query(conn, sql::SELECT_JOBS_IN_GROUP, vec![val(group.as_str())])?
        }
        _ => {
            let pattern = matcher.like_pattern().unwrap_or_default();
            call.query(conn, sql::SELECT_JOBS_IN_GROUP_LIKE, vec![val(pattern)])?
        }
    };
    rows.iter().map(|row| call.job_key(row, 0, 1)).collect()
}

pub(super) fn select_job_groups<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<Vec<String>> {
    let call = Call::new(d, "select_job_groups");
    let rows = call.query(conn, sql::SELECT_JOB_GROUPS, Vec::new())?;
    call.texts(&rows)
}

pub(super) fn select_num_jobs<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<u64> {
    let call = Call::new(d, "select_num_jobs");
    let rows = call.query(conn, sql::SELECT_NUM_JOBS, Vec::new())?;
    call.count(&rows)
}

pub(super) fn key_params(key: &JobKey) -> Vec<Param> {
    vec![val(key.name.as_str()), val(key.group.as_str())]
}
