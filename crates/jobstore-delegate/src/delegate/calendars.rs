use jobstore_core::types::Calendar;

use super::call::{val, Call};
use super::DriverDelegate;
use crate::conn::Connection;
use crate::error::Result;
use crate::sql;

pub(super) fn insert_calendar<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    calendar: &Calendar,
) -> Result<usize> {
    let call = Call::new(d, "insert_calendar");
    call.execute(
        conn,
        sql::INSERT_CALENDAR,
        vec![
            val(calendar.name.as_str()),
            call.bytes_param(Some(calendar.data.as_slice())),
        ],
    )
}

pub(super) fn update_calendar<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    calendar: &Calendar,
) -> Result<usize> {
    let call = Call::new(d, "update_calendar");
    call.execute(
        conn,
        sql::UPDATE_CALENDAR,
        vec![
            call.bytes_param(Some(calendar.data.as_slice())),
            val(calendar.name.as_str()),
        ],
    )
}

pub(super) fn delete_calendar<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    name: &str,
) -> Result<usize> {
    Call::new(d, "delete_calendar").execute(conn, sql::DELETE_CALENDAR, vec![val(name)])
}

pub(super) fn calendar_exists<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    name: &str,
) -> Result<bool> {
    let rows =
        Call::new(d, "calendar_exists").query(conn, sql::SELECT_CALENDAR_EXISTENCE, vec![val(name)])?;
    Ok(!rows.is_empty())
}

pub(super) fn calendar_is_referenced<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    name: &str,
) -> Result<bool> {
    let rows = Call::new(d, "calendar_is_referenced").query(
        conn,
        sql::SELECT_REFERENCED_CALENDAR,
        vec![val(name)],
    )?;
    Ok(!rows.is_empty())
}

pub(super) fn select_calendar<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
    name: &str,
) -> Result<Option<Calendar>> {
    let call = Call::new(d, "select_calendar");
    let rows = call.query(conn, sql::SELECT_CALENDAR, vec![val(name)])?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let data = call
        .opt_bytes(row, 1)?
        .ok_or_else(|| call.corrupt("calendar body is NULL"))?;
    Ok(Some(Calendar {
        name: call.text(row, 0)?,
        data,
    }))
}

pub(super) fn select_calendar_names<D: DriverDelegate + ?Sized>(
    d: &D,
    conn: &dyn Connection,
) -> Result<Vec<String>> {
    let call = Call::new(d, "select_calendar_names");
    let rows = call.query(conn, sql::SELECT_CALENDARS, Vec::new())?;
    call.texts(&rows)
}
