use rusqlite::{Connection, Result};

/// Initialise the job store schema in `conn`, with every table name
/// prefixed by `table_prefix`.
///
/// Idempotent. Booleans are `INTEGER` 0/1, data maps and calendars are
/// `BLOB`, timestamps are `INTEGER` epoch milliseconds. The prefix is
/// spliced into DDL verbatim and must already be validated
/// (see `StoreConfig::validate`).
pub fn init_sqlite(conn: &Connection, table_prefix: &str) -> Result<()> {
    conn.execute_batch(&SQLITE_SCHEMA.replace("{prefix}", table_prefix))
}

const SQLITE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS {prefix}job_details (
        sched_name          TEXT    NOT NULL,
        job_name            TEXT    NOT NULL,
        job_group           TEXT    NOT NULL,
        description         TEXT,
        job_type            TEXT    NOT NULL,
        is_durable          INTEGER NOT NULL,
        is_nonconcurrent    INTEGER NOT NULL,
        is_update_data      INTEGER NOT NULL,
        requests_recovery   INTEGER NOT NULL,
        job_data            BLOB,
        PRIMARY KEY (sched_name, job_name, job_group)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS {prefix}triggers (
        sched_name      TEXT    NOT NULL,
        trigger_name    TEXT    NOT NULL,
        trigger_group   TEXT    NOT NULL,
        job_name        TEXT    NOT NULL,
        job_group       TEXT    NOT NULL,
        description     TEXT,
        next_fire_time  INTEGER,
        prev_fire_time  INTEGER,
        priority        INTEGER,
        trigger_state   TEXT    NOT NULL,
        trigger_type    TEXT    NOT NULL,
        start_time      INTEGER NOT NULL,
        end_time        INTEGER,
        calendar_name   TEXT,
        misfire_instr   INTEGER,
        job_data        BLOB,
        PRIMARY KEY (sched_name, trigger_name, trigger_group),
        FOREIGN KEY (sched_name, job_name, job_group)
            REFERENCES {prefix}job_details (sched_name, job_name, job_group)
    ) STRICT;

    -- Acquisition scans: WHERE trigger_state = ? AND next_fire_time <= ?
    CREATE INDEX IF NOT EXISTS idx_{prefix}t_nft_st
        ON {prefix}triggers (sched_name, trigger_state, next_fire_time);
    CREATE INDEX IF NOT EXISTS idx_{prefix}t_j
        ON {prefix}triggers (sched_name, job_name, job_group);

    CREATE TABLE IF NOT EXISTS {prefix}calendars (
        sched_name      TEXT NOT NULL,
        calendar_name   TEXT NOT NULL,
        calendar        BLOB NOT NULL,
        PRIMARY KEY (sched_name, calendar_name)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS {prefix}paused_trigger_grps (
        sched_name      TEXT NOT NULL,
        trigger_group   TEXT NOT NULL,
        PRIMARY KEY (sched_name, trigger_group)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS {prefix}fired_triggers (
        sched_name          TEXT    NOT NULL,
        entry_id            TEXT    NOT NULL,
        trigger_name        TEXT    NOT NULL,
        trigger_group       TEXT    NOT NULL,
        instance_name       TEXT    NOT NULL,
        fired_time          INTEGER NOT NULL,
        sched_time          INTEGER NOT NULL,
        priority            INTEGER NOT NULL,
        state               TEXT    NOT NULL,
        job_name            TEXT,
        job_group           TEXT,
        is_nonconcurrent    INTEGER,
        requests_recovery   INTEGER,
        PRIMARY KEY (sched_name, entry_id)
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_{prefix}ft_inst
        ON {prefix}fired_triggers (sched_name, instance_name);

    CREATE TABLE IF NOT EXISTS {prefix}scheduler_state (
        sched_name          TEXT    NOT NULL,
        instance_name       TEXT    NOT NULL,
        last_checkin_time   INTEGER NOT NULL,
        checkin_interval    INTEGER NOT NULL,
        PRIMARY KEY (sched_name, instance_name)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS {prefix}locks (
        sched_name  TEXT NOT NULL,
        lock_name   TEXT NOT NULL,
        PRIMARY KEY (sched_name, lock_name)
    ) STRICT;
";
