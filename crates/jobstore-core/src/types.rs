use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Group used when a key is created without one.
pub const DEFAULT_GROUP: &str = "DEFAULT";

/// Misfire instruction that opts a trigger out of misfire handling.
pub const MISFIRE_IGNORE: i32 = -1;

/// Lock row guarding trigger acquisition and firing.
pub const LOCK_TRIGGER_ACCESS: &str = "TRIGGER_ACCESS";
/// Lock row guarding scheduler check-in bookkeeping.
pub const LOCK_STATE_ACCESS: &str = "STATE_ACCESS";

/// Timestamps are stored with millisecond precision. Rounds `t` down to it.
pub fn truncate_to_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    t.trunc_subsecs(3)
}

/// The current time at store precision.
pub fn store_now() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

macro_rules! store_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            pub name: String,
            pub group: String,
        }

        impl $name {
            pub fn new(name: impl Into<String>, group: impl Into<String>) -> Result<Self> {
                let name = name.into();
                let group = group.into();
                if name.is_empty() {
                    return Err(CoreError::InvalidKey(format!(
                        "{} name must not be empty",
                        stringify!($name)
                    )));
                }
                let group = if group.is_empty() {
                    DEFAULT_GROUP.to_string()
                } else {
                    group
                };
                Ok(Self { name, group })
            }

            /// Key in the default group.
            pub fn named(name: impl Into<String>) -> Result<Self> {
                Self::new(name, DEFAULT_GROUP)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.group, self.name)
            }
        }
    };
}

store_key!(
    /// Identifies a job within a scheduler: `(name, group)`.
    JobKey
);
store_key!(
    /// Identifies a trigger within a scheduler: `(name, group)`.
    TriggerKey
);

/// Job or trigger payload. Persisted as a JSON document in a binary column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobDataMap(pub BTreeMap<String, serde_json::Value>);

impl JobDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Empty input decodes to an empty map so NULL columns read back cleanly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A stored job definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub key: JobKey,
    pub description: Option<String>,
    /// Name the scheduler uses to look up the job implementation.
    pub job_type: String,
    /// Kept in the store even when no trigger references it.
    pub durable: bool,
    /// At most one execution of this job may run at a time.
    pub nonconcurrent: bool,
    /// Data map is written back after each execution.
    pub update_data: bool,
    /// Re-executed when the owning instance crashed mid-run.
    pub requests_recovery: bool,
    pub job_data: JobDataMap,
}

impl JobDetail {
    pub fn new(key: JobKey, job_type: impl Into<String>) -> Self {
        Self {
            key,
            description: None,
            job_type: job_type.into(),
            durable: false,
            nonconcurrent: false,
            update_data: false,
            requests_recovery: false,
            job_data: JobDataMap::default(),
        }
    }
}

/// Persisted lifecycle state of a trigger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    Waiting,
    Acquired,
    Executing,
    Complete,
    Paused,
    Blocked,
    PausedBlocked,
    Error,
    Deleted,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerState::Waiting => "waiting",
            TriggerState::Acquired => "acquired",
            TriggerState::Executing => "executing",
            TriggerState::Complete => "complete",
            TriggerState::Paused => "paused",
            TriggerState::Blocked => "blocked",
            TriggerState::PausedBlocked => "paused_blocked",
            TriggerState::Error => "error",
            TriggerState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerState {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(TriggerState::Waiting),
            "acquired" => Ok(TriggerState::Acquired),
            "executing" => Ok(TriggerState::Executing),
            "complete" => Ok(TriggerState::Complete),
            "paused" => Ok(TriggerState::Paused),
            "blocked" => Ok(TriggerState::Blocked),
            "paused_blocked" => Ok(TriggerState::PausedBlocked),
            "error" => Ok(TriggerState::Error),
            "deleted" => Ok(TriggerState::Deleted),
            other => Err(CoreError::UnknownTriggerState(other.to_string())),
        }
    }
}

/// A stored trigger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub description: Option<String>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub prev_fire_time: Option<DateTime<Utc>>,
    pub priority: i32,
    pub state: TriggerState,
    /// Free-form schedule kind label (e.g. "simple", "cron").
    pub trigger_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub calendar_name: Option<String>,
    /// [`MISFIRE_IGNORE`] disables misfire detection for this trigger.
    pub misfire_instruction: i32,
    pub job_data: JobDataMap,
}

impl Trigger {
    pub const DEFAULT_PRIORITY: i32 = 5;

    /// `start_time` is truncated to store precision.
    pub fn new(key: TriggerKey, job_key: JobKey, start_time: DateTime<Utc>) -> Self {
        let start_time = truncate_to_millis(start_time);
        Self {
            key,
            job_key,
            description: None,
            next_fire_time: Some(start_time),
            prev_fire_time: None,
            priority: Self::DEFAULT_PRIORITY,
            state: TriggerState::Waiting,
            trigger_type: "simple".to_string(),
            start_time,
            end_time: None,
            calendar_name: None,
            misfire_instruction: 0,
            job_data: JobDataMap::default(),
        }
    }
}

/// A named calendar. The body is serialised by the scheduler and opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub name: String,
    pub data: Vec<u8>,
}

/// Bookkeeping row written when a trigger fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredTrigger {
    pub entry_id: String,
    pub trigger_key: TriggerKey,
    /// `None` while the trigger is only acquired and no job is bound yet.
    pub job_key: Option<JobKey>,
    pub fired_time: DateTime<Utc>,
    pub scheduled_time: DateTime<Utc>,
    pub priority: i32,
    pub state: TriggerState,
    pub nonconcurrent: bool,
    pub requests_recovery: bool,
}

impl FiredTrigger {
    /// An acquired trigger with no job bound yet, fired now.
    pub fn acquired(
        entry_id: impl Into<String>,
        trigger_key: TriggerKey,
        scheduled_time: DateTime<Utc>,
        priority: i32,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            trigger_key,
            job_key: None,
            fired_time: store_now(),
            scheduled_time: truncate_to_millis(scheduled_time),
            priority,
            state: TriggerState::Acquired,
            nonconcurrent: false,
            requests_recovery: false,
        }
    }
}

/// A fired-trigger row as read back, including the instance that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredTriggerRecord {
    pub instance_id: String,
    pub fired: FiredTrigger,
}

/// Generate a fired-trigger entry id unique across instances.
pub fn new_entry_id(instance_id: &str) -> String {
    format!("{}-{}", instance_id, Uuid::now_v7().simple())
}

/// Check-in row for one scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStateRecord {
    pub instance_id: String,
    pub last_checkin_time: DateTime<Utc>,
    pub checkin_interval_ms: i64,
}

/// Selects job or trigger groups by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum GroupMatcher {
    Equals(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Anything,
}

impl GroupMatcher {
    pub fn equals(group: impl Into<String>) -> Self {
        GroupMatcher::Equals(group.into())
    }

    /// SQL `LIKE` pattern for the non-exact variants, `None` for `Equals`.
    /// Group text is matched literally, escaped with [`LIKE_ESCAPE`].
    pub fn like_pattern(&self) -> Option<String> {
        match self {
            GroupMatcher::Equals(_) => None,
            GroupMatcher::StartsWith(v) => Some(format!("{}%", escape_like(v))),
            GroupMatcher::EndsWith(v) => Some(format!("%{}", escape_like(v))),
            GroupMatcher::Contains(v) => Some(format!("%{}%", escape_like(v))),
            GroupMatcher::Anything => Some("%".to_string()),
        }
    }
}

/// Escape character declared by every `LIKE .. ESCAPE` statement.
pub const LIKE_ESCAPE: char = '!';

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_falls_back_to_default() {
        let key = JobKey::new("nightly", "").unwrap();
        assert_eq!(key.group, DEFAULT_GROUP);
        assert_eq!(key.to_string(), "DEFAULT.nightly");
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = TriggerKey::new("", "reports").unwrap_err();
        assert_eq!(err.code(), "INVALID_KEY");
    }

    #[test]
    fn trigger_state_text_round_trip() {
        for state in [
            TriggerState::Waiting,
            TriggerState::Acquired,
            TriggerState::Executing,
            TriggerState::Complete,
            TriggerState::Paused,
            TriggerState::Blocked,
            TriggerState::PausedBlocked,
            TriggerState::Error,
            TriggerState::Deleted,
        ] {
            assert_eq!(state.as_str().parse::<TriggerState>().unwrap(), state);
        }
        assert!("WAITING".parse::<TriggerState>().is_err());
    }

    #[test]
    fn job_data_survives_bytes() {
        let mut data = JobDataMap::new();
        data.insert("retries", 3);
        data.insert("target", "reports@example.com");
        let bytes = data.to_bytes().unwrap();
        assert_eq!(JobDataMap::from_bytes(&bytes).unwrap(), data);
        assert!(JobDataMap::from_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn matcher_patterns() {
        assert_eq!(GroupMatcher::equals("a").like_pattern(), None);
        assert_eq!(
            GroupMatcher::StartsWith("rep".into()).like_pattern().as_deref(),
            Some("rep%")
        );
        assert_eq!(
            GroupMatcher::EndsWith("ly".into()).like_pattern().as_deref(),
            Some("%ly")
        );
        assert_eq!(
            GroupMatcher::Contains("ight".into()).like_pattern().as_deref(),
            Some("%ight%")
        );
        assert_eq!(GroupMatcher::Anything.like_pattern().as_deref(), Some("%"));
    }

    #[test]
    fn matcher_text_is_escaped_literally() {
        assert_eq!(
            GroupMatcher::StartsWith("team_".into()).like_pattern().as_deref(),
            Some("team!_%")
        );
        assert_eq!(
            GroupMatcher::Contains("50%!".into()).like_pattern().as_deref(),
            Some("%50!%!!%")
        );
    }

    #[test]
    fn constructors_truncate_to_store_precision() {
        let precise = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let millis = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(truncate_to_millis(precise), millis);

        let key = TriggerKey::named("t").unwrap();
        let trigger = Trigger::new(key.clone(), JobKey::named("j").unwrap(), precise);
        assert_eq!(trigger.start_time, millis);
        assert_eq!(trigger.next_fire_time, Some(millis));

        let fired = FiredTrigger::acquired("e1", key, precise, 5);
        assert_eq!(fired.scheduled_time, millis);
        assert_eq!(fired.fired_time.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(store_now().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn entry_ids_are_namespaced_by_instance() {
        let a = new_entry_id("node-a");
        let b = new_entry_id("node-a");
        assert!(a.starts_with("node-a-"));
        assert_ne!(a, b);
    }
}
