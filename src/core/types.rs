/*!
 * Strategy Kinds
 * The three axes a trial is parameterised over
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a kind name cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {axis} '{value}' (expected one of: {expected})")]
pub struct ParseKindError {
    pub axis: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Normalize `OBJECT_LOCK`, `object-lock` and `ObjectLock` style input
fn normalize(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// How worker capacity is provisioned for a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModelKind {
    /// Fixed number of long-lived OS threads sharing one queue
    BoundedPool,
    /// One lightweight task per submission, no shared capacity limit
    PerTaskUnbounded,
}

impl ExecutionModelKind {
    pub const ALL: [Self; 2] = [Self::BoundedPool, Self::PerTaskUnbounded];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BoundedPool => "bounded_pool",
            Self::PerTaskUnbounded => "per_task_unbounded",
        }
    }
}

impl fmt::Display for ExecutionModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionModelKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "boundedpool" | "bounded" | "platform" => Ok(Self::BoundedPool),
            "pertaskunbounded" | "pertask" | "virtual" => Ok(Self::PerTaskUnbounded),
            _ => Err(ParseKindError {
                axis: "execution model",
                value: s.to_string(),
                expected: "bounded_pool, per_task_unbounded",
            }),
        }
    }
}

/// Mutual-exclusion discipline applied around the critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategyKind {
    /// Implicit, non-reentrant monitor shared by the trial
    ExclusiveMonitor,
    /// Explicit reentrant mutex shared by the trial
    ReentrantMutex,
    /// Baseline without synchronization
    NoLock,
}

impl LockStrategyKind {
    pub const ALL: [Self; 3] = [Self::ExclusiveMonitor, Self::ReentrantMutex, Self::NoLock];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExclusiveMonitor => "exclusive_monitor",
            Self::ReentrantMutex => "reentrant_mutex",
            Self::NoLock => "no_lock",
        }
    }

    /// Whether the strategy serializes the critical section
    pub const fn is_exclusive(&self) -> bool {
        !matches!(self, Self::NoLock)
    }
}

impl fmt::Display for LockStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockStrategyKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "exclusivemonitor" | "monitor" | "objectlock" => Ok(Self::ExclusiveMonitor),
            "reentrantmutex" | "reentrantlock" | "reentrant" => Ok(Self::ReentrantMutex),
            "nolock" | "none" => Ok(Self::NoLock),
            _ => Err(ParseKindError {
                axis: "lock strategy",
                value: s.to_string(),
                expected: "exclusive_monitor, reentrant_mutex, no_lock",
            }),
        }
    }
}

/// Stall injected inside the critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    None,
    /// Sleep for a sub-millisecond quantum, yielding the OS thread
    SleepBrief,
    /// Park for a sub-millisecond quantum
    ParkBrief,
}

impl BackoffKind {
    pub const ALL: [Self; 3] = [Self::None, Self::SleepBrief, Self::ParkBrief];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SleepBrief => "sleep_brief",
            Self::ParkBrief => "park_brief",
        }
    }
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "none" => Ok(Self::None),
            "sleepbrief" | "sleep" => Ok(Self::SleepBrief),
            "parkbrief" | "park" => Ok(Self::ParkBrief),
            _ => Err(ParseKindError {
                axis: "backoff",
                value: s.to_string(),
                expected: "none, sleep_brief, park_brief",
            }),
        }
    }
}
