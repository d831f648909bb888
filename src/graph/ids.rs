// src/graph/ids.rs

//! Identifier and time effects used by the graph builder.
//!
//! The builder is pure apart from "what time is it" and "give me a fresh
//! id"; both are traits so tests can pin them.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use uuid::Uuid;

macro_rules! slug_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

slug_newtype!(
    /// Identifier of a task within the scheduler.
    TaskId
);

slug_newtype!(
    /// Identifier of a submitted task graph.
    GraphId
);

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Source of fresh identifiers. Every call returns an id never seen before.
pub trait IdGenerator: Send + Sync {
    fn task_id(&self) -> TaskId;
    fn graph_id(&self) -> GraphId;
}

/// Random 22-character URL-safe slugs (v4 UUID, base64url, no padding).
///
/// The top bit of the UUID is cleared so a slug never starts with `-`,
/// which keeps ids safe to pass as command-line arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugIdGenerator;

impl SlugIdGenerator {
    fn slug() -> String {
        let mut bytes = *Uuid::new_v4().as_bytes();
        bytes[0] &= 0x7f;
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl IdGenerator for SlugIdGenerator {
    fn task_id(&self) -> TaskId {
        TaskId(Self::slug())
    }

    fn graph_id(&self) -> GraphId {
        GraphId(Self::slug())
    }
}
