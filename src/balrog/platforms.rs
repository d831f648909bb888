// src/balrog/platforms.rs

//! Build platform → update platform translation.
//!
//! Build properties name platforms the way the build system does
//! (`linux64`, `win32`, ...). The update-metadata service keys builds by
//! update platform (`Linux_x86_64-gcc3`, ...). The first entry of each list
//! is the canonical one used for lookups.

use std::collections::BTreeMap;

use crate::errors::{FunsizeError, Result};

const BUILTIN: &[(&str, &[&str])] = &[
    ("linux", &["Linux_x86-gcc3"]),
    ("linux64", &["Linux_x86_64-gcc3"]),
    (
        "macosx64",
        &[
            "Darwin_x86_64-gcc3-u-i386-x86_64",
            "Darwin_x86-gcc3-u-i386-x86_64",
            "Darwin_x86-gcc3",
            "Darwin_x86_64-gcc3",
        ],
    ),
    ("win32", &["WINNT_x86-msvc", "WINNT_x86-msvc-x86", "WINNT_x86-msvc-x64"]),
    ("win64", &["WINNT_x86_64-msvc", "WINNT_x86_64-msvc-x64"]),
];

/// Read-only translation table, built once at start-up.
#[derive(Debug, Clone)]
pub struct PlatformMap {
    table: BTreeMap<String, Vec<String>>,
}

impl Default for PlatformMap {
    fn default() -> Self {
        let table = BUILTIN
            .iter()
            .map(|(platform, update)| {
                (
                    platform.to_string(),
                    update.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self { table }
    }
}

impl PlatformMap {
    /// Built-in table with entries replaced (or added) by `overrides`.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut map = Self::default();
        for (platform, update) in overrides.iter() {
            map.table.insert(platform.clone(), update.clone());
        }
        map
    }

    /// Canonical update platform for a build platform.
    pub fn update_platform(&self, platform: &str) -> Result<&str> {
        self.table
            .get(platform)
            .and_then(|update| update.first())
            .map(String::as_str)
            .ok_or_else(|| {
                FunsizeError::LookupFailure(format!("unknown build platform '{platform}'"))
            })
    }
}
