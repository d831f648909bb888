// src/event/classifier.rs

//! Decide which build-finished events deserve a partial update.
//!
//! Builder names are matched against a fixed grammar:
//! `{branch} × {Windows, Linux, OS X nightly, l10n nightly}`. The patterns
//! are compiled once into a [`RegexSet`]; any single match accepts.

use regex::RegexSet;

use crate::errors::{FunsizeError, Result};
use crate::event::BuildEvent;

/// Platforms that have nightly (and l10n nightly) builders.
pub const NIGHTLY_PLATFORMS: &[&str] = &["linux", "linux64", "win32", "win64", "macosx64"];

/// Number of l10n repack chunks a platform is split into.
const L10N_CHUNKS: usize = 10;

const BUILDER_TEMPLATES: &[&str] = &[
    r"WINNT \d+\.\d+ (x86-64 )?{branch} nightly",
    r"Linux (x86-64 )?{branch} nightly",
    r"OS X \d+\.\d+ {branch} nightly",
    r"(Firefox|Thunderbird) {branch} (linux|linux64|win32|win64|mac|macosx64) l10n nightly(-\d+)?",
];

/// Precompiled builder-name classifier.
#[derive(Debug, Clone)]
pub struct BuildClassifier {
    branches: Vec<String>,
    patterns: RegexSet,
}

impl BuildClassifier {
    /// Compile the builder patterns for the given branches.
    pub fn new(branches: &[String]) -> Result<Self> {
        let patterns: Vec<String> = branches
            .iter()
            .flat_map(|branch| {
                let escaped = regex::escape(branch);
                BUILDER_TEMPLATES
                    .iter()
                    .map(move |tpl| tpl.replace("{branch}", &escaped))
            })
            .collect();

        let patterns = RegexSet::new(&patterns).map_err(|e| {
            FunsizeError::ConfigError(format!("invalid builder pattern: {e}"))
        })?;

        Ok(Self {
            branches: branches.to_vec(),
            patterns,
        })
    }

    /// Successful builds from a known nightly builder.
    pub fn is_interesting(&self, event: &BuildEvent) -> bool {
        event.result_code == 0 && self.is_interesting_builder(&event.builder_name)
    }

    /// Whether `builder_name` belongs to the nightly grammar.
    ///
    /// Case-sensitive, unanchored: `"TB WINNT 5.2 comm-aurora nightly"`
    /// matches through its `WINNT ...` suffix.
    pub fn is_interesting_builder(&self, builder_name: &str) -> bool {
        self.patterns.is_match(builder_name)
    }

    /// Topic bindings the transport should subscribe with.
    pub fn routing_key_bindings(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for branch in self.branches.iter() {
            for platform in NIGHTLY_PLATFORMS {
                keys.push(format!("build.{branch}-{platform}-nightly.*.finished"));
                for chunk in 1..=L10N_CHUNKS {
                    keys.push(format!(
                        "build.{branch}-{platform}-l10n-nightly-{chunk}.*.finished"
                    ));
                }
            }
        }
        keys
    }
}
