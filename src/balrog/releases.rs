// src/balrog/releases.rs

//! Release selection: filtering, ordering and picking the update pair.
//!
//! Everything here is pure so the selection rules can be tested without a
//! running service.

use serde::Deserialize;

use crate::errors::{FunsizeError, Result};
use crate::types::UpdateFrom;

/// Suffix of floating release aliases (not dated snapshots).
pub const LATEST_SUFFIX: &str = "-latest";

/// A named snapshot tracked by the update-metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub name: String,
}

impl Release {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Complete update artifact of one release for one platform/locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub complete_update_url: String,
}

/// Options for a release listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseQuery {
    pub limit: usize,
    pub include_latest: bool,
    /// `true` sorts newest first.
    pub reverse: bool,
}

impl Default for ReleaseQuery {
    fn default() -> Self {
        Self {
            limit: 2,
            include_latest: false,
            reverse: true,
        }
    }
}

/// Name prefix used to list a product's releases on a branch.
pub fn name_prefix(product: &str, branch: &str) -> String {
    format!("{product}-{branch}")
}

/// Filter `-latest` aliases (unless asked for), sort by name, then truncate.
///
/// Ordering is plain lexicographic on the release name; names embed a build
/// id so this approximates chronological order.
pub fn select_releases(mut releases: Vec<Release>, query: &ReleaseQuery) -> Vec<Release> {
    if !query.include_latest {
        releases.retain(|r| !r.name.ends_with(LATEST_SUFFIX));
    }
    releases.sort_by(|a, b| a.name.cmp(&b.name));
    if query.reverse {
        releases.reverse();
    }
    releases.truncate(query.limit);
    releases
}

/// The two releases bounding a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePair {
    pub from: Release,
    pub to: Release,
}

/// Pick the update pair from a newest-first release list.
///
/// `to` is always the head. `from` is the tail (`UpdateFrom::Oldest`) or
/// the second entry (`UpdateFrom::Previous`).
pub fn pick_pair(newest_first: &[Release], from: UpdateFrom) -> Result<ReleasePair> {
    if newest_first.len() < 2 {
        return Err(FunsizeError::LookupFailure(format!(
            "need at least 2 releases to build a partial, found {}",
            newest_first.len()
        )));
    }

    let to = newest_first[0].clone();
    let from = match from {
        UpdateFrom::Oldest => newest_first[newest_first.len() - 1].clone(),
        UpdateFrom::Previous => newest_first[1].clone(),
    };

    Ok(ReleasePair { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(releases: &[Release]) -> Vec<&str> {
        releases.iter().map(|r| r.name.as_str()).collect()
    }

    fn releases(list: &[&str]) -> Vec<Release> {
        list.iter().map(|n| Release::new(*n)).collect()
    }

    #[test]
    fn latest_alias_is_excluded_before_limiting() {
        let fetched = releases(&[
            "Firefox-mozilla-central-nightly-20240101",
            "Firefox-mozilla-central-latest",
            "Firefox-mozilla-central-nightly-20231231",
        ]);
        let picked = select_releases(fetched, &ReleaseQuery::default());
        assert_eq!(
            names(&picked),
            vec![
                "Firefox-mozilla-central-nightly-20240101",
                "Firefox-mozilla-central-nightly-20231231"
            ]
        );
    }

    #[test]
    fn latest_alias_kept_on_request() {
        let fetched = releases(&[
            "Firefox-mozilla-central-latest",
            "Firefox-mozilla-central-nightly-2",
        ]);
        let query = ReleaseQuery {
            include_latest: true,
            ..ReleaseQuery::default()
        };
        assert_eq!(select_releases(fetched, &query).len(), 2);
    }

    #[test]
    fn reverse_sorts_newest_first_and_limits() {
        let picked = select_releases(releases(&["A", "C", "B"]), &ReleaseQuery::default());
        assert_eq!(names(&picked), vec!["C", "B"]);
    }

    #[test]
    fn forward_sorts_oldest_first() {
        let query = ReleaseQuery {
            reverse: false,
            limit: 3,
            ..ReleaseQuery::default()
        };
        let picked = select_releases(releases(&["B", "C", "A"]), &query);
        assert_eq!(names(&picked), vec!["A", "B", "C"]);
    }

    #[test]
    fn limit_larger_than_list_keeps_everything() {
        let query = ReleaseQuery {
            limit: 10,
            ..ReleaseQuery::default()
        };
        assert_eq!(select_releases(releases(&["A"]), &query).len(), 1);
    }

    #[test]
    fn pair_from_oldest_uses_tail() {
        let list = releases(&["C", "B", "A"]);
        let pair = pick_pair(&list, UpdateFrom::Oldest).unwrap();
        assert_eq!(pair.to.name, "C");
        assert_eq!(pair.from.name, "A");
    }

    #[test]
    fn pair_from_previous_uses_second_newest() {
        let list = releases(&["C", "B", "A"]);
        let pair = pick_pair(&list, UpdateFrom::Previous).unwrap();
        assert_eq!(pair.to.name, "C");
        assert_eq!(pair.from.name, "B");
    }

    #[test]
    fn single_release_cannot_form_a_pair() {
        let err = pick_pair(&releases(&["C"]), UpdateFrom::Oldest).unwrap_err();
        assert!(matches!(err, FunsizeError::LookupFailure(_)));
    }
}
