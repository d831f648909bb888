// src/event/properties.rs

//! Typed view over a build's property pairs.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::errors::{FunsizeError, Result};

/// Locale assumed when a build does not report one.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Build properties this service cares about.
///
/// Produced by a single conversion step from the event's property pairs;
/// when a key appears more than once, the last occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyBag {
    pub locale: String,
    pub platform: Option<String>,
    pub branch: Option<String>,
    /// `appName`, e.g. `Firefox` or `Thunderbird`.
    pub product: Option<String>,
    /// Present for l10n repack builds that report per-locale results.
    pub l10n: Option<L10nRepack>,
}

/// Per-locale results of an l10n repack build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L10nRepack {
    pub platform: String,
    pub branch: String,
    pub product: String,
    pub locales: Vec<(String, bool)>,
}

/// One partial update to generate: which product/branch/platform/locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialTarget {
    pub product: String,
    pub branch: String,
    pub platform: String,
    pub locale: String,
}

impl From<&[(String, Value)]> for PropertyBag {
    fn from(pairs: &[(String, Value)]) -> Self {
        let map: HashMap<&str, &Value> = pairs.iter().map(|(k, v)| (k.as_str(), v)).collect();

        let text = |key: &str| map.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let l10n = map
            .get("locales")
            .and_then(|locales| parse_l10n(locales, map.get("funsize_info").copied()));

        PropertyBag {
            locale: text("locale").unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            platform: text("platform"),
            branch: text("branch"),
            product: text("appName"),
            l10n,
        }
    }
}

impl PropertyBag {
    /// The partial updates this build asks for.
    ///
    /// A plain build yields one target for its own locale. An l10n repack
    /// yields one target per locale that repacked successfully; failed
    /// locales are logged and skipped.
    pub fn targets(&self) -> Result<Vec<PartialTarget>> {
        if let Some(ref repack) = self.l10n {
            let mut targets = Vec::new();
            for (locale, succeeded) in repack.locales.iter() {
                if !*succeeded {
                    warn!(locale = %locale, "ignoring locale with failed repack");
                    continue;
                }
                targets.push(PartialTarget {
                    product: repack.product.clone(),
                    branch: repack.branch.clone(),
                    platform: repack.platform.clone(),
                    locale: locale.clone(),
                });
            }
            return Ok(targets);
        }

        let require = |field: &Option<String>, name: &str| {
            field.clone().ok_or_else(|| {
                FunsizeError::MalformedEvent(format!("build property '{name}' is missing"))
            })
        };

        Ok(vec![PartialTarget {
            product: require(&self.product, "appName")?,
            branch: require(&self.branch, "branch")?,
            platform: require(&self.platform, "platform")?,
            locale: self.locale.clone(),
        }])
    }
}

/// `funsize_info` may arrive as an object or as a JSON-encoded string.
fn parse_l10n(locales: &Value, info: Option<&Value>) -> Option<L10nRepack> {
    let info = match info? {
        Value::String(s) => serde_json::from_str::<Value>(s).ok()?,
        other => other.clone(),
    };
    let field = |key: &str| info.get(key).and_then(|v| v.as_str()).map(str::to_string);

    let locales = locales
        .as_array()?
        .iter()
        .filter_map(|entry| {
            let pair = entry.as_array()?;
            let locale = pair.first()?.as_str()?;
            let result = pair.get(1)?.as_str()?;
            Some((locale.to_string(), result.eq_ignore_ascii_case("success")))
        })
        .collect();

    Some(L10nRepack {
        platform: field("platform")?,
        branch: field("branch")?,
        product: field("appName")?,
        locales,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, Value)]) -> Vec<(String, Value)> {
        items.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn locale_defaults_to_en_us() {
        let props = pairs(&[("platform", json!("linux64"))]);
        let bag = PropertyBag::from(props.as_slice());
        assert_eq!(bag.locale, "en-US");
        assert_eq!(bag.platform.as_deref(), Some("linux64"));
        assert!(bag.branch.is_none());
    }

    #[test]
    fn last_duplicate_key_wins() {
        let props = pairs(&[
            ("branch", json!("mozilla-central")),
            ("branch", json!("mozilla-aurora")),
        ]);
        let bag = PropertyBag::from(props.as_slice());
        assert_eq!(bag.branch.as_deref(), Some("mozilla-aurora"));
    }

    #[test]
    fn plain_build_yields_single_target() {
        let props = pairs(&[
            ("appName", json!("Firefox")),
            ("branch", json!("mozilla-central")),
            ("platform", json!("win32")),
            ("locale", json!("de")),
        ]);
        let targets = PropertyBag::from(props.as_slice()).targets().unwrap();
        assert_eq!(
            targets,
            vec![PartialTarget {
                product: "Firefox".into(),
                branch: "mozilla-central".into(),
                platform: "win32".into(),
                locale: "de".into(),
            }]
        );
    }

    #[test]
    fn missing_platform_is_malformed() {
        let props = pairs(&[("appName", json!("Firefox")), ("branch", json!("mozilla-central"))]);
        let err = PropertyBag::from(props.as_slice()).targets().unwrap_err();
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn l10n_repack_targets_successful_locales_only() {
        let props = pairs(&[
            ("locales", json!([["de", "success"], ["fr", "failed"], ["ja", "Success"]])),
            (
                "funsize_info",
                json!(r#"{"platform": "linux", "branch": "mozilla-aurora", "appName": "Firefox"}"#),
            ),
        ]);
        let targets = PropertyBag::from(props.as_slice()).targets().unwrap();
        let locales: Vec<_> = targets.iter().map(|t| t.locale.as_str()).collect();
        assert_eq!(locales, vec!["de", "ja"]);
        assert!(targets.iter().all(|t| t.branch == "mozilla-aurora" && t.platform == "linux"));
    }
}
