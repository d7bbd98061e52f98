//! Location fixes and the best-fix heuristic
//!
//! A fix is one measurement reported by a provider. Sessions keep the most
//! trustworthy fix seen so far, judged by recency first and accuracy second,
//! with a same-provider tie-break for fixes that are newer but slightly worse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::state::SessionConfig;

/// A fix more than two minutes newer always wins; more than two minutes older always loses
pub const SIGNIFICANT_DURATION_MS: i64 = 2 * 60 * 1000;

/// Accuracy loss tolerated for a newer fix from the same provider
pub const SIGNIFICANT_ACCURACY_DELTA: f64 = 200.0;

/// A single location measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of uncertainty, smaller is better
    pub accuracy: f64,
    /// Wall-clock time of the measurement in milliseconds since the epoch
    #[serde(alias = "time")]
    pub timestamp: i64,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Location providers a session listens to, in the order they are consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Passive,
    Network,
    Gps,
}

impl Provider {
    /// Candidate providers, passive first so a cached fix is considered before a fresh one
    pub const CANDIDATES: [Provider; 3] = [Provider::Passive, Provider::Network, Provider::Gps];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Passive => "passive",
            Provider::Network => "network",
            Provider::Gps => "gps",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passive" => Ok(Provider::Passive),
            "network" => Ok(Provider::Network),
            "gps" => Ok(Provider::Gps),
            other => Err(format!("Unknown location provider: {}", other)),
        }
    }
}

/// Decide whether `candidate` should replace `current` as the best fix
///
/// Rules, first decisive one wins:
/// - anything beats no fix
/// - significantly newer wins, significantly older loses
/// - more accurate wins
/// - newer and not less accurate wins
/// - newer, not significantly less accurate, same provider wins
pub fn is_better(candidate: &Fix, current: Option<&Fix>) -> bool {
    let current = match current {
        Some(current) => current,
        None => return true,
    };

    let time_delta = candidate.timestamp - current.timestamp;
    if time_delta > SIGNIFICANT_DURATION_MS {
        return true;
    }
    if time_delta < -SIGNIFICANT_DURATION_MS {
        return false;
    }
    let is_newer = time_delta > 0;

    let accuracy_delta = candidate.accuracy - current.accuracy;
    let is_more_accurate = accuracy_delta < 0.0;
    let is_less_accurate = accuracy_delta > 0.0;
    let is_significantly_less_accurate = accuracy_delta > SIGNIFICANT_ACCURACY_DELTA;

    if is_more_accurate {
        true
    } else if is_newer && !is_less_accurate {
        true
    } else {
        is_newer
            && !is_significantly_less_accurate
            && same_provider(candidate.provider.as_deref(), current.provider.as_deref())
    }
}

/// Null-safe provider equality; two missing providers are equal
fn same_provider(a: Option<&str>, b: Option<&str>) -> bool {
    a == b
}

/// A fix qualifies when it is accurate enough and no older than the configured max age
pub fn satisfies_filter(fix: &Fix, config: &SessionConfig, now: i64) -> bool {
    let max_age = i64::try_from(config.max_age_ms).unwrap_or(i64::MAX);
    let oldest_accepted = now.saturating_sub(max_age);
    fix.accuracy < config.accuracy_threshold && fix.timestamp >= oldest_accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(accuracy: f64, timestamp: i64, provider: Option<&str>) -> Fix {
        Fix {
            latitude: 48.8566,
            longitude: 2.3522,
            accuracy,
            timestamp,
            provider: provider.map(str::to_string),
        }
    }

    #[test]
    fn test_anything_beats_no_fix() {
        assert!(is_better(&fix(5000.0, 0, None), None));
    }

    #[test]
    fn test_significantly_newer_wins_regardless_of_accuracy() {
        let current = fix(5.0, 1_000_000, Some("gps"));
        let candidate = fix(900.0, 1_000_000 + SIGNIFICANT_DURATION_MS + 1, Some("network"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_significantly_older_loses_regardless_of_accuracy() {
        let current = fix(900.0, 1_000_000, Some("network"));
        let candidate = fix(1.0, 1_000_000 - SIGNIFICANT_DURATION_MS - 1, Some("gps"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_fix_is_not_better_than_itself() {
        let a = fix(20.0, 1_000_000, Some("gps"));
        assert!(!is_better(&a, Some(&a)));

        let anonymous = fix(20.0, 1_000_000, None);
        assert!(!is_better(&anonymous, Some(&anonymous)));
    }

    #[test]
    fn test_more_accurate_wins_even_if_slightly_older() {
        let current = fix(50.0, 1_000_000, Some("network"));
        let candidate = fix(10.0, 1_000_000 - 30_000, Some("gps"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_newer_and_equally_accurate_wins() {
        let current = fix(30.0, 1_000_000, Some("network"));
        let candidate = fix(30.0, 1_000_500, Some("gps"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_newer_less_accurate_needs_same_provider() {
        let current = fix(30.0, 1_000_000, Some("network"));
        let same = fix(130.0, 1_000_500, Some("network"));
        let other = fix(130.0, 1_000_500, Some("gps"));
        assert!(is_better(&same, Some(&current)));
        assert!(!is_better(&other, Some(&current)));
    }

    #[test]
    fn test_newer_significantly_less_accurate_loses_even_from_same_provider() {
        let current = fix(30.0, 1_000_000, Some("gps"));
        let candidate = fix(30.0 + SIGNIFICANT_ACCURACY_DELTA + 1.0, 1_000_500, Some("gps"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_missing_providers_count_as_same() {
        let current = fix(30.0, 1_000_000, None);
        let candidate = fix(80.0, 1_000_500, None);
        assert!(is_better(&candidate, Some(&current)));
        assert!(!is_better(&fix(80.0, 1_000_500, Some("gps")), Some(&current)));
    }

    #[test]
    fn test_older_less_accurate_loses() {
        let current = fix(30.0, 1_000_000, Some("gps"));
        let candidate = fix(40.0, 999_000, Some("gps"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_satisfies_filter_requires_accuracy_and_freshness() {
        let config = SessionConfig {
            accuracy_threshold: 50.0,
            max_age_ms: 120_000,
            ..SessionConfig::default()
        };
        let now = 10_000_000;

        assert!(satisfies_filter(&fix(30.0, now, None), &config, now));
        assert!(satisfies_filter(&fix(30.0, now - 120_000, None), &config, now));
        assert!(!satisfies_filter(&fix(30.0, now - 120_001, None), &config, now));
        assert!(!satisfies_filter(&fix(50.0, now, None), &config, now));
        assert!(!satisfies_filter(&fix(80.0, now, None), &config, now));
    }

    #[test]
    fn test_huge_max_age_accepts_any_age() {
        let now = 10_000_000;
        for max_age_ms in [u64::MAX, 1 << 63] {
            let config = SessionConfig {
                accuracy_threshold: 50.0,
                max_age_ms,
                ..SessionConfig::default()
            };
            assert!(satisfies_filter(&fix(10.0, now, None), &config, now));
            assert!(satisfies_filter(&fix(10.0, 0, None), &config, now));
        }
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("gps".parse::<Provider>(), Ok(Provider::Gps));
        assert_eq!("passive".parse::<Provider>(), Ok(Provider::Passive));
        assert!("fused".parse::<Provider>().is_err());
        assert_eq!(Provider::Network.to_string(), "network");
    }

    #[test]
    fn test_fix_accepts_time_alias() {
        let parsed: Fix = serde_json::from_str(
            r#"{"latitude":1.5,"longitude":2.5,"accuracy":12.0,"time":42,"provider":"gps"}"#,
        )
        .unwrap();
        assert_eq!(parsed.timestamp, 42);
        assert_eq!(parsed.provider.as_deref(), Some("gps"));

        let anonymous: Fix =
            serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5,"accuracy":12.0,"timestamp":7}"#)
                .unwrap();
        assert_eq!(anonymous.provider, None);
    }
}
