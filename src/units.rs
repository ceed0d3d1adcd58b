// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unit systems recognized by the downstream acquisition loop.

use std::fmt;

/// Unit system tag carried by every emitted packet.
///
/// Groups semantically-compatible measurement fields: all fields in one
/// packet share a unit system. The numeric codes match the constants the
/// downstream weather-station loop uses to interpret packet fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSystem {
    /// US customary units (code 0x01).
    US,
    /// Metric units (code 0x10).
    Metric,
    /// Metric with weather-specific overrides, e.g. mm/h rain rate (code 0x11).
    MetricWx,
}

/// Fixed emission order for packet grouping.
pub const UNIT_ORDER: [UnitSystem; 3] = [UnitSystem::US, UnitSystem::Metric, UnitSystem::MetricWx];

impl UnitSystem {
    /// Parse the configuration spelling. Case-sensitive: `US`, `METRIC`
    /// or `METRICWX`. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "US" => Some(UnitSystem::US),
            "METRIC" => Some(UnitSystem::Metric),
            "METRICWX" => Some(UnitSystem::MetricWx),
            _ => None,
        }
    }

    /// Numeric code used by the downstream acquisition loop.
    pub fn code(&self) -> u8 {
        match self {
            UnitSystem::US => 0x01,
            UnitSystem::Metric => 0x10,
            UnitSystem::MetricWx => 0x11,
        }
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        UnitSystem::US
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitSystem::US => "US",
            UnitSystem::Metric => "METRIC",
            UnitSystem::MetricWx => "METRICWX",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_spellings() {
        assert_eq!(UnitSystem::parse("US"), Some(UnitSystem::US));
        assert_eq!(UnitSystem::parse("METRIC"), Some(UnitSystem::Metric));
        assert_eq!(UnitSystem::parse("METRICWX"), Some(UnitSystem::MetricWx));
    }

    #[test]
    fn test_parse_rejects_unknown_and_lowercase() {
        assert_eq!(UnitSystem::parse("metric"), None);
        assert_eq!(UnitSystem::parse("IMPERIAL"), None);
        assert_eq!(UnitSystem::parse(""), None);
    }

    #[test]
    fn test_codes_match_downstream_constants() {
        assert_eq!(UnitSystem::US.code(), 0x01);
        assert_eq!(UnitSystem::Metric.code(), 0x10);
        assert_eq!(UnitSystem::MetricWx.code(), 0x11);
    }

    #[test]
    fn test_default_is_us() {
        assert_eq!(UnitSystem::default(), UnitSystem::US);
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for unit in UNIT_ORDER {
            assert_eq!(UnitSystem::parse(&unit.to_string()), Some(unit));
        }
    }
}
