// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Emitted measurement packet.

use crate::units::UnitSystem;
use std::collections::BTreeMap;

/// One timestamped, unit-tagged record of converted field values.
///
/// Fields are keyed by the configured output field name. A `BTreeMap`
/// keeps iteration order deterministic for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Epoch seconds at which the packet was assembled.
    pub timestamp: u64,
    /// Unit system shared by every field in this packet.
    pub units: UnitSystem,
    /// Converted readings, one per topic updated since the last poll.
    pub fields: BTreeMap<String, f64>,
}
