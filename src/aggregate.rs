// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouped-by-unit-system packet aggregation.
//!
//! One poll tick scans every topic once, in the fixed unit order
//! US, METRIC, METRICWX, and builds at most one packet per unit system
//! containing the topics updated since the previous tick. Topics with no
//! new data are omitted, never zero-filled.

use crate::packet::Packet;
use crate::topic::TopicState;
use crate::units::UNIT_ORDER;
use std::collections::BTreeMap;

/// Run one poll tick over `topics`, consuming every pending update.
///
/// Each updated topic is read exactly once; its converted reading lands
/// in the packet for its unit system with `timestamp = now`. Parse
/// failures are logged per topic and skip only that topic. Unit groups
/// with no updated topics produce no packet.
pub fn poll_grouped(topics: &[TopicState], now: u64) -> Vec<Packet> {
    let mut packets = Vec::new();

    for unit in UNIT_ORDER {
        let mut fields = BTreeMap::new();
        for topic in topics.iter().filter(|t| t.unit() == unit) {
            match topic.read() {
                Ok(Some(value)) => {
                    fields.insert(topic.field().to_string(), value);
                }
                Ok(None) => {}
                Err(e) => log::warn!("[aggregate] {}", e),
            }
        }
        if !fields.is_empty() {
            packets.push(Packet {
                timestamp: now,
                units: unit,
                fields,
            });
        }
    }

    packets
}
