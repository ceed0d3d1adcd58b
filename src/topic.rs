// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-topic state: cached raw value, update flag, delta state and
//! conversion parameters.
//!
//! `store` runs in the inbound message context and `read` in the polling
//! context; the mutable slot sits behind a per-topic `parking_lot::Mutex`
//! so the pair is synchronized without any cross-topic contention.

use crate::config::{ConfigError, TopicConfig};
use crate::delta;
use crate::units::UnitSystem;
use parking_lot::Mutex;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A stored raw value that could not be parsed as a number.
///
/// Reported as a per-topic warning by the aggregator; never fatal. The
/// offending value is consumed, so the warning fires once per bad store.
#[derive(Debug)]
pub struct ParseError {
    /// Bus address of the topic that received the value.
    pub topic: String,
    /// The raw payload that failed to parse.
    pub raw: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "topic '{}' value '{}' is not numeric", self.topic, self.raw)
    }
}

impl std::error::Error for ParseError {}

/// Fields mutated by `store` and `read`, guarded by the topic lock.
///
/// Invariant: `updated == true` implies `raw_value` is `Some`.
struct Slot {
    raw_value: Option<String>,
    updated: bool,
    last_total: Option<f64>,
    last_update: u64,
}

/// State for one subscribed topic.
///
/// Constructed once at startup from configuration; conversion parameters
/// are immutable afterwards. Lives for the process lifetime.
pub struct TopicState {
    topic: String,
    field: String,
    unit: UnitSystem,
    calc_delta: bool,
    scale: f64,
    offset: f64,
    slot: Mutex<Slot>,
}

impl TopicState {
    /// Build a topic state from its configuration entry.
    ///
    /// Fails if the output field name is empty or the unit spelling is
    /// unknown. A field name containing a space or `/` is legal for the
    /// bus but suspect downstream; it gets a warning, not an error.
    pub fn new(config: &TopicConfig) -> Result<Self, ConfigError> {
        if config.name.is_empty() {
            return Err(ConfigError::MissingFieldName {
                topic: config.topic.clone(),
            });
        }
        if config.name.contains(' ') || config.name.contains('/') {
            log::warn!(
                "[topic] field name '{}' may contain invalid characters",
                config.name
            );
        }

        let unit = match &config.unit {
            None => UnitSystem::default(),
            Some(s) => UnitSystem::parse(s).ok_or_else(|| ConfigError::InvalidUnit {
                topic: config.topic.clone(),
                unit: s.clone(),
            })?,
        };

        Ok(Self {
            topic: config.topic.clone(),
            field: config.name.clone(),
            unit,
            calc_delta: config.calc_delta,
            scale: config.scale,
            offset: config.offset,
            slot: Mutex::new(Slot {
                raw_value: None,
                updated: false,
                last_total: None,
                last_update: 0,
            }),
        })
    }

    /// Bus address this state listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Output field identifier.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Unit system this topic's packets are grouped under.
    pub fn unit(&self) -> UnitSystem {
        self.unit
    }

    /// Epoch seconds of the last `store`, or 0 if none yet.
    pub fn last_update(&self) -> u64 {
        self.slot.lock().last_update
    }

    /// Record a new raw value. Last-write-wins: a value stored before the
    /// previous one was read replaces it silently.
    pub fn store(&self, raw: &str) {
        let mut slot = self.slot.lock();
        slot.raw_value = Some(raw.to_string());
        slot.updated = true;
        slot.last_update = now_epoch_secs();
        log::debug!(
            "[topic] '{}' value '{}' field '{}'",
            self.topic,
            raw,
            self.field
        );
    }

    /// Consume the cached value and return the converted reading.
    ///
    /// Returns `Ok(None)` when nothing was stored since the last read, or
    /// when delta conversion has no baseline yet. Clears the update flag
    /// in both the success and the parse-failure case, so repeated calls
    /// without an intervening `store` return `Ok(None)` with no side
    /// effects.
    pub fn read(&self) -> Result<Option<f64>, ParseError> {
        let mut slot = self.slot.lock();
        if !slot.updated {
            return Ok(None);
        }
        slot.updated = false;

        // Slot invariant: store is the only writer and always fills
        // raw_value before setting updated.
        let raw = match slot.raw_value.clone() {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let mut value: f64 = raw.trim().parse().map_err(|_| ParseError {
            topic: self.topic.clone(),
            raw: raw.clone(),
        })?;

        if self.calc_delta {
            let (delta, new_total) = delta::step(slot.last_total, value);
            slot.last_total = Some(new_total);
            match delta {
                None => {
                    log::debug!(
                        "[topic] '{}' value {} no last total, delta skipped",
                        self.topic,
                        value
                    );
                    return Ok(None);
                }
                Some(d) => {
                    log::debug!("[topic] '{}' value {} delta {}", self.topic, value, d);
                    value = d;
                }
            }
        }

        Ok(Some(value * self.scale + self.offset))
    }
}

impl fmt::Display for TopicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topic={} field={} unit={} calc_delta={} scale={} offset={}",
            self.topic, self.field, self.unit, self.calc_delta, self.scale, self.offset
        )
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
