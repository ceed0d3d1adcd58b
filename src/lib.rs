// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MQTT-to-polling weather-station bridge.
//!
//! Bridges an asynchronous publish/subscribe feed of scalar sensor readings
//! to the synchronous, polled packet sequence a weather-station acquisition
//! loop expects.
//!
//! This crate provides:
//! - YAML-based per-topic configuration (field name, unit system, scale,
//!   offset, counter-to-delta conversion)
//! - A per-topic single-slot value cache with last-write-wins semantics
//! - Monotonic-counter-to-delta conversion with wrap-around handling
//! - A packet aggregator that groups updated topics by unit system
//!
//! # Overview
//!
//! The bridge does NOT own the bus connection. Inbound messages arrive
//! through [`Bridge::handle_message`]; the transport is abstracted behind
//! the [`Transport`] trait and reconnect logic stays on its side.
//!
//! ```text
//! (topic, payload) --> TopicState --> Aggregator --> Vec<Packet>
//!       async store        cache        poll tick      grouped by unit
//! ```

pub mod aggregate;
pub mod bridge;
pub mod config;
pub mod delta;
pub mod packet;
pub mod topic;
pub mod units;

pub use bridge::{Bridge, Transport};
pub use config::{BridgeConfig, BusConfig, ConfigError, TopicConfig};
pub use packet::Packet;
pub use topic::{ParseError, TopicState};
pub use units::UnitSystem;
