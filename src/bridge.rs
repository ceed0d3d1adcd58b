// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bridge orchestrator: message intake, poll entry point and the packet
//! loop driver.
//!
//! The bridge owns the topic set and nothing else. Inbound messages enter
//! through [`Bridge::handle_message`] from whatever context the transport
//! uses; the polling side calls [`Bridge::poll_once`] on its own cadence,
//! or hands a [`Transport`] to [`Bridge::run`] and lets the bridge drive
//! the loop. Connection and reconnect management stay on the transport's
//! side of the trait.

use crate::aggregate;
use crate::config::{BridgeConfig, ConfigError};
use crate::packet::Packet;
use crate::topic::{now_epoch_secs, TopicState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Message-bus transport the packet loop drives.
///
/// Implementations deliver inbound messages to [`Bridge::handle_message`]
/// during [`drive`](Transport::drive), from their own thread or from the
/// loop's. `drive` blocks for at most `timeout` and is the loop's only
/// blocking point; [`Bridge::close`] is observed at the next timeout
/// expiry.
pub trait Transport {
    type Error: std::error::Error;

    /// Subscribe to one topic filter. Called once per configured topic.
    fn subscribe(&mut self, filter: &str) -> Result<(), Self::Error>;

    /// Dispatch inbound traffic for up to `timeout`.
    fn drive(&mut self, timeout: Duration) -> Result<(), Self::Error>;

    /// Release the bus connection.
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

/// Bridges inbound topic updates to polled, unit-grouped packets.
///
/// `Send + Sync`; share it behind an `Arc` between the transport's
/// delivery context and the polling loop.
pub struct Bridge {
    topics: Vec<TopicState>,
    poll_interval: Duration,
    running: AtomicBool,
}

impl Bridge {
    /// Build the topic set from configuration.
    ///
    /// Fails on the first invalid topic entry, or when two entries share
    /// a bus address (inbound matching is exact, so duplicates could
    /// never both receive a message).
    pub fn from_config(config: &BridgeConfig) -> Result<Self, ConfigError> {
        let mut topics: Vec<TopicState> = Vec::with_capacity(config.topics.len());
        for topic_cfg in &config.topics {
            if topics.iter().any(|t| t.topic() == topic_cfg.topic) {
                return Err(ConfigError::DuplicateTopic(topic_cfg.topic.clone()));
            }
            let state = TopicState::new(topic_cfg)?;
            log::debug!("[bridge] configured topic: {}", state);
            topics.push(state);
        }

        Ok(Self {
            topics,
            poll_interval: config.poll_interval(),
            running: AtomicBool::new(true),
        })
    }

    /// Deliver one inbound message.
    ///
    /// The address must match a configured topic exactly; anything else
    /// is logged and dropped. Never fails, never panics.
    pub fn handle_message(&self, topic: &str, payload: &str) {
        match self.topics.iter().find(|t| t.topic() == topic) {
            Some(state) => state.store(payload),
            None => log::warn!("[bridge] unknown topic '{}' value '{}'", topic, payload),
        }
    }

    /// Topic filters to subscribe at connect time.
    pub fn topic_filters(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.topic())
    }

    /// Run one poll tick, consuming every pending update.
    ///
    /// Returns zero or more unit-grouped packets. Callable from any
    /// scheduler: a timer, a thread loop or an async task.
    pub fn poll_once(&self) -> Vec<Packet> {
        aggregate::poll_grouped(&self.topics, now_epoch_secs())
    }

    /// Whether the packet loop should keep running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the packet loop to stop after its current tick.
    pub fn close(&self) {
        log::info!("[bridge] shutdown requested");
        self.running.store(false, Ordering::Release);
    }

    /// Drive the packet loop until [`close`](Bridge::close) is called.
    ///
    /// Subscribes every configured filter, then alternates between
    /// emitting the tick's packets and blocking in `transport.drive` for
    /// the configured poll interval. On shutdown the transport is
    /// disconnected before returning.
    pub fn run<T: Transport>(
        &self,
        transport: &mut T,
        mut emit: impl FnMut(Packet),
    ) -> Result<(), T::Error> {
        for filter in self.topic_filters() {
            log::info!("[bridge] subscribing to topic '{}'", filter);
            transport.subscribe(filter)?;
        }

        while self.is_running() {
            for packet in self.poll_once() {
                emit(packet);
            }
            transport.drive(self.poll_interval)?;
        }

        log::info!("[bridge] disconnecting");
        transport.disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitSystem;
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::sync::Arc;

    const CONFIG_YAML: &str = r#"
poll_interval_secs: 0.01
topics:
  - topic: "sensors/outdoor/temperature"
    name: "outTemp"
    unit: "METRIC"
  - topic: "sensors/indoor/temperature"
    name: "inTemp"
    unit: "US"
  - topic: "sensors/rain/count"
    name: "rain"
    unit: "METRICWX"
    calc_delta: true
"#;

    fn bridge() -> Bridge {
        let config = BridgeConfig::from_yaml(CONFIG_YAML).expect("parse config");
        Bridge::from_config(&config).expect("build bridge")
    }

    /// Scripted transport: each `drive` call delivers one batch of
    /// messages to the bridge and closes it when the script runs out.
    struct ScriptedTransport {
        bridge: Arc<Bridge>,
        batches: VecDeque<Vec<(String, String)>>,
        subscribed: Vec<String>,
        disconnected: bool,
    }

    impl ScriptedTransport {
        fn new(bridge: Arc<Bridge>, batches: Vec<Vec<(&str, &str)>>) -> Self {
            Self {
                bridge,
                batches: batches
                    .into_iter()
                    .map(|batch| {
                        batch
                            .into_iter()
                            .map(|(t, v)| (t.to_string(), v.to_string()))
                            .collect()
                    })
                    .collect(),
                subscribed: Vec::new(),
                disconnected: false,
            }
        }
    }

    impl Transport for ScriptedTransport {
        type Error = Infallible;

        fn subscribe(&mut self, filter: &str) -> Result<(), Infallible> {
            self.subscribed.push(filter.to_string());
            Ok(())
        }

        fn drive(&mut self, _timeout: Duration) -> Result<(), Infallible> {
            match self.batches.pop_front() {
                Some(batch) => {
                    for (topic, payload) in batch {
                        self.bridge.handle_message(&topic, &payload);
                    }
                }
                None => self.bridge.close(),
            }
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), Infallible> {
            self.disconnected = true;
            Ok(())
        }
    }

    #[test]
    fn test_from_config_rejects_duplicate_topic() {
        let yaml = r#"
topics:
  - topic: "sensors/temp"
    name: "outTemp"
  - topic: "sensors/temp"
    name: "inTemp"
"#;
        let config = BridgeConfig::from_yaml(yaml).expect("parse config");
        match Bridge::from_config(&config) {
            Err(ConfigError::DuplicateTopic(topic)) => assert_eq!(topic, "sensors/temp"),
            other => panic!("expected DuplicateTopic, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_config_propagates_topic_errors() {
        let yaml = r#"
topics:
  - topic: "sensors/temp"
    name: "outTemp"
    unit: "FURLONGS"
"#;
        let config = BridgeConfig::from_yaml(yaml).expect("parse config");
        assert!(matches!(
            Bridge::from_config(&config),
            Err(ConfigError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_topic_filters_lists_all_addresses() {
        let bridge = bridge();
        let filters: Vec<&str> = bridge.topic_filters().collect();
        assert_eq!(
            filters,
            vec![
                "sensors/outdoor/temperature",
                "sensors/indoor/temperature",
                "sensors/rain/count"
            ]
        );
    }

    #[test]
    fn test_unknown_topic_is_dropped_without_panic() {
        let bridge = bridge();
        bridge.handle_message("sensors/unconfigured", "3.2");
        assert!(bridge.poll_once().is_empty());
    }

    #[test]
    fn test_poll_once_groups_updates() {
        let bridge = bridge();
        bridge.handle_message("sensors/outdoor/temperature", "21.5");
        bridge.handle_message("sensors/indoor/temperature", "70.0");

        let packets = bridge.poll_once();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].units, UnitSystem::US);
        assert_eq!(packets[0].fields["inTemp"], 70.0);
        assert_eq!(packets[1].units, UnitSystem::Metric);
        assert_eq!(packets[1].fields["outTemp"], 21.5);

        assert!(bridge.poll_once().is_empty());
    }

    #[test]
    fn test_close_stops_the_loop() {
        let bridge = bridge();
        assert!(bridge.is_running());
        bridge.close();
        assert!(!bridge.is_running());
    }

    #[test]
    fn test_run_loop_subscribes_emits_and_disconnects() {
        let bridge = Arc::new(bridge());
        let mut transport = ScriptedTransport::new(
            Arc::clone(&bridge),
            vec![
                // tick 1 delivery: two unit systems plus the delta baseline
                vec![
                    ("sensors/outdoor/temperature", "21.5"),
                    ("sensors/rain/count", "100"),
                ],
                // tick 2 delivery: rain counter advances
                vec![("sensors/rain/count", "103")],
                // tick 3 delivery: nothing
                vec![],
            ],
        );

        let mut packets = Vec::new();
        bridge
            .run(&mut transport, |p| packets.push(p))
            .expect("run loop");

        assert_eq!(
            transport.subscribed,
            vec![
                "sensors/outdoor/temperature",
                "sensors/indoor/temperature",
                "sensors/rain/count"
            ]
        );
        assert!(transport.disconnected);
        assert!(!bridge.is_running());

        // Tick 2 sees the METRIC temperature; the rain baseline emits
        // nothing. Tick 3 sees the rain delta. Tick 4 is empty.
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].units, UnitSystem::Metric);
        assert_eq!(packets[0].fields["outTemp"], 21.5);
        assert_eq!(packets[1].units, UnitSystem::MetricWx);
        assert_eq!(packets[1].fields["rain"], 3.0);
    }

    #[test]
    fn test_run_loop_with_no_traffic_emits_nothing() {
        let bridge = Arc::new(bridge());
        let mut transport =
            ScriptedTransport::new(Arc::clone(&bridge), vec![vec![], vec![], vec![]]);

        let mut packets = Vec::new();
        bridge
            .run(&mut transport, |p| packets.push(p))
            .expect("run loop");
        assert!(packets.is_empty());
        assert!(transport.disconnected);
    }
}
