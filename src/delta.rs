// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic-counter-to-delta conversion.
//!
//! Cumulative sensors (e.g. rain counters) publish a running total; the
//! acquisition loop wants per-interval increments. This module holds the
//! pure step function; [`crate::topic::TopicState`] applies it under the
//! topic lock so the transition is atomic with respect to concurrent
//! stores.

/// Advance the delta state with a new counter total.
///
/// Returns `(delta, new_last_total)`:
/// - no previous total: no delta can be computed from a single sample,
///   the new total becomes the baseline
/// - `new_total < last_total`: counter reset or wrap-around; the post-reset
///   absolute value is taken as the increment. Known approximation: a
///   counter that wraps at a non-zero boundary or resets to a non-zero
///   baseline under-reports the true increment.
/// - otherwise: the plain difference
pub fn step(last_total: Option<f64>, new_total: f64) -> (Option<f64>, f64) {
    match last_total {
        None => (None, new_total),
        Some(last) if new_total < last => (Some(new_total), new_total),
        Some(last) => (Some(new_total - last), new_total),
    }
}
