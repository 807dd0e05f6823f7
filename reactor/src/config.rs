//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Reactor configuration

use std::time::Duration;

/// Reactor configuration
///
/// Use the builder methods to customize the defaults.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use vimoir_reactor::ReactorConfig;
///
/// let config = ReactorConfig::default()
///     .with_tick_interval(Duration::from_millis(100))
///     .with_poll_timeout(Duration::from_millis(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// Minimum time between two timer sweeps over all channels
    pub tick_interval: Duration,

    /// Upper bound on a single wait for readiness
    ///
    /// This also bounds how late a timer sweep may run.
    pub poll_timeout: Duration,

    /// Number of readiness events fetched per poll
    pub events_capacity: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            poll_timeout: Duration::from_millis(20),
            events_capacity: 128,
        }
    }
}

impl ReactorConfig {
    /// Set the timer sweep interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the poll timeout
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the number of events fetched per poll
    pub fn with_events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = capacity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick_interval must be greater than 0".to_string());
        }

        if self.poll_timeout.is_zero() {
            return Err("poll_timeout must be greater than 0".to_string());
        }

        if self.events_capacity == 0 {
            return Err("events_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}
