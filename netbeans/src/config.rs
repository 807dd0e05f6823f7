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

//! Netbeans server configuration

use crate::{NetbeansError, NetbeansResult};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use vimoir_chat::Encoding;
use vimoir_reactor::ReactorConfig;

/// Prefix of the environment variables overriding configuration keys
pub const ENV_PREFIX: &str = "VIMOIR_NETBEANS";

/// How a class of protocol error is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the server
    #[serde(alias = "terminate")]
    Fatal,
    /// Close the offending connection only
    Close,
    /// Log the error and discard the message
    Ignore,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorPolicy::Fatal => "fatal",
            ErrorPolicy::Close => "close",
            ErrorPolicy::Ignore => "ignore",
        })
    }
}

/// Netbeans server configuration
///
/// Loaded with [`NetbeansConfig::load`] from defaults, an optional INI
/// file and `VIMOIR_NETBEANS_<NAME>` environment variables, in increasing
/// order of precedence.
///
/// # Example
///
/// ```
/// use vimoir_netbeans::NetbeansConfig;
///
/// let config = NetbeansConfig::default()
///     .with_port(0)
///     .with_password("secret");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetbeansConfig {
    /// Listen host, empty for any address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Password expected in the `AUTH` message
    pub password: String,

    /// Character encoding of the connection
    pub encoding: String,

    /// Timer tick interval in milliseconds
    pub user_interval: u64,

    /// Poll timeout in milliseconds
    pub timeout: u64,

    /// Reject a new editor while another session is active
    pub single_session: bool,

    /// Handling of a bad password or an unexpected handshake message
    pub handshake_policy: ErrorPolicy,

    /// Handling of frames matching no message grammar
    pub parse_error_policy: ErrorPolicy,

    /// Handling of `fileOpened` with a mismatched buffer number
    pub buffer_mismatch_policy: ErrorPolicy,

    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for NetbeansConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 3219,
            password: "changeme".to_string(),
            encoding: "UTF-8".to_string(),
            user_interval: 200,
            timeout: 20,
            single_session: false,
            handshake_policy: ErrorPolicy::Fatal,
            parse_error_policy: ErrorPolicy::Fatal,
            buffer_mismatch_policy: ErrorPolicy::Ignore,
            log_level: "info".to_string(),
        }
    }
}

impl NetbeansConfig {
    /// Load the configuration.
    ///
    /// `path` names an INI file of `name = value` lines; environment
    /// variables such as `VIMOIR_NETBEANS_PORT` override it.
    pub fn load(path: Option<&Path>) -> NetbeansResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Ini).required(true));
        }
        let config: NetbeansConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Set the listen host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the listen port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the expected password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the connection encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the timer tick interval in milliseconds
    pub fn with_user_interval(mut self, millis: u64) -> Self {
        self.user_interval = millis;
        self
    }

    /// Set the poll timeout in milliseconds
    pub fn with_timeout(mut self, millis: u64) -> Self {
        self.timeout = millis;
        self
    }

    /// Allow only one session at a time
    pub fn with_single_session(mut self, single: bool) -> Self {
        self.single_session = single;
        self
    }

    /// Set the handshake error policy
    pub fn with_handshake_policy(mut self, policy: ErrorPolicy) -> Self {
        self.handshake_policy = policy;
        self
    }

    /// Set the parse error policy
    pub fn with_parse_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.parse_error_policy = policy;
        self
    }

    /// Set the buffer mismatch policy
    pub fn with_buffer_mismatch_policy(mut self, policy: ErrorPolicy) -> Self {
        self.buffer_mismatch_policy = policy;
        self
    }

    /// Parsed connection encoding
    pub fn encoding(&self) -> NetbeansResult<Encoding> {
        self.encoding
            .parse()
            .map_err(|_| NetbeansError::Config(format!("unknown encoding '{}'", self.encoding)))
    }

    /// Timer tick interval
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.user_interval)
    }

    /// Poll timeout
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Reactor settings derived from this configuration
    pub fn reactor_config(&self) -> ReactorConfig {
        ReactorConfig::default()
            .with_tick_interval(self.tick_interval())
            .with_poll_timeout(self.poll_timeout())
    }

    /// Resolve the address to listen on
    pub fn bind_address(&self) -> NetbeansResult<SocketAddr> {
        if self.host.is_empty() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port));
        }
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| NetbeansError::Config(format!("cannot resolve host '{}'", self.host)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> NetbeansResult<()> {
        if self.password.is_empty() {
            return Err(NetbeansError::Config("password must not be empty".to_string()));
        }

        if self.password.chars().any(char::is_whitespace) {
            return Err(NetbeansError::Config("password must not contain whitespace".to_string()));
        }

        if self.user_interval == 0 {
            return Err(NetbeansError::Config("user_interval must be greater than 0".to_string()));
        }

        if self.timeout == 0 {
            return Err(NetbeansError::Config("timeout must be greater than 0".to_string()));
        }

        if self.handshake_policy == ErrorPolicy::Ignore {
            return Err(NetbeansError::Config(
                "handshake_policy must be fatal or close".to_string(),
            ));
        }

        self.encoding()?;
        Ok(())
    }
}
