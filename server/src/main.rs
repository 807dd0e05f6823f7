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

//! `vimoir [CONFIG]`: serve Vim editors over the Netbeans protocol.
//!
//! Settings come from the optional INI file and `VIMOIR_NETBEANS_*`
//! environment variables. `RUST_LOG` overrides the configured log level.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]

mod logger;

use crate::logger::LogClient;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vimoir_netbeans::{NetbeansConfig, NetbeansResult, NetbeansServer};

fn main() -> ExitCode {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match NetbeansConfig::load(path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("vimoir: {err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match serve(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "vimoir terminated");
            ExitCode::FAILURE
        }
    }
}

fn serve(config: NetbeansConfig) -> NetbeansResult<()> {
    let server = NetbeansServer::bind(config, LogClient::commands(), LogClient::default)?;
    info!(local_addr = %server.local_addr(), "vimoir listening");
    server.run()
}
