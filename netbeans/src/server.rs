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

//! Netbeans server assembly

use crate::{CommandRegistry, Netbeans, NetbeansClient, NetbeansConfig, NetbeansResult, Session};
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{info, instrument};
use vimoir_chat::Encoding;
use vimoir_reactor::{
    Channel, ChannelResult, Connection, Context, Listener, Reactor, ReactorMetrics,
    SessionFactory, TcpStream,
};

/// Builds a [`Netbeans`] engine for every accepted editor.
struct NetbeansFactory<C, F> {
    clients: F,
    commands: Rc<CommandRegistry<C>>,
    config: Rc<NetbeansConfig>,
    encoding: Encoding,
}

impl<C, F> SessionFactory for NetbeansFactory<C, F>
where
    C: NetbeansClient + 'static,
    F: FnMut() -> C,
{
    fn create(
        &mut self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        ctx: &mut Context<'_>,
    ) -> ChannelResult<Box<dyn Channel>> {
        let conn = Connection::accepted(stream, peer_addr, self.encoding, Arc::clone(ctx.metrics()));
        let session = Session::new(conn, ctx.token());
        let client = (self.clients)();
        Ok(Box::new(Netbeans::new(
            session,
            client,
            Rc::clone(&self.commands),
            Rc::clone(&self.config),
        )))
    }
}

/// A reactor with a listening socket serving Netbeans editors.
///
/// ```no_run
/// use vimoir_netbeans::{CommandRegistry, NetbeansClient, NetbeansConfig, NetbeansServer};
///
/// struct Quiet;
/// impl NetbeansClient for Quiet {}
///
/// let config = NetbeansConfig::default().with_port(3219);
/// let server = NetbeansServer::bind(config, CommandRegistry::new(), || Quiet)?;
/// server.run()?;
/// # Ok::<(), vimoir_netbeans::NetbeansError>(())
/// ```
pub struct NetbeansServer {
    reactor: Reactor,
    local_addr: SocketAddr,
}

impl NetbeansServer {
    /// Bind the listening socket described by `config`.
    ///
    /// `clients` is called once per accepted editor to build its handler.
    #[instrument(skip_all, fields(host = %config.host, port = config.port))]
    pub fn bind<C, F>(
        config: NetbeansConfig,
        commands: CommandRegistry<C>,
        clients: F,
    ) -> NetbeansResult<Self>
    where
        C: NetbeansClient + 'static,
        F: FnMut() -> C + 'static,
    {
        config.validate()?;
        let encoding = config.encoding()?;
        let addr = config.bind_address()?;
        let mut reactor = Reactor::new(config.reactor_config())?;

        let single_session = config.single_session;
        let factory = NetbeansFactory {
            clients,
            commands: Rc::new(commands),
            config: Rc::new(config),
            encoding,
        };
        let listener = Listener::bind(addr, factory, single_session)?;
        let local_addr = listener.local_addr();
        reactor.register(Box::new(listener))?;
        info!(local_addr = %local_addr, single_session, encoding = %encoding, "netbeans server bound");

        Ok(Self {
            reactor,
            local_addr,
        })
    }

    /// Address the listening socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Metrics shared by the listener and every session
    pub fn metrics(&self) -> Arc<ReactorMetrics> {
        self.reactor.metrics()
    }

    /// Serve editors until the listener is terminated and every session has
    /// closed, or a fatal error occurs.
    pub fn run(mut self) -> NetbeansResult<()> {
        self.reactor.run()?;
        let snapshot = self.reactor.metrics().snapshot();
        info!(
            total_connections = snapshot.total_connections,
            requests_sent = snapshot.requests_sent,
            uptime = ?snapshot.uptime,
            "netbeans server stopped"
        );
        Ok(())
    }
}
