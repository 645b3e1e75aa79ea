use super::http_server::{HttpServer, ServerHandle};
use super::service::AppService;
use crate::config::{ConfigError, ServerConfig};
use crate::handler::HandlerGroup;
use crate::router::{RegistryError, RouteRegistry, Router};
use crate::security::{Authenticator, CredentialStore};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle state of a [`Server`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
}

#[derive(Debug)]
pub enum ServerError {
    AlreadyRunning,
    Config(ConfigError),
    Registry(RegistryError),
    /// An address could not be bound; listeners started before it were stopped again
    Bind { addr: String, message: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::AlreadyRunning => write!(f, "server is already running"),
            ServerError::Config(e) => write!(f, "{e}"),
            ServerError::Registry(e) => write!(f, "{e}"),
            ServerError::Bind { addr, message } => write!(f, "cannot listen on {addr}: {message}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Config(e) => Some(e),
            ServerError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        ServerError::Config(e)
    }
}

impl From<RegistryError> for ServerError {
    fn from(e: RegistryError) -> Self {
        ServerError::Registry(e)
    }
}

/// Controller server: handler groups plus the listeners serving them.
///
/// Groups are registered with [`Server::add_group`] and the route table is built on
/// [`Server::start`]; groups added while running are picked up by the next start.
///
/// ```rust,ignore
/// let mut server = Server::new(ServerConfig::default(), Arc::new(NoCredentialStore));
/// server.add_group(my_group());
/// server.start()?;
/// // ...
/// server.stop();
/// ```
pub struct Server {
    config: ServerConfig,
    store: Arc<dyn CredentialStore>,
    groups: Vec<Arc<HandlerGroup>>,
    handles: Vec<ServerHandle>,
}

impl Server {
    pub fn new(config: ServerConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            store,
            groups: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Register a handler group; it receives the server's credential store
    pub fn add_group(&mut self, mut group: HandlerGroup) {
        group.attach_credential_store(Arc::clone(&self.store));
        if self.state() == ServerState::Running {
            warn!(group = %group.name(), "Group added while running, effective after restart");
        }
        self.groups.push(Arc::new(group));
    }

    #[must_use]
    pub fn groups(&self) -> &[Arc<HandlerGroup>] {
        &self.groups
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the request pipeline from the registered groups and configuration
    pub fn build_service(&self) -> Result<AppService, ServerError> {
        self.config.validate()?;
        let registry = RouteRegistry::build(self.groups.iter().cloned(), self.config.collision_policy)?;
        let cors = self.config.cors_policy().map_err(ConfigError::from)?;
        let authenticator = Authenticator::new(&self.config.auth, Arc::clone(&self.store));
        info!(
            groups = self.groups.len(),
            paths = registry.len(),
            shadowed = registry.shadowed().len(),
            auth = %self.config.auth,
            "Route table built"
        );
        Ok(AppService::new(Router::new(registry), authenticator, cors))
    }

    /// Listen on every configured address
    ///
    /// All-or-nothing: if any address fails to bind, the listeners already started are
    /// stopped and the server stays [`ServerState::Stopped`].
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.state() == ServerState::Running {
            return Err(ServerError::AlreadyRunning);
        }
        let service = self.build_service()?;

        let mut handles = Vec::with_capacity(self.config.bind.len());
        for addr in &self.config.bind {
            let server = HttpServer::new(service.clone(), self.config.workers);
            match server.start(addr) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(addr = %addr, error = %e, "Bind failed, stopping started listeners");
                    for handle in handles {
                        handle.stop();
                    }
                    return Err(ServerError::Bind {
                        addr: addr.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        self.handles = handles;
        info!(addrs = ?self.local_addrs(), "Server started");
        Ok(())
    }

    /// Stop every listener. Stopping a stopped server does nothing.
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.stop();
        }
        info!("Server stopped");
    }

    #[must_use]
    pub fn state(&self) -> ServerState {
        if self.handles.is_empty() {
            ServerState::Stopped
        } else {
            ServerState::Running
        }
    }

    /// Bound addresses, useful when the configuration asked for port 0
    #[must_use]
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.handles.iter().map(ServerHandle::local_addr).collect()
    }

    /// Wait until every listener accepts connections
    pub fn wait_ready(&self) -> std::io::Result<()> {
        self.handles.iter().try_for_each(ServerHandle::wait_ready)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("groups", &self.groups.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
