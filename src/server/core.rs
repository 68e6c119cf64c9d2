use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::FtpError;
use crate::middleware::logging::log_connection;
use crate::protocol::Dispatcher;
use crate::server::session::handle_session;
use crate::storage::ensure_directory;

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    session_slots: Arc<Semaphore>,
    max_clients: usize,
}

impl Server {
    /// Binds the control listener and prepares the upload directory.
    pub async fn bind(config: &ServerConfig) -> Result<Self, FtpError> {
        let dispatcher = Dispatcher::from_config(config);

        ensure_directory(dispatcher.upload_dir()).await?;
        info!("Upload directory: {}", dispatcher.upload_dir().display());

        let socket = config.control_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e.into());
            }
        };

        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
            session_slots: Arc::new(Semaphore::new(config.max_clients)),
            max_clients: config.max_clients,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FtpError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one session task per connection.
    ///
    /// Once `max_clients` sessions are running, the next connection is not
    /// accepted until one of them ends.
    pub async fn run(self) {
        info!(
            "Server is ready to receive connections (max {} clients)",
            self.max_clients
        );

        loop {
            let permit = match Arc::clone(&self.session_slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!("Session limiter closed; stopping accept loop");
                    return;
                }
            };

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    log_connection(addr);
                    let dispatcher = Arc::clone(&self.dispatcher);

                    tokio::spawn(async move {
                        handle_session(stream, addr, dispatcher).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}
