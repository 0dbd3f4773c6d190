//! TCP node service

use crate::config::NodeConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::node::Node;
use crate::transport::{read_message, TcpTransport};
use parking_lot::Mutex;
use sonar_wire::PeerAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// A node served over TCP.
///
/// Every inbound connection carries exactly one message and is handled by
/// its own task.
pub struct NodeService {
    /// Configuration
    config: NodeConfig,
    /// Node state shared with connection tasks
    node: Arc<Node<TcpTransport>>,
    /// Listener, until the accept loop takes it
    listener: Mutex<Option<TcpListener>>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Accept loop task
    accept_loop: Mutex<Option<JoinHandle<()>>>,
}

impl NodeService {
    /// Bind the listening socket.
    ///
    /// The node's overlay address is the configured host with the port
    /// actually bound, so port 0 picks a free port.
    pub async fn bind(config: NodeConfig) -> NetworkResult<Self> {
        let listener = TcpListener::bind((
            config.listen_addr.host(),
            config.listen_addr.port(),
        ))
        .await?;
        let port = listener.local_addr()?.port();

        let mut config = config;
        config.listen_addr = config.listen_addr.with_port(port);
        let transport = TcpTransport::new(config.connect_timeout);
        let node = Arc::new(Node::new(&config, transport));
        info!("Listening on {}", config.listen_addr);

        Ok(Self {
            config,
            node,
            listener: Mutex::new(Some(listener)),
            running: Arc::new(AtomicBool::new(false)),
            accept_loop: Mutex::new(None),
        })
    }

    /// The node
    pub fn node(&self) -> &Arc<Node<TcpTransport>> {
        &self.node
    }

    /// Overlay address of the node
    pub fn local_addr(&self) -> &PeerAddr {
        self.node.local_addr()
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start accepting connections and greet the configured neighbours.
    ///
    /// Returns the number of neighbours that accepted the HELLO.
    pub async fn start(&self) -> NetworkResult<usize> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or(NetworkError::AlreadyRunning)?;
        self.running.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(accept_loop(
            listener,
            self.node.clone(),
            self.running.clone(),
            self.config.accept_poll_interval,
            self.config.read_timeout,
        ));
        *self.accept_loop.lock() = Some(handle);

        let added = self.node.bootstrap(&self.config.neighbours).await;
        info!(
            "Node {} started with {} of {} neighbours",
            self.local_addr(),
            added,
            self.config.neighbours.len()
        );
        Ok(added)
    }

    /// Ask the accept loop to stop
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop and wait until the listener is closed and every connection
    /// task has finished.
    pub async fn shutdown(&self) -> NetworkResult<()> {
        let handle = self.accept_loop.lock().take();
        let handle = handle.ok_or(NetworkError::NotRunning)?;
        self.stop();
        if let Err(e) = handle.await {
            error!("Accept loop failed: {}", e);
        }
        info!("Node {} stopped", self.local_addr());
        Ok(())
    }

    /// Say BYE to every neighbour, then shut down
    pub async fn leave(&self) -> NetworkResult<usize> {
        let reached = self.node.say_goodbye().await?;
        self.shutdown().await?;
        Ok(reached)
    }
}

async fn accept_loop(
    listener: TcpListener,
    node: Arc<Node<TcpTransport>>,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
    read_timeout: Duration,
) {
    let mut workers = JoinSet::new();

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            accepted = tokio::time::timeout(poll_interval, listener.accept()) => {
                match accepted {
                    Ok(Ok((stream, addr))) => {
                        debug!("Incoming connection from {}", addr);
                        let node = node.clone();
                        workers.spawn(handle_connection(stream, node, read_timeout));
                    }
                    Ok(Err(e)) => error!("Accept error: {}", e),
                    Err(_) => {}
                }
            }
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    error!("Connection task failed: {}", e);
                }
            }
        }
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!("Connection task failed: {}", e);
        }
    }
    drop(listener);
}

async fn handle_connection(
    mut stream: TcpStream,
    node: Arc<Node<TcpTransport>>,
    read_timeout: Duration,
) {
    let message = match tokio::time::timeout(read_timeout, read_message(&mut stream)).await {
        Ok(Ok(message)) => message,
        Ok(Err(e)) => {
            warn!("Dropping malformed message: {}", e);
            return;
        }
        Err(_) => {
            warn!("Timed out reading message");
            return;
        }
    };
    drop(stream);
    node.handle_message(message).await;
}
