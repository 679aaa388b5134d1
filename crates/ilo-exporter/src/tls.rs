use crate::config::TlsConfig;
use anyhow::{anyhow, Result};
use axum::serve::Listener;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

/// A client that has not finished its handshake by then is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a TLS acceptor from the PEM files named in `config`.
pub fn acceptor(config: &TlsConfig) -> Result<TlsAcceptor> {
    let certs = CertificateDer::pem_file_iter(&config.cert_chain_path)
        .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
        .map_err(|e| anyhow!("Failed to read certificate chain '{}': {}", config.cert_chain_path, e))?;
    if certs.is_empty() {
        return Err(anyhow!("No certificates found in '{}'", config.cert_chain_path));
    }

    let key = PrivateKeyDer::from_pem_file(&config.key_path)
        .map_err(|e| anyhow!("Failed to read private key '{}': {}", config.key_path, e))?;

    let mut server_config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// Completed handshakes waiting for the server to pick them up.
const ACCEPT_BACKLOG: usize = 64;

type Accepted = (TlsStream<TcpStream>, SocketAddr);

/// TCP listener that hands TLS connections to the HTTP server once their
/// handshake has completed.
///
/// Every handshake runs in its own task, so a peer that stalls mid-handshake
/// only holds up itself.
pub struct TlsListener {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<Accepted>,
}

impl TlsListener {
    /// Starts accepting on `inner`. Must be called inside a Tokio runtime.
    pub fn new(inner: TcpListener, acceptor: TlsAcceptor) -> std::io::Result<Self> {
        let local_addr = inner.local_addr()?;
        let (tx, rx) = mpsc::channel(ACCEPT_BACKLOG);
        tokio::spawn(accept_loop(inner, acceptor, tx));
        Ok(Self { local_addr, rx })
    }
}

async fn accept_loop(inner: TcpListener, acceptor: TlsAcceptor, tx: mpsc::Sender<Accepted>) {
    loop {
        let (stream, addr) = tokio::select! {
            _ = tx.closed() => return,
            conn = inner.accept() => match conn {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => {
                    if tx.send((tls, addr)).await.is_err() {
                        tracing::debug!(peer = %addr, "Listener closed, dropping connection");
                    }
                }
                Ok(Err(e)) => tracing::debug!(peer = %addr, error = %e, "TLS handshake failed"),
                Err(_) => tracing::debug!(peer = %addr, "TLS handshake timed out"),
            }
        });
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self.rx.recv().await {
            Some(conn) => conn,
            // The accept loop only exits once this receiver is gone.
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}
