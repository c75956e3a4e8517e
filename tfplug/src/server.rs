//! Server module for running Terraform providers
//!
//! This module starts the gRPC server and performs the go-plugin handshake
//! Terraform expects from a provider binary.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::logging;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{debug, info, warn};

/// Cookie Terraform sets in the environment of every provider it launches
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Plugin protocol version served by this crate
pub const PROTOCOL_VERSION: u32 = 6;

/// go-plugin's own handshake version, first field of the handshake line
const CORE_PROTOCOL_VERSION: u32 = 1;

/// Log level for the server
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file (PEM)
    pub cert_path: Option<PathBuf>,
    /// Path to TLS key file (PEM)
    pub key_path: Option<PathBuf>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Whether to install the stderr tracing subscriber
    pub enable_logging: bool,
    /// Log level used when RUST_LOG is unset
    pub log_level: LogLevel,
    /// Timeout for graceful shutdown
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            max_message_size: 256 << 20, // 256MB
            enable_logging: true,
            log_level: LogLevel::Info,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve TLS with the given PEM certificate and key
    /// The certificate must be valid for "localhost"
    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.cert_path = Some(cert_path);
        self.key_path = Some(key_path);
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Disable logging
    pub fn without_logging(mut self) -> Self {
        self.enable_logging = false;
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Refuse to run unless launched by Terraform
fn check_handshake_env() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => {}
        _ => {
            return Err(TfplugError::HandshakeFailed(
                "This binary is a plugin. These are not meant to be executed directly. \
                 Please execute the program that consumes these plugins, which will \
                 load any plugins automatically"
                    .to_string(),
            ))
        }
    }

    if let Ok(versions) = std::env::var("PLUGIN_PROTOCOL_VERSIONS") {
        let supported = versions
            .split(',')
            .filter_map(|v| v.trim().parse::<u32>().ok())
            .any(|v| v == PROTOCOL_VERSION);
        if !supported {
            return Err(TfplugError::HandshakeFailed(format!(
                "Terraform requested protocol versions {}, this provider only speaks {}",
                versions, PROTOCOL_VERSION
            )));
        }
    }

    Ok(())
}

/// Body of the first CERTIFICATE block in a PEM file, in the unpadded
/// base64 form go-plugin reads from the handshake line
fn pem_certificate_base64(pem: &str) -> Option<String> {
    let mut lines = pem.lines().map(str::trim);
    lines.find(|line| *line == "-----BEGIN CERTIFICATE-----")?;

    let mut body = String::new();
    for line in lines {
        if line == "-----END CERTIFICATE-----" {
            return Some(body.trim_end_matches('=').to_string());
        }
        body.push_str(line);
    }
    None
}

fn handshake_line(port: u16, server_cert: Option<&str>) -> String {
    let mut line = format!(
        "{}|{}|tcp|127.0.0.1:{}|grpc",
        CORE_PROTOCOL_VERSION, PROTOCOL_VERSION, port
    );
    if let Some(cert) = server_cert {
        line.push('|');
        line.push_str(cert);
    }
    line
}

async fn load_tls(config: &ServerConfig) -> Result<Option<(ServerTlsConfig, String)>> {
    let (cert_path, key_path) = match (&config.cert_path, &config.key_path) {
        (Some(cert), Some(key)) => (cert, key),
        (None, None) => return Ok(None),
        _ => {
            return Err(TfplugError::TlsError(
                "both a certificate and a key are required for TLS".to_string(),
            ))
        }
    };

    // tonic needs a process-wide crypto provider; a second install is harmless
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert = tokio::fs::read(cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

    let encoded = pem_certificate_base64(&String::from_utf8_lossy(&cert)).ok_or_else(|| {
        TfplugError::TlsError(format!(
            "{} does not contain a PEM certificate",
            cert_path.display()
        ))
    })?;

    let identity = Identity::from_pem(cert, key);
    Ok(Some((ServerTlsConfig::new().identity(identity), encoded)))
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_handshake_env()?;

    if config.enable_logging {
        logging::init_logging(config.log_level);
    }

    let grpc_server = GrpcProviderServer::new(provider);
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut builder = Server::builder();
    let mut server_cert = None;
    if let Some((tls_config, encoded)) = load_tls(&config).await? {
        builder = builder.tls_config(tls_config)?;
        server_cert = Some(encoded);
    }

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(port, server_cert.as_deref()))?;
    stdout.flush()?;

    info!(port, tls = server_cert.is_some(), "Provider server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let router = builder.add_service(provider_service);
    let mut server = tokio::spawn(async move {
        router
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            return finish(result);
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received interrupt, initiating graceful shutdown");
            let _ = shutdown_tx.send(());
        }
    }

    match tokio::time::timeout(config.shutdown_timeout, server).await {
        Ok(result) => finish(result)?,
        Err(_) => warn!(
            timeout = ?config.shutdown_timeout,
            "Shutdown timeout exceeded, forcing shutdown"
        ),
    }

    debug!("Provider shutdown complete");
    Ok(())
}

fn finish(
    result: std::result::Result<
        std::result::Result<(), tonic::transport::Error>,
        tokio::task::JoinError,
    >,
) -> Result<()> {
    match result {
        Ok(served) => Ok(served?),
        Err(e) => Err(TfplugError::Custom(format!("server task failed: {}", e))),
    }
}

/// Convenience function to run a provider with default configuration
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}
