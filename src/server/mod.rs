pub mod api;

use crate::cli::Args;
use axum::Router;
use log::{ info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

pub struct Server {
    addr: String,
    app: Router,
    args: Args,
}

impl Server {
    pub fn new(addr: String, app: Router, args: Args) -> Self {
        Self { addr, app, args }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.args.enable_tls {
            self.start_https_server().await
        } else {
            self.start_http_server().await
        }
    }

    async fn start_http_server(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("HTTP API listening on: http://{}", listener.local_addr()?);
        axum::serve(listener, self.app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    async fn start_https_server(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (cert_path, key_path) = match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert), Some(key)) => (cert.clone(), key.clone()),
            _ => {
                return Err("ENABLE_TLS requires both TLS_CERT_PATH and TLS_KEY_PATH".into());
            }
        };
        let addr = self.addr.parse::<SocketAddr>()?;
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        info!("HTTPS API listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(self.app.into_make_service())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
