pub mod api;

use axum_server::tls_rustls::RustlsConfig;
use log::{ error, info };
use std::error::Error;
use std::net::SocketAddr;

use crate::config::TlsSettings;
use api::{ create_router, AppState };

pub struct Server {
    addr: String,
    tls: Option<TlsSettings>,
    state: AppState,
}

impl Server {
    pub fn new(addr: String, tls: Option<TlsSettings>, state: AppState) -> Self {
        Self { addr, tls, state }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr: SocketAddr = self.addr
            .parse()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let app = create_router(self.state);

        match self.tls {
            Some(tls) => {
                let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await.map_err(
                    |e| format!("Failed to load TLS certificate or key: {}", e)
                )?;
                info!("Starting HTTPS API server on: https://{}", addr);
                axum_server
                    ::bind_rustls(addr, tls_config)
                    .serve(app.into_make_service()).await
                    .map_err(|e| {
                        error!("HTTPS server error: {}", e);
                        e
                    })?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                    error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
                    e
                })?;
                info!("Starting HTTP API server on: http://{}", addr);
                axum::serve(listener, app.into_make_service()).await?;
            }
        }

        Ok(())
    }
}
