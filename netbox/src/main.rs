use netbox::NetboxProvider;
use std::env;
use std::path::PathBuf;
use tfplug::{serve, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = ServerConfig::new();

    if let (Ok(cert), Ok(key)) = (
        env::var("NETBOX_PROVIDER_TLS_CERT"),
        env::var("NETBOX_PROVIDER_TLS_KEY"),
    ) {
        config = config.with_tls(PathBuf::from(cert), PathBuf::from(key));
    }

    serve(NetboxProvider::new(), config).await?;

    Ok(())
}
