use tracing_subscriber::EnvFilter;
use washread::WasherClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let name_prefix = std::env::args()
        .nth(1)
        .unwrap_or_else(|| WasherClient::DEFAULT_NAME_PREFIX.to_string());

    tracing::info!(prefix = %name_prefix, "scanning for washer");
    let mut client = WasherClient::new(&name_prefix).await?;

    client
        .watch(|state| tracing::info!(?state, "washer state"))
        .await
}
