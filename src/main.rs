use embedsp::{create_service, discover_settings};
use tower_lsp::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = std::env::current_dir()
            .ok()
            .and_then(|dir| discover_settings(&dir).0.log_filter().map(str::to_owned));
        configured.unwrap_or_else(|| "embedsp=info".into()).into()
    });

    // stdout carries the protocol
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = create_service();
    Server::new(stdin, stdout, socket).serve(service).await;
}
