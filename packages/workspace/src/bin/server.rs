use scribe_workspace::{serve, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut host = String::from("127.0.0.1");
    let mut port: u16 = 8069;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--port requires a value"))?;
                port = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid port number: {}", value))?;
                i += 2;
            }
            "--host" => {
                host = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--host requires a value"))?
                    .clone();
                i += 2;
            }
            "--help" | "-h" => {
                println!("Usage: scribe-history-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>   Port to listen on (default: 8069)");
                println!("  --host <HOST>       Address to bind (default: 127.0.0.1)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    serve(listener, AppState::new()).await?;
    Ok(())
}
