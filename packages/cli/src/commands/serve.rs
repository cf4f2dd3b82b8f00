use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_workspace::AppState;
use tokio::net::TcpListener;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8069)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

pub fn serve(args: ServeArgs) -> Result<()> {
    println!(
        "{} history server on http://{}:{}",
        "🚀 Starting".green().bold(),
        args.host,
        args.port
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
        scribe_workspace::serve(listener, AppState::new()).await?;
        Ok(())
    })
}
