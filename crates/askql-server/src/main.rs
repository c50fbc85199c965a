mod config;
mod pipeline;
mod server;
mod telemetry;


use clap::Parser;
use config::Config;

#[derive(Debug, Parser)]
#[command(name = "askql", about = "Answer natural-language questions over PostgreSQL")]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(long, env = "ASKQL_CONFIG")]
    config: Option<String>,
    /// Overrides `server.listen_addr`.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    telemetry::init_tracing(&config.logging)?;
    server::run(config).await
}
