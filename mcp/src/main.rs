use asc_core::{APP_STORE_CONNECT_API_URL, AuthSettings};
use asc_mcp_runtime::{McpCommands, RuntimeConfig, run as run_mcp};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "asc-mcp",
    version,
    about = "App Store Connect MCP server over stdio"
)]
struct Cli {
    /// App Store Connect API base URL
    #[arg(long, env = "APP_STORE_CONNECT_API_URL", default_value = APP_STORE_CONNECT_API_URL, global = true)]
    api_url: String,

    /// API key identifier (the `kid` of the team key)
    #[arg(long, env = "APP_STORE_CONNECT_KEY_ID", global = true)]
    key_id: Option<String>,

    /// Issuer identifier from the App Store Connect keys page
    #[arg(long, env = "APP_STORE_CONNECT_ISSUER_ID", global = true)]
    issuer_id: Option<String>,

    /// Path to the .p8 private key; a leading ~ expands to the home directory
    #[arg(long, env = "APP_STORE_CONNECT_P8_PATH", global = true)]
    p8_path: Option<String>,

    #[command(subcommand)]
    command: McpCommands,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asc_mcp=info,asc_mcp_runtime=info,asc_core=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = RuntimeConfig {
        api_url: cli.api_url,
        auth: AuthSettings {
            key_id: cli.key_id,
            issuer_id: cli.issuer_id,
            private_key_path: cli.p8_path,
        },
    };

    let code = run_mcp(config, cli.command).await;
    std::process::exit(code);
}
