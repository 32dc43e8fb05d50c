use mux_server::MuxServer;

#[derive(clap::Parser)]
struct Args {
    #[arg(long, default_value = "config/mux.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    use mux_common::config::AppConfig;
    let app_config = AppConfig::from_file(&args.config).unwrap_or_default();

    println!("--------------------------------------------------");
    println!("   Codex Multiplexer");
    println!("   Listen Addr: {}", app_config.server.listen_addr);
    println!(
        "   Discovery:   {}",
        if app_config.federation.static_backends.is_empty() {
            "okapi proxy".to_string()
        } else {
            app_config.federation.static_backends.join(", ")
        }
    );
    println!("--------------------------------------------------");

    MuxServer::new().with_config(&args.config).run().await
}
