use clap::Parser;
use ladder_cli::cli::output::Output;
use ladder_cli::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.run().await {
        Err(e) if e.is_domain_rule() => {
            Output::error(&e);
            std::process::exit(1);
        }
        result => result.map_err(anyhow::Error::new),
    }
}
