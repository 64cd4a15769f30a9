use clap::Parser;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = mailsort::cli::Cli::parse();
    mailsort::logging::setup_tracing(cli.verbose, cli.json);

    if let Err(err) = mailsort::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
