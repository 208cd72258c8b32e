//! mockrest entry point; all logic lives in `cli::run`.

#[tokio::main]
async fn main() {
    if let Err(e) = mockrest::cli::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
