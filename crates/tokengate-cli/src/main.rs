#[tokio::main]
async fn main() {
    // run() has already rendered the error with its suggestions
    if tokengate_cli::run().await.is_err() {
        std::process::exit(1);
    }
}
