#[tokio::main]
async fn main() {
    if let Err(e) = dealdesk_lib::run().await {
        eprintln!("dealdesk: {e}");
        std::process::exit(1);
    }
}
