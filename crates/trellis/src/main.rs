#[tokio::main]
async fn main() {
    if let Err(e) = lib_trellis::init().await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
