//! Connects to a running demo server and evaluates `forward` once.

use umbridge_client::Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:4242".to_string());

    println!("Connecting to {url}");
    let client = Client::connect(url, "forward").await?;

    let input_sizes = client.input_sizes(serde_json::json!({})).await?;
    println!("forward input sizes: {input_sizes:?}");

    let output = client
        .evaluate(vec![vec![3.0]], serde_json::json!({}))
        .await?;
    println!("Evaluate([3.0]) = {output:?}");

    Ok(())
}
