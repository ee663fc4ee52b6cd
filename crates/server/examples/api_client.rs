//! Example client for the Global Integrity Server API
//!
//! Run the server first, then:
//!
//! ```text
//! INTEGRITY_API_KEY=my-key cargo run -p integrity-server --example api_client
//! ```

use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server_url =
        std::env::var("INTEGRITY_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
    let api_key = std::env::var("INTEGRITY_API_KEY")?;
    let client = Client::new();

    // Example 1: Health check
    println!("1. Health Check:");
    let resp = client.get(format!("{server_url}/health")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    // Example 2: Submit a fresh batch
    println!("2. First Batch:");
    let body = submit(&client, &server_url, &api_key, &["h1", "h2", "h3"]).await?;
    println!("Body: {body}");
    println!();

    // Example 3: Resubmit with one overlap
    println!("3. Overlapping Batch:");
    let body = submit(&client, &server_url, &api_key, &["h1", "h4"]).await?;
    println!("Body: {body}");
    println!(
        "Score: {}",
        body["global_uniqueness_score"].as_f64().unwrap_or_default()
    );
    println!();

    // Example 4: Request without an API key
    println!("4. Missing API Key:");
    let resp = client
        .post(format!("{server_url}/validate-global-uniqueness"))
        .json(&json!({ "fingerprints": ["h5"] }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);

    Ok(())
}

async fn submit(
    client: &Client,
    server_url: &str,
    api_key: &str,
    fingerprints: &[&str],
) -> anyhow::Result<Value> {
    let resp = client
        .post(format!("{server_url}/validate-global-uniqueness"))
        .header("X-API-KEY", api_key)
        .json(&json!({ "fingerprints": fingerprints }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    Ok(resp.json().await?)
}
