//! Simple GET request example.
//!
//! Usage: `cargo run --example simple_get [BASE_URL]`

use sessionnet::{ConnectionManager, NO_QUERY};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/".to_string());

    let mut manager = ConnectionManager::builder(base_url)
        .timeout(Duration::from_secs(10))
        .build()?;
    manager.add_param_headers("Accept", "application/json");

    println!("GET {}get?demo=1", manager.base_url());
    let response = manager.raw_get("get", &[("demo", 1)]).await?;
    println!("Status: {}", response.status());
    for (name, value) in response.headers() {
        println!("  {}: {:?}", name, value);
    }
    println!("\n{}", response.text()?);

    let response = manager.raw_delete("delete", None, NO_QUERY).await?;
    println!("DELETE -> {}", response.status());

    manager.close();
    Ok(())
}
