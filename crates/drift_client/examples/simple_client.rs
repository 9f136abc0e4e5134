//! Minimal publish/subscribe round trip against a local Drift server.
//!
//! Start the server first: `cargo run -p drift -- server`

use drift_client::{Client, HistoryOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new("http://127.0.0.1:5500")?;

    client.create("demo").await?;
    client.publish("demo", "hello from the example").await?;

    let mut sub = client
        .subscribe(
            "demo",
            HistoryOptions {
                len: Some(10),
                since: None,
            },
        )
        .await?;
    println!("history enabled: {}", sub.history_enabled());

    while let Some(msg) = sub.next().await {
        println!("received: {}", String::from_utf8_lossy(&msg?));
    }

    Ok(())
}
