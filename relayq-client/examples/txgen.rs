//! Demo producer: push random transactions at a RelayQ broker.
//!
//! Usage: `cargo run --example txgen [addr] [count]`

use relayq_client::{Producer, Transaction};

#[tokio::main]
async fn main() -> relayq_client::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:9100".to_string());
    let count: usize = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(100);

    println!("Generating {count} transactions for {addr}");

    let mut producer = Producer::connect(addr).await?;
    for i in 0..count {
        let tx = Transaction::random();
        if i < 5 {
            println!(
                "sample: id={} card={}**** amount=${:.2} valid={}",
                tx.transaction_id,
                &tx.card_number[..4],
                tx.amount,
                if tx.is_valid() { "YES" } else { "NO" }
            );
        }
        producer.send(&tx.to_line()).await?;
    }

    let sent = producer.sent();
    producer.close().await?;
    println!("{sent} transactions sent");
    Ok(())
}
