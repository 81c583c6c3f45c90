//! Demo consumer: validate transactions from a RelayQ broker.
//!
//! Each received record is parsed as a transaction and answered with ACK
//! when it passes validation (positive amount, Luhn-valid card) or ERR
//! otherwise. Running statistics print as records flow.
//!
//! Usage: `cargo run --example validator [addr]`

use relayq_client::{Consumer, Transaction};

#[derive(Debug, Default)]
struct Statistics {
    total: u64,
    valid: u64,
    invalid: u64,
    unparseable: u64,
    total_amount: f64,
    valid_amount: f64,
}

impl Statistics {
    fn print(&self) {
        println!("=== Transaction Statistics ===");
        println!("Total: {}", self.total);
        let pct = |n: u64| {
            if self.total > 0 {
                n as f64 * 100.0 / self.total as f64
            } else {
                0.0
            }
        };
        println!("Valid: {} ({:.1}%)", self.valid, pct(self.valid));
        println!("Invalid: {} ({:.1}%)", self.invalid, pct(self.invalid));
        println!("Unparseable: {}", self.unparseable);
        println!("Total amount: ${:.2}", self.total_amount);
        println!("Valid amount: ${:.2}", self.valid_amount);
    }
}

#[tokio::main]
async fn main() -> relayq_client::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9200".to_string());

    println!("Validating transactions from {addr}");
    let mut consumer = Consumer::connect(addr).await?;
    let mut stats = Statistics::default();

    while let Some(line) = consumer.next().await? {
        stats.total += 1;
        match Transaction::parse(&line) {
            Ok(tx) => {
                stats.total_amount += tx.amount;
                if tx.is_valid() {
                    stats.valid += 1;
                    stats.valid_amount += tx.amount;
                    consumer.ack().await?;
                } else {
                    stats.invalid += 1;
                    consumer.err().await?;
                }
            }
            Err(e) => {
                eprintln!("unparseable record: {e}");
                stats.unparseable += 1;
                consumer.err().await?;
            }
        }

        if stats.total % 10 == 0 {
            println!("processed {} transactions...", stats.total);
        }
    }

    println!("broker closed the connection");
    stats.print();
    Ok(())
}
