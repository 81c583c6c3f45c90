//! Transaction payload helpers.
//!
//! The broker treats payloads as opaque lines; this module implements the
//! pipe-separated transaction format the demo producer and consumer speak:
//!
//! ```text
//! <transaction_id>|<card_number>|<amount>|<timestamp>|<merchant_id>|<location>
//! ```

use crate::error::ClientError;
use chrono::Utc;
use rand::Rng;

const LOCATIONS: [&str; 10] = ["NY", "CA", "TX", "FL", "IL", "PA", "OH", "GA", "NC", "MI"];

/// A payment transaction as carried in a record payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: u64,
    pub card_number: String,
    pub amount: f64,
    pub timestamp: String,
    pub merchant_id: u32,
    pub location: String,
}

impl Transaction {
    /// Serialize to the wire line (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{:.2}|{}|{}|{}",
            self.transaction_id,
            self.card_number,
            self.amount,
            self.timestamp,
            self.merchant_id,
            self.location
        )
    }

    /// Parse a wire line produced by [`to_line`](Transaction::to_line).
    pub fn parse(line: &str) -> Result<Self, ClientError> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != 6 {
            return Err(ClientError::record(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        }
        Ok(Self {
            transaction_id: fields[0]
                .parse()
                .map_err(|e| ClientError::record(format!("bad transaction id: {e}")))?,
            card_number: fields[1].to_string(),
            amount: fields[2]
                .parse()
                .map_err(|e| ClientError::record(format!("bad amount: {e}")))?,
            timestamp: fields[3].to_string(),
            merchant_id: fields[4]
                .parse()
                .map_err(|e| ClientError::record(format!("bad merchant id: {e}")))?,
            location: fields[5].to_string(),
        })
    }

    /// A transaction is valid when the amount is positive and the card
    /// number passes the Luhn check.
    pub fn is_valid(&self) -> bool {
        self.amount > 0.0 && luhn_check(&self.card_number)
    }

    /// Generate a random transaction with a Luhn-valid Visa-style card
    /// number.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            transaction_id: rng.gen_range(100_000..=999_999_999),
            card_number: generate_card_number(&mut rng),
            amount: (rng.gen_range(1.0..1000.0) * 100.0f64).round() / 100.0,
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            merchant_id: rng.gen_range(1..=999),
            location: LOCATIONS[rng.gen_range(0..LOCATIONS.len())].to_string(),
        }
    }
}

/// Luhn checksum over the digits of `card` (spaces and dashes ignored).
/// Card numbers outside 13..=19 digits fail outright.
pub fn luhn_check(card: &str) -> bool {
    let digits: Vec<u32> = card.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let mut sum = 0;
    let mut alternate = false;
    for &digit in digits.iter().rev() {
        let mut digit = digit;
        if alternate {
            digit *= 2;
            if digit > 9 {
                digit = digit % 10 + 1;
            }
        }
        sum += digit;
        alternate = !alternate;
    }
    sum % 10 == 0
}

/// 16-digit Visa-style number: '4', 14 random digits, Luhn check digit.
fn generate_card_number<R: Rng>(rng: &mut R) -> String {
    let mut number = String::from("4");
    for _ in 0..14 {
        let d = rng.gen_range(0u8..10);
        number.push((b'0' + d) as char);
    }

    let mut sum = 0;
    let mut alternate = true;
    for c in number.chars().rev() {
        let mut digit = c.to_digit(10).unwrap_or(0);
        if alternate {
            digit *= 2;
            if digit > 9 {
                digit = digit % 10 + 1;
            }
        }
        sum += digit;
        alternate = !alternate;
    }
    let check = (10 - sum % 10) % 10;
    number.push((b'0' + check as u8) as char);
    number
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_good_card_passes_luhn() {
        // classic Visa test number
        assert!(luhn_check("4111111111111111"));
        assert!(luhn_check("4111-1111-1111-1111"));
    }

    #[test]
    fn off_by_one_card_fails_luhn() {
        assert!(!luhn_check("4111111111111112"));
    }

    #[test]
    fn short_numbers_fail_luhn() {
        assert!(!luhn_check("411111"));
        assert!(!luhn_check(""));
    }

    #[test]
    fn generated_transactions_validate() {
        for _ in 0..100 {
            let tx = Transaction::random();
            assert!(tx.is_valid(), "generated invalid card: {}", tx.card_number);
            assert_eq!(tx.card_number.len(), 16);
            assert!(tx.card_number.starts_with('4'));
        }
    }

    #[test]
    fn line_round_trips() {
        let tx = Transaction {
            transaction_id: 123456,
            card_number: "4111111111111111".to_string(),
            amount: 42.5,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            merchant_id: 77,
            location: "NY".to_string(),
        };
        let parsed = Transaction::parse(&tx.to_line()).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(tx.to_line(), "123456|4111111111111111|42.50|2026-01-01T00:00:00Z|77|NY");
    }

    #[test]
    fn nonpositive_amount_is_invalid() {
        let mut tx = Transaction::random();
        tx.amount = 0.0;
        assert!(!tx.is_valid());
        tx.amount = -3.0;
        assert!(!tx.is_valid());
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(Transaction::parse("only|three|fields").is_err());
        assert!(Transaction::parse("x|4111111111111111|1.00|t|1|NY").is_err());
    }
}
