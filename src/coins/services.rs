use super::repo_types::ExchangeReceipt;

/// Whole dollars with thousands separators, e.g. `$25,000`.
pub fn format_usd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if amount < 0 {
        format!("-${}", out)
    } else {
        format!("${}", out)
    }
}

pub fn exchange_message(receipt: &ExchangeReceipt) -> String {
    format!(
        "Successfully exchanged {} coins for {}",
        receipt.coins_exchanged,
        format_usd(receipt.amount_received)
    )
}
