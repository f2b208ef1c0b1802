//! Notification message formatting (Telegram HTML).

use crate::change::{Change, Direction, PriceChange};
use coinwatch_core::PriceSnapshot;
use std::fmt::Write;

/// Format a USD amount, adding decimals for very small prices.
pub fn format_usd(price: f64) -> String {
    if price < 0.01 {
        format!("${:.8}", price)
    } else if price < 1.0 {
        format!("${:.6}", price)
    } else {
        format!("${}", with_thousands(price, 4))
    }
}

/// Format `value` with `decimals` places and comma thousands separators.
pub fn with_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value < 0.0 && formatted.bytes().any(|b| b != b'0' && b != b'.') {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

/// USD, UZS and RUB lines for one snapshot, indented under a heading.
pub fn format_snapshot_lines(snapshot: &PriceSnapshot) -> String {
    format!(
        "   💵 {}\n   🇺🇿 {} so'm\n   🇷🇺 {} ₽\n",
        format_usd(snapshot.usd),
        with_thousands(snapshot.uzs, 2),
        with_thousands(snapshot.rub, 4),
    )
}

/// One message covering every changed symbol for a user.
pub fn format_price_changes(changes: &[PriceChange], interval_secs: u64) -> String {
    let mut text = String::from("📊 <b>Price changes</b>\n\n");

    for PriceChange { snapshot, change } in changes {
        let marker = match change {
            Change::FirstSighting => "💰",
            Change::Moved {
                direction: Direction::Up,
                ..
            } => "📈",
            Change::Moved {
                direction: Direction::Down,
                ..
            } => "📉",
        };

        let _ = writeln!(text, "{} <b>{}</b>", marker, snapshot.symbol);
        let _ = writeln!(text, "   💵 {}", format_usd(snapshot.usd));
        if let Change::Moved { percent, direction } = change {
            let sign = match direction {
                Direction::Up => '+',
                Direction::Down => '-',
            };
            let _ = writeln!(text, "   📊 {}{:.2}%", sign, percent);
        }
        let _ = writeln!(text, "   🇺🇿 {} so'm", with_thousands(snapshot.uzs, 2));
        let _ = writeln!(text, "   🇷🇺 {} ₽", with_thousands(snapshot.rub, 4));
        text.push('\n');
    }

    let _ = write!(text, "🕒 <i>Next check in {}s</i>", interval_secs);
    text
}
