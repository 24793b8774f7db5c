//! Human-readable sizes and durations: `100G`, `1.5G`, `30s`, `2h`, `1d`.
//!
//! Both parsers treat `""` and `"0"` as zero, which callers read as "no limit".
//! Sizes use powers of 1024. Formatting helpers produce strings that
//! `parse_size` accepts again (`"10.00 GB"`).

use std::fmt;
use std::time::Duration;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// What kind of quantity failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Size,
    Duration,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Size => f.write_str("size"),
            Quantity::Duration => f.write_str("duration"),
        }
    }
}

/// Malformed size or duration string. `token` is the offending piece of `input`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {quantity} `{input}`: unrecognized `{token}`")]
pub struct ParseError {
    pub quantity: Quantity,
    pub input: String,
    pub token: String,
}

impl ParseError {
    fn new(quantity: Quantity, input: &str, token: &str) -> Self {
        Self {
            quantity,
            input: input.to_string(),
            token: token.to_string(),
        }
    }
}

/// Parses a size such as `500K`, `100M`, `1.5G`, `2T` or `4096` into bytes.
///
/// Suffixes are case-insensitive and may carry a trailing `B` or `iB`
/// (`10GB`, `10 GiB`, `512 B`). No suffix means raw bytes.
pub fn parse_size(text: &str) -> Result<u64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "0" {
        return Ok(0);
    }
    let upper = trimmed.to_ascii_uppercase();
    let without_b = upper
        .strip_suffix("IB")
        .or_else(|| upper.strip_suffix('B'))
        .unwrap_or(&upper)
        .trim_end();

    let (mantissa, multiplier) = match without_b.chars().last() {
        Some('K') => (&without_b[..without_b.len() - 1], KIB),
        Some('M') => (&without_b[..without_b.len() - 1], MIB),
        Some('G') => (&without_b[..without_b.len() - 1], GIB),
        Some('T') => (&without_b[..without_b.len() - 1], TIB),
        _ => (without_b, 1),
    };
    let mantissa = mantissa.trim();
    let value = parse_mantissa(mantissa).ok_or_else(|| {
        // ASCII uppercasing keeps byte offsets, so slice the operator's text.
        let token = match mantissa.len() {
            0 => trimmed,
            len => &trimmed[..len],
        };
        ParseError::new(Quantity::Size, trimmed, token)
    })?;

    let bytes = value * multiplier as f64;
    if bytes >= u64::MAX as f64 {
        return Err(ParseError::new(Quantity::Size, trimmed, trimmed));
    }
    Ok(bytes as u64)
}

/// Parses a duration such as `30s`, `5m`, `2h`, `1d` or `1h30m`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`. Every number needs a unit
/// (a bare `"0"` is the only exception). Fractions are allowed (`1.5h`).
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    let is_number = |c: char| c.is_ascii_digit() || c == '.';

    let mut rest = trimmed;
    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail.find(is_number).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        if number.is_empty() {
            return Err(ParseError::new(Quantity::Duration, trimmed, unit));
        }
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            "d" => 86_400e9,
            "" => return Err(ParseError::new(Quantity::Duration, trimmed, number)),
            other => return Err(ParseError::new(Quantity::Duration, trimmed, other)),
        };
        let value = parse_mantissa(number)
            .ok_or_else(|| ParseError::new(Quantity::Duration, trimmed, number))?;
        total_nanos += value * scale;
        rest = next;
    }

    if total_nanos >= u64::MAX as f64 {
        return Err(ParseError::new(Quantity::Duration, trimmed, trimmed));
    }
    Ok(Duration::from_nanos(total_nanos as u64))
}

/// Non-negative finite decimal; rejects `inf`, `nan` and signs.
fn parse_mantissa(text: &str) -> Option<f64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a byte count with two decimals: `512 B`, `1.50 GB`.
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= TIB => format!("{:.2} TB", b as f64 / TIB as f64),
        b if b >= GIB => format!("{:.2} GB", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.2} MB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.2} KB", b as f64 / KIB as f64),
        b => format!("{} B", b),
    }
}

pub fn format_rate(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
