use chrono::{DateTime, TimeZone};

const UNIT: u64 = 1024;
const PREFIXES: &[u8] = b"KMGTPE";

/// Human-readable binary size, e.g. `4.6 GiB`.
///
/// Values below 1024 are printed as plain bytes. An exact power of 1024 is
/// printed in the larger unit (`1024` -> `1.0 KiB`).
pub fn nice_size(bytes: u64) -> String {
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!(
        "{:.1} {}iB",
        bytes as f64 / div as f64,
        PREFIXES[exp] as char
    )
}

/// Minute-granularity timestamp used in artifact names: `YYYY_MM_DD_HH_mm`.
pub fn timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y_%m_%d_%H_%M").to_string()
}

/// Upper-cases the first character, `jira` -> `Jira`.
pub fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
