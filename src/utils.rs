use once_cell::sync::Lazy;
use regex::Regex;

static CELL_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("valid address pattern"));

/// Spreadsheet-style base-26 column letters: 1 -> "A", 26 -> "Z", 27 -> "AA".
pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

pub fn column_name_to_number(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let mut column: u32 = 0;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        column = column * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(column)
}

pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

/// Parse an A1-style address into 1-based (row, column). The address must be
/// column letters immediately followed by row digits, nothing else.
pub fn parse_cell_address(address: &str) -> Option<(u32, u32)> {
    let caps = CELL_ADDRESS_RE.captures(address.trim())?;
    let column = column_name_to_number(caps.get(1)?.as_str())?;
    let row: u32 = caps.get(2)?.as_str().parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, column))
}
