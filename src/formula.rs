//! Formula template rewriting for computed columns.
//!
//! Templates are written in terms of header names ("Revenue * 0.1"). For a
//! given data row the rewriter substitutes each header name with the
//! concrete cell reference for that row ("B2 * 0.1"). Only the text is
//! produced; nothing here evaluates formulas.

use crate::utils::column_number_to_name;
use regex::Regex;
use std::collections::HashMap;

/// Substitute every case-insensitive whole-word occurrence of a known
/// header name in `template` with its cell reference at `target_row`.
///
/// Headers are processed longest first so "Net Revenue" is consumed before
/// "Revenue" can clip it. Header text that does not form a valid regex
/// word (or an empty map) leaves the template unchanged for that entry.
pub fn rewrite(header_map: &HashMap<String, u32>, template: &str, target_row: u32) -> String {
    let mut headers: Vec<(&str, u32)> = header_map
        .iter()
        .map(|(name, col)| (name.as_str(), *col))
        .collect();
    headers.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

    let mut result = template.to_string();
    for (name, col) in headers {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        let reference = format!("{}{}", column_number_to_name(col), target_row);
        result = re.replace_all(&result, reference.as_str()).into_owned();
    }
    result
}
