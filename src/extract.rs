use crate::models::ExtractedFields;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Every attribute name the extractor knows how to pull out of a block.
/// The table is fixed: one uniform rule per name, no per-field code.
const FIELD_NAMES: &[&str] = &[
    "netname",
    "descr",
    "country",
    "city",
    "mnt-by",
    "created",
    "last-modified",
    "changed",
    "status",
    "cust_source",
];

static FIELD_PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    FIELD_NAMES
        .iter()
        .map(|name| {
            let pattern = format!(r"(?m)^{}:\s?(.+)$", regex::escape(name));
            (*name, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Pull one named attribute out of a block.
///
/// All matching lines are trimmed, empties dropped, and the survivors
/// joined with single spaces, so a multi-line `descr:` collapses into one
/// string. Returns `None` when nothing matches; a field is either present
/// with content or absent.
pub fn parse_field(block: &str, name: &str) -> Option<String> {
    let re = FIELD_PATTERNS.get(name)?;
    let joined = re
        .captures_iter(block)
        .filter_map(|caps| {
            let value = caps[1].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Assemble the full field set for one block.
///
/// `last-modified` falls back to the legacy `changed` attribute, and a
/// `city:` field augments the country as `"<country> - <city>"`.
pub fn extract_fields(block: &str) -> ExtractedFields {
    let country = match (parse_field(block, "country"), parse_field(block, "city")) {
        (Some(country), Some(city)) => Some(format!("{country} - {city}")),
        (country, _) => country,
    };

    ExtractedFields {
        netname: parse_field(block, "netname"),
        description: parse_field(block, "descr"),
        country,
        maintained_by: parse_field(block, "mnt-by"),
        created: parse_field(block, "created"),
        last_modified: parse_field(block, "last-modified")
            .or_else(|| parse_field(block, "changed")),
        status: parse_field(block, "status"),
        source: parse_field(block, "cust_source"),
    }
}
