//! Attribute-string parsing for Set/Create builders.
//!
//! Accepts the `name=value,name=value` text supplied by operators and
//! validates it against a managed entity's attribute definitions. Binary
//! attribute kinds (bit fields, octet strings, tables) cannot be expressed
//! through this surface and are skipped without error.

use crate::schema::MeDefinition;

use super::error::OmciError;
use super::{AttributeValue, AttributeValues};

/// Parse `text` against `def`'s attribute definitions.
///
/// Spaces are stripped everywhere, entries are comma-separated, and an entry
/// without a `=` is ignored. Unknown attribute names and non-integer values
/// for integer-kinded attributes abort the parse.
pub fn parse(text: &str, def: &MeDefinition) -> Result<AttributeValues, OmciError> {
    if text.is_empty() {
        return Err(OmciError::EmptyAttributeList);
    }

    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut values = AttributeValues::new();

    for pair in cleaned.split(',') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };

        let attr = def
            .attribute_by_name(name)
            .ok_or_else(|| OmciError::UnknownAttribute(name.to_string()))?;

        if attr.kind == crate::schema::AttributeKind::String {
            values.push(name, AttributeValue::Text(value.to_string()));
        } else if attr.kind.is_binary() {
            // Not expressible as text; dropped by contract.
            continue;
        } else {
            let parsed = value.parse::<u64>().map_err(|_| OmciError::BadInteger {
                name: name.to_string(),
                value: value.to_string(),
            })?;
            values.push(name, AttributeValue::Integer(parsed));
        }
    }

    Ok(values)
}
