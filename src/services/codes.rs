//! Sequential code generation for items and purchase orders, plus the pure
//! variant-combination helpers.
//!
//! Codes look like `MQN-25-0001` / `LCH-25-0042` / `PO-25-0007`: prefix, two
//! digit year, and a zero-padded sequence that restarts each year. The next
//! number comes from a read-max query; it is not safe under concurrent
//! generation. The unique column is the arbiter: a losing writer surfaces a
//! `Conflict` and the create orchestrators retry the generate+insert step.

use chrono::{Datelike, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::item::{self, Store};
use crate::entities::purchase_order;
use crate::errors::ServiceError;

const SEQUENCE_WIDTH: usize = 4;

/// Two-digit year suffix for the current UTC year.
fn current_year_suffix() -> String {
    format!("{:02}", Utc::now().year() % 100)
}

/// Extracts the numeric tail from a code like `MQN-25-0012`.
fn sequence_of(code: &str) -> Option<u32> {
    code.rsplit('-').next()?.parse().ok()
}

fn format_code(prefix: &str, year: &str, sequence: u32) -> String {
    format!("{}-{}-{:0width$}", prefix, year, sequence, width = SEQUENCE_WIDTH)
}

/// Next item code for a store, e.g. `MQN-25-0001`.
///
/// Zero-padded sequences make lexicographic order match numeric order, so the
/// highest existing code is the first row when sorted descending.
pub async fn next_item_code<C: ConnectionTrait>(
    conn: &C,
    store: Store,
) -> Result<String, ServiceError> {
    let prefix = store.code_prefix();
    let year = current_year_suffix();
    let pattern = format!("{}-{}-%", prefix, year);

    let latest = item::Entity::find()
        .filter(item::Column::Code.like(&pattern))
        .order_by_desc(item::Column::Code)
        .one(conn)
        .await?;

    let next = latest
        .and_then(|m| sequence_of(&m.code))
        .map(|n| n + 1)
        .unwrap_or(1);

    Ok(format_code(prefix, &year, next))
}

/// Next purchase-order number, e.g. `PO-25-0001`.
pub async fn next_order_number<C: ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    let year = current_year_suffix();
    let pattern = format!("PO-{}-%", year);

    let latest = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderNumber.like(&pattern))
        .order_by_desc(purchase_order::Column::OrderNumber)
        .one(conn)
        .await?;

    let next = latest
        .and_then(|m| sequence_of(&m.order_number))
        .map(|n| n + 1)
        .unwrap_or(1);

    Ok(format_code("PO", &year, next))
}

/// One attribute group used to expand variants, e.g. `size: [S, M, L]`.
#[derive(Debug, Clone)]
pub struct VariantGroup {
    pub name: String,
    pub values: Vec<String>,
}

/// A single expanded combination: `(group name, value)` pairs in group
/// declaration order.
pub type Combination = Vec<(String, String)>;

/// Full cartesian product of the groups, depth-first: group declaration
/// order outer, per-group value order inner. Empty input yields no
/// combinations.
pub fn variant_combinations(groups: &[VariantGroup]) -> Vec<Combination> {
    if groups.is_empty() || groups.iter().any(|g| g.values.is_empty()) {
        return Vec::new();
    }

    let mut combinations: Vec<Combination> = vec![Vec::new()];
    for group in groups {
        let mut expanded = Vec::with_capacity(combinations.len() * group.values.len());
        for partial in &combinations {
            for value in &group.values {
                let mut next = partial.clone();
                next.push((group.name.clone(), value.clone()));
                expanded.push(next);
            }
        }
        combinations = expanded;
    }
    combinations
}

/// Variant code: item code plus the combination values joined by `/`,
/// e.g. `MQN-25-0001-S/Red`.
pub fn variant_code(item_code: &str, combination: &Combination) -> String {
    let values: Vec<&str> = combination.iter().map(|(_, v)| v.as_str()).collect();
    format!("{}-{}", item_code, values.join("/"))
}

/// Validates the `{MQN|LCH}-{YY}-{NNNN}` shape and recovers the store and
/// two-digit year.
pub fn parse_item_code(code: &str) -> Result<(Store, u32), ServiceError> {
    let mut parts = code.split('-');
    let (prefix, year, seq) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(y), Some(s), None) => (p, y, s),
        _ => {
            return Err(ServiceError::ValidationError(format!(
                "invalid item code: {}",
                code
            )))
        }
    };

    let store = match prefix {
        "MQN" => Store::MiniQueen,
        "LCH" => Store::Lariche,
        _ => {
            return Err(ServiceError::ValidationError(format!(
                "unknown store prefix in code: {}",
                code
            )))
        }
    };

    if year.len() != 2 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(format!(
            "invalid year in code: {}",
            code
        )));
    }
    if seq.len() != SEQUENCE_WIDTH || !seq.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(format!(
            "invalid sequence in code: {}",
            code
        )));
    }

    let year: u32 = year
        .parse()
        .map_err(|_| ServiceError::ValidationError(format!("invalid year in code: {}", code)))?;
    Ok((store, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(defs: &[(&str, &[&str])]) -> Vec<VariantGroup> {
        defs.iter()
            .map(|(name, values)| VariantGroup {
                name: name.to_string(),
                values: values.iter().map(|v| v.to_string()).collect(),
            })
            .collect()
    }

    #[test]
    fn sequence_parses_numeric_tail() {
        assert_eq!(sequence_of("MQN-25-0042"), Some(42));
        assert_eq!(sequence_of("PO-25-9999"), Some(9999));
        assert_eq!(sequence_of("garbage"), None);
    }

    #[test]
    fn codes_are_zero_padded() {
        assert_eq!(format_code("MQN", "25", 1), "MQN-25-0001");
        assert_eq!(format_code("PO", "25", 123), "PO-25-0123");
    }

    #[test]
    fn two_by_two_cartesian_product() {
        let combos = variant_combinations(&groups(&[
            ("size", &["S", "M"]),
            ("color", &["Red", "Blue"]),
        ]));
        assert_eq!(combos.len(), 4);
        assert_eq!(
            combos[0],
            vec![
                ("size".to_string(), "S".to_string()),
                ("color".to_string(), "Red".to_string())
            ]
        );
        assert_eq!(
            combos[3],
            vec![
                ("size".to_string(), "M".to_string()),
                ("color".to_string(), "Blue".to_string())
            ]
        );
    }

    #[test]
    fn empty_groups_yield_nothing() {
        assert!(variant_combinations(&[]).is_empty());
        assert!(variant_combinations(&groups(&[("size", &[])])).is_empty());
    }

    #[test]
    fn single_group_keeps_value_order() {
        let combos = variant_combinations(&groups(&[("size", &["S", "M", "L"])]));
        let values: Vec<&str> = combos.iter().map(|c| c[0].1.as_str()).collect();
        assert_eq!(values, vec!["S", "M", "L"]);
    }

    #[test]
    fn variant_code_joins_values_with_slashes() {
        let combo: Combination = vec![
            ("size".into(), "S".into()),
            ("color".into(), "Red".into()),
        ];
        assert_eq!(variant_code("MQN-25-0001", &combo), "MQN-25-0001-S/Red");
    }

    #[test]
    fn parse_accepts_both_stores() {
        let (store, year) = parse_item_code("MQN-25-0001").unwrap();
        assert_eq!(store, Store::MiniQueen);
        assert_eq!(year, 25);

        let (store, _) = parse_item_code("LCH-24-0100").unwrap();
        assert_eq!(store, Store::Lariche);
    }

    #[test]
    fn parse_rejects_malformed_codes() {
        assert!(parse_item_code("XXX-25-0001").is_err());
        assert!(parse_item_code("MQN-2025-0001").is_err());
        assert!(parse_item_code("MQN-25-01").is_err());
        assert!(parse_item_code("MQN-25").is_err());
        assert!(parse_item_code("MQN-25-0001-extra").is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn combination_count_is_the_product_of_group_sizes(
                sizes in proptest::collection::vec(1usize..4, 0..4)
            ) {
                let groups: Vec<VariantGroup> = sizes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| VariantGroup {
                        name: format!("g{i}"),
                        values: (0..*n).map(|v| format!("v{v}")).collect(),
                    })
                    .collect();
                let expected = if groups.is_empty() {
                    0
                } else {
                    sizes.iter().product()
                };
                prop_assert_eq!(variant_combinations(&groups).len(), expected);
            }

            #[test]
            fn generated_codes_parse_back(seq in 1u32..9999, year in 0u32..100) {
                let code = format_code("MQN", &format!("{:02}", year), seq);
                let (store, parsed_year) = parse_item_code(&code).unwrap();
                prop_assert_eq!(store, Store::MiniQueen);
                prop_assert_eq!(parsed_year, year);
                prop_assert_eq!(sequence_of(&code), Some(seq));
            }
        }
    }
}
