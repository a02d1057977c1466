// SELECT rendering for bound criteria
//
// Placeholders are positional (`?`), pushed in the order they appear, so
// `params` lines up with the statement without numbering.

use super::criteria::SearchCriteria;
use super::engine::ExecutionMode;
use super::filter::{Filter, Order};
use super::schema::{select_list, validate_field, Column, Entity};
use super::template::{Op, Selection};
use super::value::Value;
use crate::error::{Result, StorageError};

/// Rendered statement and its parameters
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Render `criteria` as one SELECT
///
/// `max_rows` caps the row count on top of any filter limit.
pub(crate) fn render<E: Entity, R>(
    criteria: &SearchCriteria<E, R>,
    filter: Option<&Filter<E::Field>>,
    mode: ExecutionMode,
    max_rows: Option<u64>,
) -> Result<SelectStatement> {
    let template = criteria.template();
    let predicates = criteria.resolve()?;
    let selection = template.selection();

    let mut params = Vec::new();
    let mut conditions = Vec::new();

    for predicate in &predicates {
        let column = predicate.field.name();
        match (predicate.op, predicate.values) {
            (Op::Eq, [Value::Null]) => conditions.push(format!("{} IS NULL", column)),
            (Op::Neq, [Value::Null]) => conditions.push(format!("{} IS NOT NULL", column)),
            (Op::In, values) => {
                let marks = vec!["?"; values.len()].join(", ");
                conditions.push(format!("{} IN ({})", column, marks));
                params.extend(values.iter().cloned());
            }
            (op, values) => {
                conditions.push(format!("{} {} ?", column, op.as_sql()));
                params.extend(values.iter().cloned());
            }
        }
    }

    if mode == ExecutionMode::Live {
        if let Some(removed) = E::REMOVED {
            conditions.push(format!("{} IS NULL", removed.name()));
        }
    }

    let (projection, group_by) = match selection {
        Selection::Entity => (select_list::<E>(), None),
        Selection::Aggregate {
            func,
            field,
            group_by,
        } => (format!("{}({})", func.as_sql(), field.name()), group_by),
    };

    let mut sql = format!("SELECT {} FROM {}", projection, E::TABLE);
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    if let Some(group) = group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group.name());
    }

    let sort_keys = order_keys::<E>(template.name(), selection, filter)?;
    if !sort_keys.is_empty() {
        let keys: Vec<String> = sort_keys
            .iter()
            .map(|(field, order)| format!("{} {}", field.name(), order.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    let limit = match (filter.and_then(|f| f.get_limit()), max_rows) {
        (Some(limit), Some(cap)) => Some(limit.min(cap)),
        (limit, cap) => limit.or(cap),
    }
    .map(clamp_row_count);
    let offset = filter
        .and_then(|f| f.get_offset())
        .filter(|&o| o > 0)
        .map(clamp_row_count);

    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }

    Ok(SelectStatement { sql, params })
}

/// SQLite takes LIMIT/OFFSET as signed 64-bit integers
fn clamp_row_count(n: u64) -> u64 {
    n.min(i64::MAX as u64)
}

/// Explicit filter keys, or the template's default ordering
///
/// Explicit entity orderings end with the primary key so equal sort values
/// still page deterministically.
fn order_keys<E: Entity>(
    template: &str,
    selection: Selection<E::Field>,
    filter: Option<&Filter<E::Field>>,
) -> Result<Vec<(E::Field, Order)>> {
    let explicit = filter.map(|f| f.sort_keys()).unwrap_or(&[]);

    match selection {
        Selection::Entity => {
            if explicit.is_empty() {
                return Ok(vec![(E::PRIMARY_KEY, Order::Asc)]);
            }
            for (field, _) in explicit {
                validate_field::<E>(*field)?;
            }
            let mut keys = explicit.to_vec();
            if !keys.iter().any(|(f, _)| *f == E::PRIMARY_KEY) {
                keys.push((E::PRIMARY_KEY, Order::Asc));
            }
            Ok(keys)
        }
        Selection::Aggregate { group_by, .. } => {
            if let Some((field, _)) = explicit.iter().find(|(f, _)| Some(*f) != group_by) {
                return Err(StorageError::definition(format!(
                    "{}: aggregate results can only be ordered by the group column, not '{}'",
                    template,
                    field.name()
                )));
            }
            if !explicit.is_empty() {
                return Ok(explicit.to_vec());
            }
            Ok(group_by.map(|g| vec![(g, Order::Asc)]).unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Snapshot, SnapshotField};
    use crate::error::ErrorKind;
    use crate::query::template::{Aggregate, SearchBuilder};
    use pretty_assertions::assert_eq;

    fn volume_criteria(volume_id: i64) -> SearchCriteria<Snapshot> {
        let mut builder = SearchBuilder::<Snapshot>::new("VolumeIdSearch");
        builder
            .and("volume_id", SnapshotField::VolumeId, Op::Eq)
            .unwrap();
        let mut sc = builder.freeze().create();
        sc.set_parameter("volume_id", volume_id).unwrap();
        sc
    }

    #[test]
    fn test_live_mode_hides_removed() {
        let stmt = render(&volume_criteria(42), None, ExecutionMode::Live, None).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, volume_id, prev_snapshot_id, type_description, removed FROM snapshots \
             WHERE volume_id = ? AND removed IS NULL ORDER BY id ASC"
        );
        assert_eq!(stmt.params, vec![Value::Int(42)]);
    }

    #[test]
    fn test_including_removed_shares_predicates() {
        let live = render(&volume_criteria(42), None, ExecutionMode::Live, None).unwrap();
        let all = render(
            &volume_criteria(42),
            None,
            ExecutionMode::IncludingRemoved,
            None,
        )
        .unwrap();
        assert_eq!(all.sql, live.sql.replace(" AND removed IS NULL", ""));
        assert_eq!(all.params, live.params);
    }

    #[test]
    fn test_filter_ordering_and_pagination() {
        let filter = Filter::new()
            .order_by(SnapshotField::Id, Order::Desc)
            .offset(10)
            .limit(5);
        let stmt = render(
            &volume_criteria(1),
            Some(&filter),
            ExecutionMode::Live,
            None,
        )
        .unwrap();
        assert!(stmt.sql.ends_with("ORDER BY id DESC LIMIT 5 OFFSET 10"));
    }

    #[test]
    fn test_sort_keys_end_with_primary_key() {
        let filter = Filter::new().order_by(SnapshotField::TypeDescription, Order::Desc);
        let stmt = render(
            &volume_criteria(1),
            Some(&filter),
            ExecutionMode::Live,
            None,
        )
        .unwrap();
        assert!(stmt.sql.ends_with("ORDER BY type_description DESC, id ASC"));
    }

    #[test]
    fn test_oversized_limit_and_offset_are_clamped() {
        let filter = Filter::new().limit(u64::MAX);
        let stmt = render(&volume_criteria(1), Some(&filter), ExecutionMode::Live, None).unwrap();
        assert!(stmt.sql.ends_with(&format!("LIMIT {}", i64::MAX)));

        let page = Filter::page(u64::MAX, 10);
        let stmt = render(&volume_criteria(1), Some(&page), ExecutionMode::Live, None).unwrap();
        assert!(stmt
            .sql
            .ends_with(&format!("LIMIT 10 OFFSET {}", i64::MAX)));
    }

    #[test]
    fn test_offset_without_limit() {
        let filter = Filter::new().offset(3);
        let stmt = render(
            &volume_criteria(1),
            Some(&filter),
            ExecutionMode::Live,
            None,
        )
        .unwrap();
        assert!(stmt.sql.ends_with("LIMIT -1 OFFSET 3"));
    }

    #[test]
    fn test_max_rows_caps_limit() {
        let filter = Filter::new().limit(50);
        let stmt = render(
            &volume_criteria(1),
            Some(&filter),
            ExecutionMode::Live,
            Some(2),
        )
        .unwrap();
        assert!(stmt.sql.ends_with("LIMIT 2"));
    }

    #[test]
    fn test_null_and_in_predicates() {
        let mut builder = SearchBuilder::<Snapshot>::new("Roots");
        builder
            .and("prev", SnapshotField::PrevSnapshotId, Op::Eq)
            .unwrap()
            .and("types", SnapshotField::TypeDescription, Op::In)
            .unwrap();
        let mut sc = builder.freeze().create();
        sc.set_parameter("prev", None::<i64>)
            .unwrap()
            .set_parameters("types", ["HOURLY", "DAILY"])
            .unwrap();

        let stmt = render(&sc, None, ExecutionMode::IncludingRemoved, None).unwrap();
        assert!(stmt
            .sql
            .contains("WHERE prev_snapshot_id IS NULL AND type_description IN (?, ?)"));
        assert_eq!(stmt.params, vec![Value::from("HOURLY"), Value::from("DAILY")]);
    }

    #[test]
    fn test_aggregate_rendering() {
        let mut builder = SearchBuilder::<Snapshot>::new("LastSnapSearch")
            .select::<i64>(Aggregate::Max, SnapshotField::Id)
            .unwrap();
        builder
            .and("volume_id", SnapshotField::VolumeId, Op::Eq)
            .unwrap()
            .and("snap_id", SnapshotField::Id, Op::Neq)
            .unwrap();
        let mut sc = builder.freeze().create();
        sc.set_parameter("volume_id", 42i64)
            .unwrap()
            .set_parameter("snap_id", 3i64)
            .unwrap();

        let stmt = render(&sc, None, ExecutionMode::IncludingRemoved, None).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT MAX(id) FROM snapshots WHERE volume_id = ? AND id != ?"
        );
        assert_eq!(stmt.params, vec![Value::Int(42), Value::Int(3)]);
    }

    #[test]
    fn test_grouped_aggregate_orders_by_group() {
        let mut builder = SearchBuilder::<Snapshot>::new("MaxPerVolume")
            .select::<i64>(Aggregate::Max, SnapshotField::Id)
            .unwrap();
        builder.group_by(SnapshotField::VolumeId).unwrap();
        let sc = builder.freeze().create();

        let stmt = render(&sc, None, ExecutionMode::Live, None).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT MAX(id) FROM snapshots WHERE removed IS NULL \
             GROUP BY volume_id ORDER BY volume_id ASC"
        );

        let bad = Filter::new().order_by(SnapshotField::Id, Order::Asc);
        let err = render(&sc, Some(&bad), ExecutionMode::Live, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Definition);
    }

    #[test]
    fn test_unbound_fails_before_rendering() {
        let mut builder = SearchBuilder::<Snapshot>::new("VolumeIdSearch");
        builder
            .and("volume_id", SnapshotField::VolumeId, Op::Eq)
            .unwrap();
        let sc = builder.freeze().create();
        let err = render(&sc, None, ExecutionMode::Live, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnboundParameter);
    }
}
