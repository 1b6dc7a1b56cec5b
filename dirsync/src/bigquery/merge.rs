use crate::bigquery::client::TableRef;

/// The business key matching staging rows to durable rows.
const MERGE_KEY: &str = "id";

/// Columns overwritten on an existing row during the merge.
///
/// `created` is intentionally absent: it is write-once and keeps the value of
/// the original insert.
const UPDATED_COLUMNS: [&str; 6] = [
    "userName",
    "givenName",
    "familyName",
    "email",
    "active",
    "lastModified",
];

/// All columns of the users tables, in schema order.
const ALL_COLUMNS: [&str; 8] = [
    "id",
    "userName",
    "givenName",
    "familyName",
    "email",
    "active",
    "created",
    "lastModified",
];

/// Renders the set-based upsert from the staging table into the durable table.
///
/// Rows whose `id` already exists in the durable table get every non-key
/// column overwritten except `created`; absent ids are inserted whole.
///
/// Staging snapshots containing duplicate `id`s are passed through as-is; the
/// engine's merge semantics decide the outcome. Deduplicating here would
/// silently paper over a source-data problem.
pub fn merge_statement(staging: &TableRef, target: &TableRef) -> String {
    let update_set = UPDATED_COLUMNS
        .iter()
        .map(|column| format!("t.`{column}` = s.`{column}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_columns = ALL_COLUMNS
        .iter()
        .map(|column| format!("`{column}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_values = ALL_COLUMNS
        .iter()
        .map(|column| format!("s.`{column}`"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "merge {} t using {} s on t.`{MERGE_KEY}` = s.`{MERGE_KEY}` \
         when matched then update set {update_set} \
         when not matched then insert ({insert_columns}) values ({insert_values})",
        target.full_name(),
        staging.full_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (TableRef, TableRef) {
        (
            TableRef::new("analytics", "directory", "users_staging"),
            TableRef::new("analytics", "directory", "users"),
        )
    }

    #[test]
    fn test_merge_statement_shape() {
        let (staging, target) = tables();
        let statement = merge_statement(&staging, &target);

        assert_eq!(
            statement,
            "merge `analytics.directory.users` t using `analytics.directory.users_staging` s \
             on t.`id` = s.`id` \
             when matched then update set \
             t.`userName` = s.`userName`, t.`givenName` = s.`givenName`, \
             t.`familyName` = s.`familyName`, t.`email` = s.`email`, \
             t.`active` = s.`active`, t.`lastModified` = s.`lastModified` \
             when not matched then insert \
             (`id`, `userName`, `givenName`, `familyName`, `email`, `active`, `created`, `lastModified`) \
             values \
             (s.`id`, s.`userName`, s.`givenName`, s.`familyName`, s.`email`, s.`active`, s.`created`, s.`lastModified`)"
        );
    }

    #[test]
    fn test_created_is_never_updated() {
        let (staging, target) = tables();
        let statement = merge_statement(&staging, &target);

        let update_clause = statement
            .split("when matched then update set")
            .nth(1)
            .unwrap()
            .split("when not matched")
            .next()
            .unwrap();

        assert!(!update_clause.contains("`created`"));
        assert!(update_clause.contains("t.`lastModified` = s.`lastModified`"));
    }

    #[test]
    fn test_insert_covers_every_column() {
        let (staging, target) = tables();
        let statement = merge_statement(&staging, &target);

        for column in ALL_COLUMNS {
            assert!(statement.contains(&format!("`{column}`")), "{column} missing");
        }
    }
}
