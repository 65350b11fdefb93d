//! SQL text and parameter assembly for MySQL bulk upserts.
//!
//! Everything here is pure string/value manipulation so the emitted statement
//! shape can be tested without a database.

use mysql_async::Value;

use crate::database::batch_upsert::Field;

/// Quotes an identifier with backticks, doubling embedded backticks.
#[inline]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Formats a table name, handling schema.table format.
pub fn format_table_name(table_name: &str) -> String {
    if table_name.contains('.') {
        let parts: Vec<&str> = table_name.split('.').collect();
        if parts.len() == 2 {
            let schema = parts[0].trim_matches('`');
            let table = parts[1].trim_matches('`');
            format!("{}.{}", quote_identifier(schema), quote_identifier(table))
        } else {
            table_name.to_string()
        }
    } else {
        quote_identifier(table_name)
    }
}

/// Derives the quoted column list and the matching on-duplicate-key update
/// assignments from a record's fields, applying the selection rule once.
///
/// The same rule decides each row's value list, so positions always line up.
pub fn build_column_lists(fields: &[Field]) -> (Vec<String>, Vec<String>) {
    let mut columns = Vec::with_capacity(fields.len());
    let mut update_columns = Vec::with_capacity(fields.len());

    for field in fields {
        if !field.is_selected() {
            continue;
        }
        let column_name = quote_identifier(field.column_name());
        update_columns.push(format!("{}=VALUES({})", column_name, column_name));
        columns.push(column_name);
    }

    (columns, update_columns)
}

/// A fully assembled statement: SQL text plus its flat, positionally ordered
/// parameter list (`columns.len() * rows.len()` values, row-major).
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Builds one bulk upsert statement for a batch of rows.
///
/// `ignore_errors` switches to `INSERT IGNORE`, letting the storage engine
/// drop duplicate/constraint-violating rows instead of aborting the batch.
/// The update clause re-assigns every column from the value proposed in this
/// statement, so conflicting rows always end up with the batch's values.
pub fn build_upsert_statement(
    formatted_table_name: &str,
    columns: &[String],
    update_columns: &[String],
    rows: &[Vec<Value>],
    ignore_errors: bool,
) -> Statement {
    let insert_command = if ignore_errors { "INSERT IGNORE INTO" } else { "INSERT INTO" };

    let placeholder_group =
        format!("({})", vec!["?"; columns.len()].join(", "));
    let placeholder_groups = vec![placeholder_group; rows.len()].join(", ");

    let sql = format!(
        "{} {} ({}) VALUES {} ON DUPLICATE KEY UPDATE {}",
        insert_command,
        formatted_table_name,
        columns.join(", "),
        placeholder_groups,
        update_columns.join(", "),
    );

    let mut params = Vec::with_capacity(columns.len() * rows.len());
    for row in rows {
        params.extend(row.iter().cloned());
    }

    Statement { sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::batch_upsert::{field, primary_key};

    fn sample_columns() -> (Vec<String>, Vec<String>) {
        let fields =
            vec![primary_key("id", 1i64), field("name", "a"), field("email", "a@example.com")];
        build_column_lists(&fields)
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("name"), "`name`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_format_table_name() {
        assert_eq!(format_table_name("users"), "`users`");
        assert_eq!(format_table_name("crm.users"), "`crm`.`users`");
    }

    #[test]
    fn test_column_lists_follow_selection_rule() {
        let fields = vec![
            primary_key("id", 0i64), // blank PK, skipped
            field("name", "a"),
            field("email", "a@example.com"),
        ];
        let (columns, update_columns) = build_column_lists(&fields);

        assert_eq!(columns, vec!["`name`", "`email`"]);
        assert_eq!(update_columns, vec!["`name`=VALUES(`name`)", "`email`=VALUES(`email`)"]);
    }

    #[test]
    fn test_statement_shape() {
        let (columns, update_columns) = sample_columns();
        let rows = vec![
            vec![Value::Int(1), Value::from("a"), Value::from("a@example.com")],
            vec![Value::Int(2), Value::from("b"), Value::from("b@example.com")],
        ];

        let statement =
            build_upsert_statement("`users`", &columns, &update_columns, &rows, false);

        assert_eq!(
            statement.sql,
            "INSERT INTO `users` (`id`, `name`, `email`) \
             VALUES (?, ?, ?), (?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
             `id`=VALUES(`id`), `name`=VALUES(`name`), `email`=VALUES(`email`)"
        );
        assert_eq!(statement.params.len(), 6);
        // Row-major order: first row's values precede the second row's.
        assert_eq!(statement.params[1], Value::from("a"));
        assert_eq!(statement.params[4], Value::from("b"));
    }

    #[test]
    fn test_ignore_errors_switches_insert_command() {
        let (columns, update_columns) = sample_columns();
        let rows = vec![vec![Value::Int(1), Value::from("a"), Value::from("a@example.com")]];

        let statement = build_upsert_statement("`users`", &columns, &update_columns, &rows, true);

        assert!(statement.sql.starts_with("INSERT IGNORE INTO `users` "));
    }

    #[test]
    fn test_one_update_assignment_per_column_in_order() {
        let (columns, update_columns) = sample_columns();
        assert_eq!(columns.len(), update_columns.len());
        for (column, update) in columns.iter().zip(&update_columns) {
            assert_eq!(update, &format!("{}=VALUES({})", column, column));
        }
    }
}
