//! Statement builders.
//!
//! Table and column names cannot be bind parameters, so they are spliced into
//! the statement text, always double-quoted so the statement names exactly
//! the relation the catalog listed. Callers must only pass table names
//! resolved through the [`crate::catalog::TableCatalog`] and column names
//! taken from a record descriptor; every value travels as a positional `$n`
//! parameter.

use crate::record::Field;

/// Lists the base tables of one schema.
pub const CATALOG_QUERY: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";

/// PostgreSQL truncates identifiers beyond this length.
const MAX_IDENTIFIER_LEN: usize = 63;

/// `true` for identifiers that need no quoting: ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote an identifier, doubling any embedded quote.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

fn column_list<'a>(fields: impl IntoIterator<Item = &'a Field>) -> String {
    fields
        .into_iter()
        .map(|f| quote(f.column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn select_all(schema: &str, table: &str, fields: &[Field]) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(fields),
        qualified(schema, table),
        quote(fields[0].column)
    )
}

pub fn select_by_id(schema: &str, table: &str, fields: &[Field], id_column: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1",
        column_list(fields),
        qualified(schema, table),
        quote(id_column)
    )
}

/// Insert every field but the identifier, letting the table's identity
/// column assign the key.
pub fn insert(schema: &str, table: &str, fields: &[Field]) -> String {
    let data = &fields[1..];
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        qualified(schema, table),
        column_list(data),
        placeholders(data.len()),
        quote(fields[0].column)
    )
}

/// Insert every field, identifier included.
pub fn insert_all(schema: &str, table: &str, fields: &[Field]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified(schema, table),
        column_list(fields),
        placeholders(fields.len())
    )
}

/// Update every field but the identifier; the id is bound last.
pub fn update(schema: &str, table: &str, fields: &[Field], id_column: &str) -> String {
    let data = &fields[1..];
    let assignments = data
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = ${}", quote(f.column), i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {assignments} WHERE {} = ${}",
        qualified(schema, table),
        quote(id_column),
        data.len() + 1
    )
}

pub fn delete(schema: &str, table: &str, id_column: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = $1",
        qualified(schema, table),
        quote(id_column)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldType;

    const FIELDS: &[Field] = &[
        Field::new("unit_id", FieldType::Int),
        Field::new("name", FieldType::Text),
        Field::new("city", FieldType::Text),
    ];

    #[test]
    fn select_statements() {
        assert_eq!(
            select_all("smidgen", "businessunit", FIELDS),
            r#"SELECT "unit_id", "name", "city" FROM "smidgen"."businessunit" ORDER BY "unit_id""#
        );
        assert_eq!(
            select_by_id("smidgen", "businessunit", FIELDS, "unit_id"),
            r#"SELECT "unit_id", "name", "city" FROM "smidgen"."businessunit" WHERE "unit_id" = $1"#
        );
    }

    #[test]
    fn insert_skips_identifier_and_returns_it() {
        assert_eq!(
            insert("smidgen", "businessunit", FIELDS),
            r#"INSERT INTO "smidgen"."businessunit" ("name", "city") VALUES ($1, $2) RETURNING "unit_id""#
        );
        assert_eq!(
            insert_all("smidgen", "businessunit", FIELDS),
            r#"INSERT INTO "smidgen"."businessunit" ("unit_id", "name", "city") VALUES ($1, $2, $3)"#
        );
    }

    #[test]
    fn update_binds_identifier_last() {
        assert_eq!(
            update("smidgen", "businessunit", FIELDS, "unit_id"),
            r#"UPDATE "smidgen"."businessunit" SET "name" = $1, "city" = $2 WHERE "unit_id" = $3"#
        );
    }

    #[test]
    fn delete_statement() {
        assert_eq!(
            delete("smidgen", "equipment", "equipment_id"),
            r#"DELETE FROM "smidgen"."equipment" WHERE "equipment_id" = $1"#
        );
    }

    #[test]
    fn mixed_case_tables_keep_their_spelling() {
        assert_eq!(
            select_all("smidgen", "AuditLog", FIELDS),
            r#"SELECT "unit_id", "name", "city" FROM "smidgen"."AuditLog" ORDER BY "unit_id""#
        );
        assert_eq!(quote(r#"odd"name"#), r#""odd""name""#);
    }

    #[test]
    fn plain_identifiers() {
        for ok in ["smidgen", "equipment_assignment", "_x1", "BusinessUnit"] {
            assert!(is_plain_identifier(ok), "{ok}");
        }
        let too_long = "a".repeat(64);
        for bad in ["", "1table", "a-b", "a b", "x;drop", "\"quoted\"", too_long.as_str()] {
            assert!(!is_plain_identifier(bad), "{bad}");
        }
    }
}
