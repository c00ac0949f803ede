//! Row extraction and flat-file encoding for one table

use super::escape::{escape_nullable_field_into, FIELD_DELIMITER, RECORD_TERMINATOR};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::io::Write;
use thiserror::Error;

const BLOB_PREFIX: &[u8] = b"\\x";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Raw bytes of one column value, before escaping
///
/// Returns false for NULL, which has no bytes of its own. REAL uses the
/// shortest text that parses back to the same f64. BLOB renders as `\x`
/// followed by lowercase hex.
pub fn render_value(value: ValueRef<'_>, out: &mut Vec<u8>) -> bool {
    out.clear();
    match value {
        ValueRef::Null => return false,
        ValueRef::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        ValueRef::Real(f) => out.extend_from_slice(f.to_string().as_bytes()),
        ValueRef::Text(bytes) => out.extend_from_slice(bytes),
        ValueRef::Blob(bytes) => {
            out.extend_from_slice(BLOB_PREFIX);
            out.extend_from_slice(hex::encode(bytes).as_bytes());
        }
    }
    true
}

/// `SELECT *` over the table in a total order, so reruns are byte-identical
///
/// Ordered by the primary key when the table has one, by every column
/// otherwise.
fn select_all_sql(conn: &Connection, table: &str) -> rusqlite::Result<String> {
    let quoted = quote_identifier(table);

    let mut stmt =
        conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")?;
    let key_columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let order_by = if key_columns.is_empty() {
        let column_count = conn.prepare(&format!("SELECT * FROM {}", quoted))?.column_count();
        (1..=column_count)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        key_columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    Ok(format!("SELECT * FROM {} ORDER BY {}", quoted, order_by))
}

/// Stream every row of `table` into `out`, one framed line per row
///
/// Returns the number of rows written.
pub fn write_table<W: Write>(conn: &Connection, table: &str, out: &mut W) -> Result<u64, ExtractError> {
    let sql = select_all_sql(conn, table)?;
    let mut stmt = conn.prepare(&sql)?;
    let column_count = stmt.column_count();

    let mut field = Vec::new();
    let mut line = Vec::new();
    let mut written = 0u64;

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        line.clear();
        for i in 0..column_count {
            if i > 0 {
                line.push(FIELD_DELIMITER);
            }
            let present = render_value(row.get_ref(i)?, &mut field);
            escape_nullable_field_into(&mut line, present.then_some(field.as_slice()));
        }
        line.push(RECORD_TERMINATOR);

        out.write_all(&line)?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::escape::{split_line, unescape_field, unescape_nullable_field};

    struct EncodedTable {
        body: Vec<u8>,
        rows: u64,
    }

    fn encode_table(conn: &Connection, table: &str) -> Result<EncodedTable, ExtractError> {
        let mut body = Vec::new();
        let rows = write_table(conn, table, &mut body)?;
        Ok(EncodedTable { body, rows })
    }

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sample (id INTEGER, label TEXT, score REAL, payload BLOB);
             INSERT INTO sample VALUES (2, 'tab\there', 0.5, x'00ff');
             INSERT INTO sample VALUES (1, 'cr\rhere', NULL, NULL);
             INSERT INTO sample VALUES (3, NULL, 2.0, x'');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_rows_ordered_and_rendered() {
        let conn = fixture();

        let encoded = encode_table(&conn, "sample").unwrap();

        assert_eq!(encoded.rows, 3);
        let expected: &[u8] = b"1\tcr\\rhere\t\\N\t\\N\n\
                                 2\ttab\\there\t0.5\t\\\\x00ff\n\
                                 3\t\\N\t2\t\\\\x\n";
        assert_eq!(encoded.body, expected);
    }

    #[test]
    fn test_field_count_survives_embedded_delimiters() {
        let conn = fixture();
        let encoded = encode_table(&conn, "sample").unwrap();

        for line in encoded.body.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
            assert_eq!(split_line(line).len(), 4);
        }

        let first = encoded.body.split(|&b| b == b'\n').next().unwrap();
        let label = unescape_field(split_line(first)[1]).unwrap();
        assert_eq!(label, b"cr\rhere".to_vec());
    }

    #[test]
    fn test_null_and_empty_text_differ() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT);
             INSERT INTO t VALUES (1, NULL), (2, ''), (3, '\\N');",
        )
        .unwrap();

        let encoded = encode_table(&conn, "t").unwrap();
        let notes: Vec<Option<Vec<u8>>> = encoded
            .body
            .split(|&b| b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|line| unescape_nullable_field(split_line(line)[1]).unwrap())
            .collect();

        assert_eq!(notes, vec![None, Some(Vec::new()), Some(b"\\N".to_vec())]);
    }

    #[test]
    fn test_ordered_by_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE m (label TEXT, a INTEGER, b INTEGER, PRIMARY KEY (b, a));
             INSERT INTO m VALUES ('z', 1, 2), ('y', 2, 1), ('x', 1, 1);",
        )
        .unwrap();

        let encoded = encode_table(&conn, "m").unwrap();
        assert_eq!(encoded.body, b"x\t1\t1\ny\t2\t1\nz\t1\t2\n".to_vec());
    }

    #[test]
    fn test_empty_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE empty (a TEXT)").unwrap();

        let encoded = encode_table(&conn, "empty").unwrap();
        assert_eq!(encoded.rows, 0);
        assert!(encoded.body.is_empty());
    }

    #[test]
    fn test_quoted_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "odd ""name""" (a INTEGER);
               INSERT INTO "odd ""name""" VALUES (7);"#,
        )
        .unwrap();

        let encoded = encode_table(&conn, "odd \"name\"").unwrap();
        assert_eq!(encoded.body, b"7\n".to_vec());
    }

    #[test]
    fn test_missing_table_is_database_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            encode_table(&conn, "nope"),
            Err(ExtractError::Database(_))
        ));
    }
}
