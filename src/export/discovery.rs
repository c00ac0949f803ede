//! Exportable table discovery

use rusqlite::Connection;

/// Tables whose name starts with this are internal and never exported
pub const RESERVED_TABLE_PREFIX: char = '_';

/// Every user table visible in the column catalog, ordered by name
///
/// SQLite bookkeeping tables (`sqlite_sequence`, `sqlite_stat1`, ...) and
/// reserved-prefix tables are left out. Views are not tables and are skipped.
pub fn list_exportable_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r"SELECT DISTINCT m.name
          FROM sqlite_master AS m
          JOIN pragma_table_info(m.name) AS c
          WHERE m.type = 'table'
            AND m.name NOT LIKE 'sqlite\_%' ESCAPE '\'
          ORDER BY m.name ASC",
    )?;

    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut tables = Vec::new();
    for name in names {
        let name = name?;
        if is_reserved(&name) {
            log::debug!("   ├─ skipping internal table {}", name);
            continue;
        }
        tables.push(name);
    }

    Ok(tables)
}

pub fn is_reserved(table: &str) -> bool {
    table.starts_with(RESERVED_TABLE_PREFIX)
}
