//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::Utc;
use rusqlite::{params, Connection};
use sigflow::store::{apply_schema, open_database, SignatureKind, SourceKind};
use std::path::PathBuf;
use tempfile::TempDir;

pub const DAY: i64 = 86_400;

/// Wall clock, Unix seconds; the refresh trigger computes against it too
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// A file-backed base store in a throwaway directory
pub struct TestStore {
    pub dir: TempDir,
    pub db_path: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sigflow.db");

        let conn = open_database(&db_path).unwrap();
        apply_schema(&conn).unwrap();

        TestStore { dir, db_path }
    }

    pub fn connect(&self) -> Connection {
        open_database(&self.db_path).unwrap()
    }

    pub fn out_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn add_signature(conn: &Connection, text: &str, added_at: i64) -> i64 {
    conn.execute(
        "INSERT INTO signature (text, hash, added_at) VALUES (?1, ?2, ?3)",
        params![text, format!("hash:{}", text), added_at],
    )
    .unwrap();
    conn.last_insert_rowid()
}

/// Map a signature to a source and record its kind
///
/// `provenance` is the repository or contract id, ignored for 4byte.
pub fn map_signature(
    conn: &Connection,
    source: SourceKind,
    signature_id: i64,
    provenance: i64,
    kind: SignatureKind,
) {
    match source {
        SourceKind::Github => conn.execute(
            "INSERT INTO mapping_signature_github (signature_id, repository_id, kind, added_at)
             VALUES (?1, ?2, ?3, 0)",
            params![signature_id, provenance, kind],
        ),
        SourceKind::Etherscan => conn.execute(
            "INSERT INTO mapping_signature_etherscan (signature_id, contract_id, kind, added_at)
             VALUES (?1, ?2, ?3, 0)",
            params![signature_id, provenance, kind],
        ),
        SourceKind::Fourbyte => conn.execute(
            "INSERT INTO mapping_signature_fourbyte (signature_id, kind, added_at)
             VALUES (?1, ?2, 0)",
            params![signature_id, kind],
        ),
    }
    .unwrap();

    conn.execute(
        "INSERT OR IGNORE INTO mapping_signature_kind (signature_id, kind) VALUES (?1, ?2)",
        params![signature_id, kind],
    )
    .unwrap();
}

pub fn add_user(conn: &Connection, id: i64, login: &str) {
    conn.execute(
        "INSERT INTO github_user (id, login, html_url, added_at) VALUES (?1, ?2, ?3, 0)",
        params![id, login, format!("https://github.com/{}", login)],
    )
    .unwrap();
}

/// A repository owned by user 1, who must exist
pub fn add_repository(conn: &Connection, id: i64, name: &str) {
    conn.execute(
        "INSERT INTO github_repository
             (id, owner_id, name, html_url, language, stargazers_count, size,
              created_at, pushed_at, updated_at, added_at, solidity_ratio)
         VALUES (?1, 1, ?2, ?3, 'Solidity', 12, 340, 0, 0, 0, 0, 0.75)",
        params![id, name, format!("https://github.com/acme/{}", name)],
    )
    .unwrap();
}

pub fn add_contract(conn: &Connection, id: i64, address: &str) {
    conn.execute(
        "INSERT INTO etherscan_contract
             (id, address, name, compiler, compiler_version, url, added_at)
         VALUES (?1, ?2, 'Token', 'solc', 'v0.8.24', ?3, 0)",
        params![id, address, format!("https://etherscan.io/address/{}", address)],
    )
    .unwrap();
}

/// A small corpus where every signature has exactly one kind
pub fn seed_corpus(conn: &Connection) {
    let now = now();
    add_user(conn, 1, "acme");
    add_repository(conn, 1, "token");
    add_repository(conn, 2, "vault");
    add_contract(conn, 7, "0x00000000000000000000000000000000000000a7");

    let transfer = add_signature(conn, "transfer(address,uint256)", now - DAY);
    let approval = add_signature(conn, "Approval(address,address,uint256)", now - 2 * DAY);
    let unauthorized = add_signature(conn, "Unauthorized()", now - 9 * DAY);
    let deposit = add_signature(conn, "deposit()", now - 40 * DAY);

    map_signature(conn, SourceKind::Github, transfer, 1, SignatureKind::Function);
    map_signature(conn, SourceKind::Github, transfer, 2, SignatureKind::Function);
    map_signature(conn, SourceKind::Etherscan, transfer, 7, SignatureKind::Function);
    map_signature(conn, SourceKind::Github, approval, 1, SignatureKind::Event);
    map_signature(conn, SourceKind::Fourbyte, unauthorized, 0, SignatureKind::Error);
    map_signature(conn, SourceKind::Fourbyte, deposit, 0, SignatureKind::Function);
}
