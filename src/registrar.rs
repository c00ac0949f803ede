//! Warehouse table registrar
//!
//! Turns a directory of schema-description files into one table-creation
//! declaration per file. Nothing is executed against the warehouse; the
//! declarations are written out for the caller to run or pipe.

use crate::config::RegistrarConfig;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("Cannot read schema directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Schema file {0} has no usable table name")]
    UnnamedSchema(PathBuf),

    #[error("Failed to write declarations: {0}")]
    Write(#[source] io::Error),
}

/// `bq mk --table <project>:<dataset>.<table> <schema-file>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDeclaration {
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub schema_file: PathBuf,
}

impl TableDeclaration {
    pub fn qualified_table(&self) -> String {
        format!("{}:{}.{}", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bq mk --table {} {}",
            self.qualified_table(),
            self.schema_file.display()
        )
    }
}

/// One declaration per regular, non-hidden file in `schema_dir`, ordered by file name
///
/// The table name is the file name minus its last extension.
pub fn declarations_for_dir(
    config: &RegistrarConfig,
    schema_dir: impl AsRef<Path>,
) -> Result<Vec<TableDeclaration>, RegistrarError> {
    let schema_dir = schema_dir.as_ref();
    let read_dir_error = |source| RegistrarError::ReadDir {
        path: schema_dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(schema_dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let file_type = entry.file_type().map_err(read_dir_error)?;
        let is_hidden = entry.file_name().to_string_lossy().starts_with('.');

        // Follow symlinks to decide "regular file"
        let is_file = file_type.is_file()
            || (file_type.is_symlink() && entry.path().is_file());

        if is_file && !is_hidden {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    files
        .into_iter()
        .map(|schema_file| {
            let table = schema_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .filter(|stem| !stem.is_empty())
                .ok_or_else(|| RegistrarError::UnnamedSchema(schema_file.clone()))?;

            Ok(TableDeclaration {
                project: config.project.clone(),
                dataset: config.dataset.clone(),
                table,
                schema_file,
            })
        })
        .collect()
}

/// Write one declaration per line
pub fn write_declarations<W: Write>(
    out: &mut W,
    declarations: &[TableDeclaration],
) -> Result<(), RegistrarError> {
    for declaration in declarations {
        writeln!(out, "{}", declaration).map_err(RegistrarError::Write)?;
    }
    out.flush().map_err(RegistrarError::Write)
}
