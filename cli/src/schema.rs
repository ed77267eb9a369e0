//! Declared schema loading
//!
//! The declared schema arrives as one or more snapshot JSON files exported by
//! the schema definitions. Several files are merged into one snapshot.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

use drizzle_migrations::{MigrationError, Snapshot};

use crate::config::Config;
use crate::error::CliError;

/// Load, merge and validate the declared schema
pub fn load_declared(config: &Config) -> Result<Snapshot, CliError> {
    let dialect = config.base_dialect();
    let mut merged: Option<Snapshot> = None;

    for path in config.schema_files()? {
        let snapshot = Snapshot::load(&path)?;
        if snapshot.dialect != dialect {
            return Err(CliError::Schema(format!(
                "{} is a {} snapshot but the config dialect is {}",
                path.display(),
                snapshot.dialect,
                dialect
            )));
        }
        merged = Some(match merged {
            None => snapshot,
            Some(mut acc) => {
                merge_into(&mut acc, snapshot, &path)?;
                acc
            }
        });
    }

    let declared = merged.ok_or_else(|| CliError::Schema(config.schema_display()))?;
    declared.validate().map_err(MigrationError::from)?;
    Ok(declared)
}

fn merge_into(acc: &mut Snapshot, other: Snapshot, path: &Path) -> Result<(), CliError> {
    merge_map(&mut acc.tables, other.tables, "table", path)?;
    merge_map(&mut acc.sequences, other.sequences, "sequence", path)?;
    merge_map(&mut acc.enums, other.enums, "enum", path)?;
    acc.schemas.extend(other.schemas);
    Ok(())
}

fn merge_map<T>(
    into: &mut BTreeMap<String, T>,
    from: BTreeMap<String, T>,
    kind: &str,
    path: &Path,
) -> Result<(), CliError> {
    for (key, value) in from {
        match into.entry(key) {
            Entry::Occupied(e) => {
                return Err(CliError::Schema(format!(
                    "{kind} `{}` in {} is already declared",
                    e.key(),
                    path.display()
                )));
            }
            Entry::Vacant(e) => {
                e.insert(value);
            }
        }
    }
    Ok(())
}
