//! Schema-version ladder (spec §4.3). `initialize_schema` always
//! creates the latest shape directly; migrations only run against a
//! store that predates the current binary, keyed off `PRAGMA
//! user_version`.

use super::SymbolDatabase;
use crate::error::Result;
use tracing::info;

const CURRENT_VERSION: i64 = 1;

impl SymbolDatabase {
    pub(super) fn run_migrations(&mut self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < CURRENT_VERSION {
            info!(from = version, to = CURRENT_VERSION, "migrating symbol store");
            // No prior versions exist yet; the ladder below is the slot
            // future migrations append to.
            self.conn
                .pragma_update(None, "user_version", CURRENT_VERSION)?;
        }

        Ok(())
    }
}
