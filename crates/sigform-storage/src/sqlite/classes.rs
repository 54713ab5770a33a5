//! Class catalog synchronization and lookup.
//!
//! Primitive classes live across forms; the database keeps one row per
//! class plus its argument and slot declarations. On save the catalog
//! is synchronized from the registry so that every value row written
//! for an object can reference the declaration it instantiates.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use sigform_core::registry::{ClassDescriptor, Registry};

use crate::error::{Result, StorageError};

/// Rowids of one class and its declarations, keyed by name.
pub(crate) struct ClassRows {
    pub class_id: i64,
    pub arguments: BTreeMap<String, i64>,
    pub input_params: BTreeMap<String, i64>,
    pub input_points: BTreeMap<String, i64>,
    pub output_params: BTreeMap<String, i64>,
}

/// Ensures rows exist for every class in the registry.
///
/// Existing rows are kept; a stored class whose kind differs from the
/// registered one is a constraint violation.
pub(crate) fn sync_classes_on_conn(conn: &Connection, registry: &Registry) -> Result<()> {
    for descriptor in registry.classes() {
        ensure_class_on_conn(conn, descriptor)?;
    }
    Ok(())
}

/// Ensures one class row (and its declarations) exists, returning its id.
pub(crate) fn ensure_class_on_conn(conn: &Connection, descriptor: &ClassDescriptor) -> Result<i64> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, kind FROM class WHERE name = ?1",
            params![descriptor.name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let class_id = match existing {
        Some((id, kind)) => {
            if kind != descriptor.kind().as_str() {
                return Err(StorageError::constraint(format!(
                    "class {:?} is stored as {kind} but registered as {}",
                    descriptor.name,
                    descriptor.kind()
                )));
            }
            id
        }
        None => {
            debug!(class = %descriptor.name, kind = %descriptor.kind(), "storing class");
            conn.execute(
                "INSERT INTO class (name, kind, comment) VALUES (?1, ?2, ?3)",
                params![
                    descriptor.name,
                    descriptor.kind().as_str(),
                    descriptor.comment
                ],
            )?;
            conn.last_insert_rowid()
        }
    };

    for arg in &descriptor.arguments {
        conn.execute(
            "INSERT OR IGNORE INTO argument_to_class
                 (class_id, name, data_type, default_value, comment)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![class_id, arg.name, arg.ty.as_str(), arg.default, arg.comment],
        )?;
    }
    for (table, slots) in [
        ("input_param_to_class", &descriptor.input_params),
        ("input_point_to_class", &descriptor.input_points),
        ("output_param_to_class", &descriptor.output_params),
    ] {
        for slot in slots {
            conn.execute(
                &format!("INSERT OR IGNORE INTO {table} (class_id, name) VALUES (?1, ?2)"),
                params![class_id, slot],
            )?;
        }
    }

    Ok(class_id)
}

/// Loads the rowids of a class and its declarations by class name.
pub(crate) fn class_rows_on_conn(conn: &Connection, name: &str) -> Result<ClassRows> {
    let class_id: i64 = conn
        .query_row("SELECT id FROM class WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()?
        .ok_or_else(|| StorageError::not_found("class", name))?;

    let mut rows = ClassRows {
        class_id,
        arguments: BTreeMap::new(),
        input_params: BTreeMap::new(),
        input_points: BTreeMap::new(),
        output_params: BTreeMap::new(),
    };
    let mut stmt =
        conn.prepare("SELECT name, id FROM argument_to_class WHERE class_id = ?1")?;
    for entry in stmt.query_map(params![class_id], |row| Ok((row.get(0)?, row.get(1)?)))? {
        let (name, id): (String, i64) = entry?;
        rows.arguments.insert(name, id);
    }
    for (table, map) in [
        ("input_param_to_class", &mut rows.input_params),
        ("input_point_to_class", &mut rows.input_points),
        ("output_param_to_class", &mut rows.output_params),
    ] {
        let mut stmt =
            conn.prepare(&format!("SELECT name, id FROM {table} WHERE class_id = ?1"))?;
        for entry in stmt.query_map(params![class_id], |row| Ok((row.get(0)?, row.get(1)?)))? {
            let (name, id): (String, i64) = entry?;
            map.insert(name, id);
        }
    }
    Ok(rows)
}

/// Name and kind of the class a stored object instantiates.
pub(crate) fn class_of_object_on_conn(conn: &Connection, object_id: i64) -> Result<(String, String)> {
    conn.query_row(
        "SELECT class.name, class.kind
           FROM object JOIN class ON class.id = object.class_id
          WHERE object.id = ?1",
        params![object_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("object", object_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::store::SqliteStore;
    use sigform_core::builtins;
    use sigform_core::coerce::{ArgSpec, ArgType};
    use sigform_core::registry::Constructor;

    #[test]
    fn sync_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let registry = builtins::standard_registry();
        let conn = store.lock_conn().unwrap();
        sync_classes_on_conn(&conn, &registry).unwrap();
        sync_classes_on_conn(&conn, &registry).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM class", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, registry.classes().count());
    }

    #[test]
    fn declarations_are_stored() {
        let store = SqliteStore::open_in_memory().unwrap();
        let registry = builtins::standard_registry();
        let conn = store.lock_conn().unwrap();
        sync_classes_on_conn(&conn, &registry).unwrap();

        let rows = class_rows_on_conn(&conn, "Interval").unwrap();
        assert!(rows.input_points.contains_key("from"));
        assert!(rows.input_points.contains_key("to"));
        assert!(rows.output_params.contains_key("interval"));

        let rows = class_rows_on_conn(&conn, "Gain").unwrap();
        assert!(rows.arguments.contains_key("factor"));
    }

    #[test]
    fn kind_change_is_a_constraint_violation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();

        #[derive(Debug)]
        struct Nothing;
        impl sigform_core::registry::PointSelector for Nothing {
            fn select(
                &self,
                _signal: &sigform_core::signal::Signal,
            ) -> std::result::Result<Vec<f64>, sigform_core::registry::PrimitiveError> {
                Ok(vec![])
            }
        }

        let as_selector = ClassDescriptor::new(
            "Shifty",
            Constructor::Selector(Box::new(|_| Ok(Box::new(Nothing)))),
        )
        .with_argument(ArgSpec::new("n", ArgType::Int).with_default("1"));
        ensure_class_on_conn(&conn, &as_selector).unwrap();

        #[derive(Debug)]
        struct Noop;
        impl sigform_core::registry::SignalModifier for Noop {
            fn apply(
                &self,
                signal: &sigform_core::signal::Signal,
            ) -> std::result::Result<sigform_core::signal::Signal, sigform_core::registry::PrimitiveError>
            {
                Ok(signal.clone())
            }
        }
        let as_modifier = ClassDescriptor::new(
            "Shifty",
            Constructor::Modifier(Box::new(|_| Ok(Box::new(Noop)))),
        );
        let err = ensure_class_on_conn(&conn, &as_modifier).unwrap_err();
        assert!(err.is_constraint());
    }
}
