//! Form graph persistence.
//!
//! A save writes the whole form graph inside one transaction: the form
//! row, its points and parameters, steps and tracks in order, and every
//! primitive object with its argument and slot bindings. Local model
//! identifiers are remapped to rowids on the way in and back on the way
//! out, so a loaded form carries database identifiers everywhere.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use sigform_core::form::{Bound, Form, ObjectId, ParamId, Point, PointId, PrimitiveObject, Step, Track};
use sigform_core::form::Parameter;
use sigform_core::registry::{ClassKind, Registry};

use crate::error::{Result, StorageError};
use crate::sqlite::classes;
use crate::traits::FormSummary;

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

struct IdMaps {
    points: BTreeMap<PointId, i64>,
    params: BTreeMap<ParamId, i64>,
}

impl IdMaps {
    fn point(&self, id: PointId) -> Result<i64> {
        self.points.get(&id).copied().ok_or_else(|| {
            StorageError::constraint(format!("point {id} is not declared on the form"))
        })
    }

    fn param(&self, id: ParamId) -> Result<i64> {
        self.params.get(&id).copied().ok_or_else(|| {
            StorageError::constraint(format!("parameter {id} is not declared on the form"))
        })
    }
}

/// Saves a form, inserting it or rewriting the stored graph in place.
///
/// Must run inside a transaction. Returns the form's rowid.
pub(crate) fn save_form_on_conn(conn: &Connection, form: &Form, registry: &Registry) -> Result<i64> {
    for object in form.objects() {
        if !registry.contains(&object.class) {
            return Err(StorageError::UnregisteredClass {
                name: object.class.clone(),
                detail: format!(", required by {}", object.label()),
            });
        }
    }
    classes::sync_classes_on_conn(conn, registry)?;

    let form_id = match form.id {
        Some(id) => {
            let exists: Option<i64> = conn
                .query_row("SELECT id FROM form WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()?;
            if exists.is_none() {
                return Err(StorageError::not_found("form", id));
            }
            delete_children_on_conn(conn, id)?;
            conn.execute(
                "UPDATE form
                    SET name = ?2, comment = ?3, picture_path = ?4, dataset_path = ?5,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                  WHERE id = ?1",
                params![id, form.name, form.comment, form.picture_path, form.dataset_path],
            )?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO form (name, comment, picture_path, dataset_path)
                 VALUES (?1, ?2, ?3, ?4)",
                params![form.name, form.comment, form.picture_path, form.dataset_path],
            )?;
            conn.last_insert_rowid()
        }
    };
    debug!(form = %form.name, id = form_id, "saving form graph");

    let mut maps = IdMaps {
        points: BTreeMap::new(),
        params: BTreeMap::new(),
    };
    for point in &form.points {
        conn.execute(
            "INSERT INTO point (form_id, name, comment) VALUES (?1, ?2, ?3)",
            params![form_id, point.name, point.comment],
        )?;
        maps.points.insert(point.id, conn.last_insert_rowid());
    }
    for param in &form.parameters {
        conn.execute(
            "INSERT INTO parameter (form_id, name, comment, weight) VALUES (?1, ?2, ?3, ?4)",
            params![form_id, param.name, param.comment, param.weight],
        )?;
        maps.params.insert(param.id, conn.last_insert_rowid());
    }

    let mut class_cache: BTreeMap<String, classes::ClassRows> = BTreeMap::new();

    for (step_index, step) in form.steps.iter().enumerate() {
        let left_anchor = step.left.anchor.map(|p| maps.point(p)).transpose()?;
        let right_anchor = step.right.anchor.map(|p| maps.point(p)).transpose()?;
        conn.execute(
            "INSERT INTO step
                 (form_id, number_in_form, target_point_id,
                  left_point_id, left_padding, right_point_id, right_padding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                form_id,
                step_index as i64 + 1,
                maps.point(step.target)?,
                left_anchor,
                step.left.padding,
                right_anchor,
                step.right.padding,
            ],
        )?;
        let step_id = conn.last_insert_rowid();

        for (track_index, track) in step.tracks.iter().enumerate() {
            conn.execute(
                "INSERT INTO track (step_id, number_in_step) VALUES (?1, ?2)",
                params![step_id, track_index as i64 + 1],
            )?;
            let track_id = conn.last_insert_rowid();

            let placed = track.modifiers.iter().chain(track.selectors.iter());
            for (object_index, object) in placed.enumerate() {
                insert_object_on_conn(
                    conn,
                    form_id,
                    Some((track_id, object_index as i64 + 1)),
                    object,
                    &maps,
                    &mut class_cache,
                )?;
            }
        }
    }

    for (table, objects) in [
        ("pc_object_to_form", &form.calculators),
        ("hc_object_to_form", &form.conditions),
    ] {
        for (index, object) in objects.iter().enumerate() {
            let object_id =
                insert_object_on_conn(conn, form_id, None, object, &maps, &mut class_cache)?;
            conn.execute(
                &format!(
                    "INSERT INTO {table} (form_id, object_id, number_in_form) VALUES (?1, ?2, ?3)"
                ),
                params![form_id, object_id, index as i64 + 1],
            )?;
        }
    }

    Ok(form_id)
}

/// Inserts one primitive object and its argument and slot value rows.
fn insert_object_on_conn(
    conn: &Connection,
    form_id: i64,
    placement: Option<(i64, i64)>,
    object: &PrimitiveObject,
    maps: &IdMaps,
    class_cache: &mut BTreeMap<String, classes::ClassRows>,
) -> Result<i64> {
    if !class_cache.contains_key(&object.class) {
        let rows = classes::class_rows_on_conn(conn, &object.class)?;
        class_cache.insert(object.class.clone(), rows);
    }
    let class_rows = &class_cache[&object.class];

    let (track_id, number_in_track) = match placement {
        Some((track, number)) => (Some(track), Some(number)),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO object (class_id, form_id, track_id, number_in_track)
         VALUES (?1, ?2, ?3, ?4)",
        params![class_rows.class_id, form_id, track_id, number_in_track],
    )?;
    let object_id = conn.last_insert_rowid();

    for (name, value) in &object.arguments {
        let argument_id = class_rows.arguments.get(name).ok_or_else(|| {
            StorageError::constraint(format!(
                "class {:?} declares no argument {name:?}",
                object.class
            ))
        })?;
        conn.execute(
            "INSERT INTO value_to_argument (object_id, argument_id, value) VALUES (?1, ?2, ?3)",
            params![object_id, argument_id, value],
        )?;
    }
    for (slot, param) in &object.input_params {
        let slot_id = class_rows.input_params.get(slot).ok_or_else(|| {
            StorageError::constraint(format!(
                "class {:?} declares no input-parameter slot {slot:?}",
                object.class
            ))
        })?;
        conn.execute(
            "INSERT INTO value_to_input_param (object_id, input_param_id, parameter_id)
             VALUES (?1, ?2, ?3)",
            params![object_id, slot_id, maps.param(*param)?],
        )?;
    }
    for (slot, point) in &object.input_points {
        let slot_id = class_rows.input_points.get(slot).ok_or_else(|| {
            StorageError::constraint(format!(
                "class {:?} declares no input-point slot {slot:?}",
                object.class
            ))
        })?;
        conn.execute(
            "INSERT INTO value_to_input_point (object_id, input_point_id, point_id)
             VALUES (?1, ?2, ?3)",
            params![object_id, slot_id, maps.point(*point)?],
        )?;
    }
    for (slot, param) in &object.output_params {
        let slot_id = class_rows.output_params.get(slot).ok_or_else(|| {
            StorageError::constraint(format!(
                "class {:?} declares no output-parameter slot {slot:?}",
                object.class
            ))
        })?;
        conn.execute(
            "INSERT INTO value_to_output_param (object_id, output_param_id, parameter_id)
             VALUES (?1, ?2, ?3)",
            params![object_id, slot_id, maps.param(*param)?],
        )?;
    }

    Ok(object_id)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Loads a form by rowid, verifying every object's class against the
/// registry.
pub(crate) fn load_form_on_conn(conn: &Connection, id: i64, registry: &Registry) -> Result<Form> {
    let row: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT name, comment, picture_path, dataset_path FROM form WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;
    let (name, comment, picture_path, dataset_path) =
        row.ok_or_else(|| StorageError::not_found("form", id))?;

    let mut form = Form::new(name);
    form.id = Some(id);
    form.comment = comment;
    form.picture_path = picture_path;
    form.dataset_path = dataset_path;

    let mut stmt =
        conn.prepare("SELECT id, name, comment FROM point WHERE form_id = ?1 ORDER BY id")?;
    for entry in stmt.query_map(params![id], |row| {
        Ok(Point {
            id: PointId(row.get(0)?),
            name: row.get(1)?,
            comment: row.get(2)?,
        })
    })? {
        form.points.push(entry?);
    }

    let mut stmt = conn
        .prepare("SELECT id, name, comment, weight FROM parameter WHERE form_id = ?1 ORDER BY id")?;
    for entry in stmt.query_map(params![id], |row| {
        Ok(Parameter {
            id: ParamId(row.get(0)?),
            name: row.get(1)?,
            comment: row.get(2)?,
            weight: row.get(3)?,
        })
    })? {
        form.parameters.push(entry?);
    }

    let mut stmt = conn.prepare(
        "SELECT id, target_point_id, left_point_id, left_padding, right_point_id, right_padding
           FROM step WHERE form_id = ?1 ORDER BY number_in_form",
    )?;
    let step_rows: Vec<(i64, i64, Option<i64>, Option<f64>, Option<i64>, Option<f64>)> = stmt
        .query_map(params![id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<std::result::Result<_, _>>()?;

    for (step_id, target, left_anchor, left_padding, right_anchor, right_padding) in step_rows {
        let mut step = Step {
            target: PointId(target),
            left: load_bound(left_anchor, left_padding),
            right: load_bound(right_anchor, right_padding),
            tracks: Vec::new(),
        };

        let mut stmt = conn
            .prepare("SELECT id FROM track WHERE step_id = ?1 ORDER BY number_in_step")?;
        let track_ids: Vec<i64> = stmt
            .query_map(params![step_id], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        for track_id in track_ids {
            let mut track = Track::default();
            let mut stmt = conn.prepare(
                "SELECT id FROM object WHERE track_id = ?1 ORDER BY number_in_track",
            )?;
            let object_ids: Vec<i64> = stmt
                .query_map(params![track_id], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?;

            for object_id in object_ids {
                let (object, kind) = load_object_on_conn(conn, object_id, registry)?;
                match kind {
                    ClassKind::Modifier => track.modifiers.push(object),
                    ClassKind::Selector => track.selectors.push(object),
                    other => {
                        return Err(StorageError::constraint(format!(
                            "object {} is a {other}, tracks hold modifiers and selectors only",
                            object.label()
                        )));
                    }
                }
            }
            step.tracks.push(track);
        }
        form.steps.push(step);
    }

    for object_id in numbered_objects_on_conn(conn, "pc_object_to_form", id)? {
        let (object, kind) = load_object_on_conn(conn, object_id, registry)?;
        if kind != ClassKind::Calculator {
            return Err(StorageError::constraint(format!(
                "object {} is a {kind}, expected a calculator",
                object.label()
            )));
        }
        form.calculators.push(object);
    }
    for object_id in numbered_objects_on_conn(conn, "hc_object_to_form", id)? {
        let (object, kind) = load_object_on_conn(conn, object_id, registry)?;
        if kind != ClassKind::Condition {
            return Err(StorageError::constraint(format!(
                "object {} is a {kind}, expected a condition",
                object.label()
            )));
        }
        form.conditions.push(object);
    }

    Ok(form)
}

fn numbered_objects_on_conn(conn: &Connection, table: &str, form_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT object_id FROM {table} WHERE form_id = ?1 ORDER BY number_in_form"
    ))?;
    let ids = stmt
        .query_map(params![form_id], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;
    Ok(ids)
}

fn load_bound(anchor: Option<i64>, padding: Option<f64>) -> Bound {
    Bound {
        anchor: anchor.map(PointId),
        padding,
    }
}

/// Loads one primitive object with its argument and slot bindings.
fn load_object_on_conn(
    conn: &Connection,
    object_id: i64,
    registry: &Registry,
) -> Result<(PrimitiveObject, ClassKind)> {
    let (class_name, kind) = classes::class_of_object_on_conn(conn, object_id)?;
    let kind = ClassKind::parse(&kind)
        .ok_or_else(|| StorageError::Backing(format!("unknown class kind {kind:?} stored")))?;

    let descriptor = registry.get(&class_name).map_err(|_| {
        StorageError::UnregisteredClass {
            name: class_name.clone(),
            detail: format!(", required by stored object {object_id}"),
        }
    })?;
    if descriptor.kind() != kind {
        return Err(StorageError::UnregisteredClass {
            name: class_name.clone(),
            detail: format!(
                " as a {kind}; the registered class is a {}",
                descriptor.kind()
            ),
        });
    }

    let mut object = PrimitiveObject::new(ObjectId(object_id), class_name);

    let mut stmt = conn.prepare(
        "SELECT a.name, v.value
           FROM value_to_argument v JOIN argument_to_class a ON a.id = v.argument_id
          WHERE v.object_id = ?1",
    )?;
    for entry in stmt.query_map(params![object_id], |row| Ok((row.get(0)?, row.get(1)?)))? {
        let (name, value): (String, String) = entry?;
        object.arguments.insert(name, value);
    }

    let mut stmt = conn.prepare(
        "SELECT d.name, v.parameter_id
           FROM value_to_input_param v JOIN input_param_to_class d ON d.id = v.input_param_id
          WHERE v.object_id = ?1",
    )?;
    for entry in stmt.query_map(params![object_id], |row| Ok((row.get(0)?, row.get(1)?)))? {
        let (slot, param): (String, i64) = entry?;
        object.input_params.insert(slot, ParamId(param));
    }

    let mut stmt = conn.prepare(
        "SELECT d.name, v.point_id
           FROM value_to_input_point v JOIN input_point_to_class d ON d.id = v.input_point_id
          WHERE v.object_id = ?1",
    )?;
    for entry in stmt.query_map(params![object_id], |row| Ok((row.get(0)?, row.get(1)?)))? {
        let (slot, point): (String, i64) = entry?;
        object.input_points.insert(slot, PointId(point));
    }

    let mut stmt = conn.prepare(
        "SELECT d.name, v.parameter_id
           FROM value_to_output_param v JOIN output_param_to_class d ON d.id = v.output_param_id
          WHERE v.object_id = ?1",
    )?;
    for entry in stmt.query_map(params![object_id], |row| Ok((row.get(0)?, row.get(1)?)))? {
        let (slot, param): (String, i64) = entry?;
        object.output_params.insert(slot, ParamId(param));
    }

    Ok((object, kind))
}

/// Resolves a form name to its rowid.
pub(crate) fn form_id_by_name_on_conn(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM form WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| StorageError::not_found("form", name))
}

// ---------------------------------------------------------------------------
// Delete / list
// ---------------------------------------------------------------------------

/// Deletes a form and its whole graph. Children go first; the schema
/// declares no cascades.
pub(crate) fn delete_form_on_conn(conn: &Connection, id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM form WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(StorageError::not_found("form", id));
    }

    delete_children_on_conn(conn, id)?;
    conn.execute("DELETE FROM form WHERE id = ?1", params![id])?;
    debug!(form_id = id, "deleted form");
    Ok(())
}

/// Removes every row owned by a form, leaving the form row itself.
fn delete_children_on_conn(conn: &Connection, id: i64) -> Result<()> {
    for table in [
        "value_to_argument",
        "value_to_input_param",
        "value_to_input_point",
        "value_to_output_param",
    ] {
        conn.execute(
            &format!(
                "DELETE FROM {table}
                  WHERE object_id IN (SELECT id FROM object WHERE form_id = ?1)"
            ),
            params![id],
        )?;
    }
    conn.execute("DELETE FROM pc_object_to_form WHERE form_id = ?1", params![id])?;
    conn.execute("DELETE FROM hc_object_to_form WHERE form_id = ?1", params![id])?;
    conn.execute("DELETE FROM object WHERE form_id = ?1", params![id])?;
    conn.execute(
        "DELETE FROM track WHERE step_id IN (SELECT id FROM step WHERE form_id = ?1)",
        params![id],
    )?;
    conn.execute("DELETE FROM step WHERE form_id = ?1", params![id])?;
    conn.execute("DELETE FROM parameter WHERE form_id = ?1", params![id])?;
    conn.execute("DELETE FROM point WHERE form_id = ?1", params![id])?;
    Ok(())
}

/// Lists stored forms with counts, ordered by name.
pub(crate) fn list_forms_on_conn(conn: &Connection) -> Result<Vec<FormSummary>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.name, f.comment, f.created_at, f.updated_at,
                (SELECT COUNT(*) FROM point WHERE form_id = f.id),
                (SELECT COUNT(*) FROM parameter WHERE form_id = f.id),
                (SELECT COUNT(*) FROM step WHERE form_id = f.id)
           FROM form f
          ORDER BY f.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, i64>(6)?,
            row.get::<_, i64>(7)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, name, comment, created_at, updated_at, points, parameters, steps) = row?;
        summaries.push(FormSummary {
            id,
            name,
            comment,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            points: points as usize,
            parameters: parameters as usize,
            steps: steps as usize,
        });
    }
    Ok(summaries)
}

fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| StorageError::Backing(format!("bad timestamp {raw:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Store-level wrappers
// ---------------------------------------------------------------------------

impl crate::sqlite::SqliteStore {
    pub(crate) fn save_form_impl(&self, form: &Form, registry: &Registry) -> Result<i64> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        let id = save_form_on_conn(&tx, form, registry)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(id)
    }

    pub(crate) fn load_form_impl(&self, id: i64, registry: &Registry) -> Result<Form> {
        let conn = self.lock_conn()?;
        load_form_on_conn(&conn, id, registry)
    }

    pub(crate) fn load_form_by_name_impl(&self, name: &str, registry: &Registry) -> Result<Form> {
        let conn = self.lock_conn()?;
        let id = form_id_by_name_on_conn(&conn, name)?;
        load_form_on_conn(&conn, id, registry)
    }

    pub(crate) fn delete_form_impl(&self, id: i64) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        delete_form_on_conn(&tx, id)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub(crate) fn list_forms_impl(&self) -> Result<Vec<FormSummary>> {
        let conn = self.lock_conn()?;
        list_forms_on_conn(&conn)
    }
}
