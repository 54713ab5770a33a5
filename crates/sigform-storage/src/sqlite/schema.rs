//! DDL statements for the SQLite schema.
//!
//! The relational shape mirrors the form model: a form owns points,
//! parameters, steps (ordered by `number_in_form`), tracks (ordered by
//! `number_in_step`), and primitive objects. Classes and their slot
//! declarations are shared across forms and synchronized from the
//! registry on save. Argument values are stored as TEXT; coercion to
//! scalars happens at runtime. No cascades are declared: deleting a
//! parent with dependents is a constraint violation, and deletion code
//! removes children explicitly.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Forms ---------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS form (
        id           INTEGER PRIMARY KEY,
        name         TEXT NOT NULL UNIQUE,
        comment      TEXT NOT NULL DEFAULT '',
        picture_path TEXT NOT NULL DEFAULT '',
        dataset_path TEXT NOT NULL DEFAULT '',
        created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    // -- Points and parameters ----------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS point (
        id      INTEGER PRIMARY KEY,
        form_id INTEGER NOT NULL REFERENCES form(id),
        name    TEXT NOT NULL,
        comment TEXT NOT NULL DEFAULT ''
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_point_form ON point(form_id)",
    r#"
    CREATE TABLE IF NOT EXISTS parameter (
        id      INTEGER PRIMARY KEY,
        form_id INTEGER NOT NULL REFERENCES form(id),
        name    TEXT NOT NULL,
        comment TEXT NOT NULL DEFAULT '',
        weight  REAL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_parameter_form ON parameter(form_id)",
    // -- Steps and tracks ----------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS step (
        id              INTEGER PRIMARY KEY,
        form_id         INTEGER NOT NULL REFERENCES form(id),
        number_in_form  INTEGER NOT NULL,
        target_point_id INTEGER NOT NULL REFERENCES point(id),
        left_point_id   INTEGER REFERENCES point(id),
        left_padding    REAL,
        right_point_id  INTEGER REFERENCES point(id),
        right_padding   REAL,
        UNIQUE (form_id, number_in_form)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_step_form ON step(form_id)",
    r#"
    CREATE TABLE IF NOT EXISTS track (
        id             INTEGER PRIMARY KEY,
        step_id        INTEGER NOT NULL REFERENCES step(id),
        number_in_step INTEGER NOT NULL,
        UNIQUE (step_id, number_in_step)
    )
    "#,
    // -- Classes and slot declarations ---------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS class (
        id      INTEGER PRIMARY KEY,
        name    TEXT NOT NULL UNIQUE,
        kind    TEXT NOT NULL,
        comment TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS argument_to_class (
        id            INTEGER PRIMARY KEY,
        class_id      INTEGER NOT NULL REFERENCES class(id),
        name          TEXT NOT NULL,
        data_type     TEXT NOT NULL,
        default_value TEXT,
        comment       TEXT NOT NULL DEFAULT '',
        UNIQUE (class_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS input_param_to_class (
        id       INTEGER PRIMARY KEY,
        class_id INTEGER NOT NULL REFERENCES class(id),
        name     TEXT NOT NULL,
        UNIQUE (class_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS input_point_to_class (
        id       INTEGER PRIMARY KEY,
        class_id INTEGER NOT NULL REFERENCES class(id),
        name     TEXT NOT NULL,
        UNIQUE (class_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS output_param_to_class (
        id       INTEGER PRIMARY KEY,
        class_id INTEGER NOT NULL REFERENCES class(id),
        name     TEXT NOT NULL,
        UNIQUE (class_id, name)
    )
    "#,
    // -- Objects and value bindings ------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS object (
        id              INTEGER PRIMARY KEY,
        class_id        INTEGER NOT NULL REFERENCES class(id),
        form_id         INTEGER NOT NULL REFERENCES form(id),
        track_id        INTEGER REFERENCES track(id),
        number_in_track INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_object_form ON object(form_id)",
    "CREATE INDEX IF NOT EXISTS idx_object_track ON object(track_id)",
    r#"
    CREATE TABLE IF NOT EXISTS value_to_argument (
        object_id   INTEGER NOT NULL REFERENCES object(id),
        argument_id INTEGER NOT NULL REFERENCES argument_to_class(id),
        value       TEXT NOT NULL,
        PRIMARY KEY (object_id, argument_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS value_to_input_param (
        object_id      INTEGER NOT NULL REFERENCES object(id),
        input_param_id INTEGER NOT NULL REFERENCES input_param_to_class(id),
        parameter_id   INTEGER NOT NULL REFERENCES parameter(id),
        PRIMARY KEY (object_id, input_param_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS value_to_input_point (
        object_id      INTEGER NOT NULL REFERENCES object(id),
        input_point_id INTEGER NOT NULL REFERENCES input_point_to_class(id),
        point_id       INTEGER NOT NULL REFERENCES point(id),
        PRIMARY KEY (object_id, input_point_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS value_to_output_param (
        object_id       INTEGER NOT NULL REFERENCES object(id),
        output_param_id INTEGER NOT NULL REFERENCES output_param_to_class(id),
        parameter_id    INTEGER NOT NULL REFERENCES parameter(id),
        PRIMARY KEY (object_id, output_param_id)
    )
    "#,
    // -- Calculator / condition membership -----------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS pc_object_to_form (
        form_id        INTEGER NOT NULL REFERENCES form(id),
        object_id      INTEGER NOT NULL REFERENCES object(id),
        number_in_form INTEGER NOT NULL,
        PRIMARY KEY (form_id, object_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hc_object_to_form (
        form_id        INTEGER NOT NULL REFERENCES form(id),
        object_id      INTEGER NOT NULL REFERENCES object(id),
        number_in_form INTEGER NOT NULL,
        PRIMARY KEY (form_id, object_id)
    )
    "#,
    // -- Meta (schema version, migration ledger) -----------------------------
    r#"
    CREATE TABLE IF NOT EXISTS meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Schema migrations applied after initial DDL.
///
/// Each migration is a `(name, sql)` pair, tracked in the `meta` table
/// under `migration:<name>` so it runs at most once.
pub const MIGRATIONS: &[(&str, &str)] = &[];
