//! SQL schema for the Lectern SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! The content tables (`grades` through `lessons`) are owned by the wider
//! curriculum application; they are declared here so the engine can run
//! standalone. Their cascading foreign keys are load-bearing: deleting a
//! subject through a diff relies on them to remove its chapters and lessons.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS grades (
    id     INTEGER PRIMARY KEY,
    name   TEXT NOT NULL,
    level  INTEGER
);

CREATE TABLE IF NOT EXISTS users (
    id     INTEGER PRIMARY KEY,
    email  TEXT NOT NULL UNIQUE,
    name   TEXT NOT NULL,
    role   TEXT NOT NULL DEFAULT 'Student'
           CHECK (role IN ('Student', 'Instructor', 'Moderator', 'Admin'))
);

CREATE TABLE IF NOT EXISTS subjects (
    id             INTEGER PRIMARY KEY,
    grade_id       INTEGER NOT NULL REFERENCES grades(id) ON DELETE CASCADE,
    instructor_id  INTEGER REFERENCES users(id) ON DELETE SET NULL,
    title          TEXT NOT NULL,
    description    TEXT,
    created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS chapters (
    id          INTEGER PRIMARY KEY,
    subject_id  INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    \"order\"     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS lessons (
    id          INTEGER PRIMARY KEY,
    chapter_id  INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL DEFAULT '',
    \"order\"     INTEGER NOT NULL DEFAULT 0,
    version     INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- Written only by the engine. A row changes status at most once, away from
-- 'pending'; every such write is conditional on the row still being pending.
CREATE TABLE IF NOT EXISTS change_proposals (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    moderator_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    scope           TEXT NOT NULL,   -- JSON Scope
    excel_hash      TEXT NOT NULL UNIQUE CHECK (length(excel_hash) = 64),
    excel_path      TEXT,
    excel_snapshot  TEXT NOT NULL,   -- JSON WorkbookSnapshot
    db_snapshot     TEXT NOT NULL,   -- JSON SnapshotData
    diff_json       TEXT NOT NULL,   -- JSON Diff
    status          TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'approved', 'rejected', 'applied', 'failed')),
    decided_by      INTEGER REFERENCES users(id),
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS subjects_grade_idx            ON subjects(grade_id);
CREATE INDEX IF NOT EXISTS chapters_subject_idx          ON chapters(subject_id);
CREATE INDEX IF NOT EXISTS lessons_chapter_idx           ON lessons(chapter_id);
CREATE INDEX IF NOT EXISTS change_proposals_status_idx   ON change_proposals(status);
CREATE INDEX IF NOT EXISTS change_proposals_moderator_idx ON change_proposals(moderator_id);

PRAGMA user_version = 1;
";
