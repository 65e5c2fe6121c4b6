use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Database: running migration v1 (initial schema)");
        // places.created_by, reviews.place_id and places.photo_id carry no
        // foreign keys: deleting a place must not touch its reviews or photo.
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                created_at  INTEGER NOT NULL
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                role        TEXT NOT NULL,
                expires_at  INTEGER NOT NULL,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_sessions_expiry ON sessions(expires_at);

            CREATE TABLE places (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                category    TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                address     TEXT NOT NULL DEFAULT '',
                lat         REAL NOT NULL,
                lng         REAL NOT NULL,
                photo_id    TEXT,
                created_by  TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_places_owner ON places(created_by);

            CREATE TABLE reviews (
                id          TEXT PRIMARY KEY,
                place_id    TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                rating      INTEGER NOT NULL,
                comment     TEXT NOT NULL DEFAULT '',
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_reviews_place ON reviews(place_id);
            CREATE INDEX idx_reviews_user ON reviews(user_id);

            CREATE TABLE blobs (
                id            TEXT PRIMARY KEY,
                filename      TEXT NOT NULL,
                content_type  TEXT NOT NULL,
                size          INTEGER NOT NULL,
                sha256        TEXT NOT NULL,
                created_at    INTEGER NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
