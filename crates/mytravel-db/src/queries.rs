use crate::Database;
use crate::models::{
    BlobRow, MyReviewRow, NewPlace, NewReview, PlaceRow, ReviewRow, SessionRow, UserRow,
};
use anyhow::Result;
use mytravel_types::models::{Identity, Patch, PlaceRef, Role};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row};
use uuid::Uuid;

const PLACE_COLUMNS: &str =
    "id, name, category, description, address, lat, lng, photo_id, created_by, created_at";
const REVIEW_COLUMNS: &str = "id, place_id, user_id, rating, comment, created_at";

impl Database {
    // -- Users --

    /// Inserts a user with role `user`. A duplicate email fails with a
    /// UNIQUE violation, see [`crate::is_unique_violation`].
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<UserRow> {
        let row = UserRow {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password_hash.to_string(),
            role: Role::User,
            created_at: now(),
        };
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    &row.id,
                    &row.name,
                    &row.email,
                    &row.password,
                    row.role.as_str(),
                    row.created_at
                ],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, email, password, role, created_at FROM users WHERE email = ?1",
                [email],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, password, role, created_at FROM users ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Not reachable over HTTP; used to provision administrators.
    pub fn set_user_role(&self, id: &str, role: Role) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                rusqlite::params![role.as_str(), id],
            )?;
            Ok(n > 0)
        })
    }

    // -- Sessions --

    pub fn insert_session(&self, id: &str, identity: &Identity, expires_at: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, role, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id,
                    &identity.user_id,
                    identity.role.as_str(),
                    expires_at,
                    now()
                ],
            )?;
            Ok(())
        })
    }

    /// Returns the session only while it is unexpired.
    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, role, expires_at FROM sessions
                 WHERE id = ?1 AND expires_at > ?2",
                rusqlite::params![id, now()],
                |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: role_at(row, 2)?,
                        expires_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now()])?;
            Ok(n)
        })
    }

    // -- Places --

    pub fn insert_place(&self, owner_id: &str, place: &NewPlace) -> Result<PlaceRow> {
        let row = PlaceRow {
            id: Uuid::new_v4().to_string(),
            name: place.name.clone(),
            category: place.category.clone(),
            description: place.description.clone(),
            address: place.address.clone(),
            lat: place.lat,
            lng: place.lng,
            photo_id: place.photo_id.clone(),
            created_by: owner_id.to_string(),
            created_at: now(),
        };
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!("INSERT INTO places ({PLACE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                rusqlite::params![
                    &row.id,
                    &row.name,
                    &row.category,
                    &row.description,
                    &row.address,
                    row.lat,
                    row.lng,
                    &row.photo_id,
                    &row.created_by,
                    row.created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    pub fn list_places(&self) -> Result<Vec<PlaceRow>> {
        self.with_conn(|conn| query_places(conn, None))
    }

    pub fn list_places_by_owner(&self, owner_id: &str) -> Result<Vec<PlaceRow>> {
        self.with_conn(|conn| query_places(conn, Some(owner_id)))
    }

    pub fn get_place(&self, id: &str) -> Result<Option<PlaceRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {PLACE_COLUMNS} FROM places WHERE id = ?1"),
                [id],
                place_from_row,
            )
            .optional()
        })
    }

    /// Writes only the columns the patch touches, in a single statement, so
    /// omitted fields keep whatever is stored at the time of the write.
    /// Returns false when no such place exists.
    pub fn update_place(&self, id: &str, patch: &crate::models::PlacePatch) -> Result<bool> {
        let mut columns: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        assign(&mut columns, &mut values, "name", &patch.name, Value::Text(String::new()));
        assign(&mut columns, &mut values, "category", &patch.category, Value::Text(String::new()));
        assign(&mut columns, &mut values, "description", &patch.description, Value::Text(String::new()));
        assign(&mut columns, &mut values, "address", &patch.address, Value::Text(String::new()));
        assign(&mut columns, &mut values, "lat", &patch.lat, Value::Real(0.0));
        assign(&mut columns, &mut values, "lng", &patch.lng, Value::Real(0.0));
        assign(&mut columns, &mut values, "photo_id", &patch.photo_id, Value::Null);

        if columns.is_empty() {
            return Ok(self.get_place(id)?.is_some());
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        values.push(Value::Text(id.to_string()));
        let sql = format!(
            "UPDATE places SET {} WHERE id = ?{}",
            assignments.join(", "),
            values.len()
        );

        self.with_conn_mut(|conn| {
            let n = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
            Ok(n > 0)
        })
    }

    pub fn delete_place(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM places WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Reviews --

    pub fn insert_review(&self, user_id: &str, review: &NewReview) -> Result<ReviewRow> {
        let row = ReviewRow {
            id: Uuid::new_v4().to_string(),
            place_id: review.place_id.clone(),
            user_id: user_id.to_string(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: now(),
        };
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!("INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                rusqlite::params![
                    &row.id,
                    row.place_id.as_str(),
                    &row.user_id,
                    row.rating,
                    &row.comment,
                    row.created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    /// All reviews, or only those pointing at `place_id`.
    pub fn list_reviews(&self, place_id: Option<&str>) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let rows = match place_id {
                Some(pid) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE place_id = ?1 ORDER BY created_at DESC"
                    ))?;
                    stmt.query_map([pid], review_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC"
                    ))?;
                    stmt.query_map([], review_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    pub fn get_review(&self, id: &str) -> Result<Option<ReviewRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
                [id],
                review_from_row,
            )
            .optional()
        })
    }

    pub fn delete_review(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM reviews WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// A user's reviews with the referenced place's name. LEFT JOIN: reviews
    /// whose place is gone (or whose place_id never matched anything) are
    /// still returned, with `place_name` = None.
    pub fn list_reviews_with_place(&self, user_id: &str) -> Result<Vec<MyReviewRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.rating, r.comment, r.place_id, p.name
                 FROM reviews r
                 LEFT JOIN places p ON p.id = r.place_id
                 WHERE r.user_id = ?1
                 ORDER BY r.created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(MyReviewRow {
                        id: row.get(0)?,
                        rating: row.get(1)?,
                        comment: row.get(2)?,
                        place_id: PlaceRef(row.get(3)?),
                        place_name: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Blobs --

    pub fn insert_blob(&self, blob: &BlobRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO blobs (id, filename, content_type, size, sha256, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    &blob.id,
                    &blob.filename,
                    &blob.content_type,
                    blob.size,
                    &blob.sha256,
                    blob.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_blob(&self, id: &str) -> Result<Option<BlobRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, filename, content_type, size, sha256, created_at FROM blobs WHERE id = ?1",
                [id],
                |row| {
                    Ok(BlobRow {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        content_type: row.get(2)?,
                        size: row.get(3)?,
                        sha256: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn assign<T: Clone + Into<Value>>(
    columns: &mut Vec<&'static str>,
    values: &mut Vec<Value>,
    column: &'static str,
    patch: &Patch<T>,
    cleared: Value,
) {
    match patch {
        Patch::Keep => {}
        Patch::Clear => {
            columns.push(column);
            values.push(cleared);
        }
        Patch::Set(v) => {
            columns.push(column);
            values.push(v.clone().into());
        }
    }
}

fn query_places(conn: &Connection, owner_id: Option<&str>) -> Result<Vec<PlaceRow>> {
    let rows = match owner_id {
        Some(owner) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLACE_COLUMNS} FROM places WHERE created_by = ?1 ORDER BY created_at DESC"
            ))?;
            stmt.query_map([owner], place_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLACE_COLUMNS} FROM places ORDER BY created_at DESC"
            ))?;
            stmt.query_map([], place_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(rows)
}

fn role_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: role_at(row, 4)?,
        created_at: row.get(5)?,
    })
}

fn place_from_row(row: &Row<'_>) -> rusqlite::Result<PlaceRow> {
    Ok(PlaceRow {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        address: row.get(4)?,
        lat: row.get(5)?,
        lng: row.get(6)?,
        photo_id: row.get(7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        id: row.get(0)?,
        place_id: PlaceRef(row.get(1)?),
        user_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlacePatch;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn beach() -> NewPlace {
        NewPlace {
            name: "Beach".into(),
            category: "nature".into(),
            description: "sand".into(),
            address: "Coast Rd 1".into(),
            lat: 1.0,
            lng: 2.0,
            photo_id: None,
        }
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = db();
        db.create_user("Ann", "ann@x.com", "hash").unwrap();
        let err = db.create_user("Ann 2", "ann@x.com", "hash").unwrap_err();
        assert!(crate::is_unique_violation(&err));
    }

    #[test]
    fn empty_collections_list_as_empty_vecs() {
        let db = db();
        assert!(db.list_places().unwrap().is_empty());
        assert!(db.list_places_by_owner("nobody").unwrap().is_empty());
        assert!(db.list_reviews(None).unwrap().is_empty());
        assert!(db.list_reviews_with_place("nobody").unwrap().is_empty());
    }

    #[test]
    fn patching_name_keeps_other_fields() {
        let db = db();
        let place = db.insert_place("owner-1", &beach()).unwrap();

        let patch = PlacePatch {
            name: Patch::Set("X".into()),
            ..Default::default()
        };
        assert!(db.update_place(&place.id, &patch).unwrap());

        let stored = db.get_place(&place.id).unwrap().unwrap();
        assert_eq!(stored.name, "X");
        assert_eq!(stored.category, "nature");
        assert_eq!(stored.description, "sand");
        assert_eq!(stored.address, "Coast Rd 1");
        assert_eq!(stored.lat, 1.0);
        assert_eq!(stored.lng, 2.0);
        assert_eq!(stored.created_by, "owner-1");
        assert_eq!(stored.created_at, place.created_at);
    }

    #[test]
    fn clear_empties_a_field_and_unsets_photo() {
        let db = db();
        let mut new = beach();
        new.photo_id = Some("blob-1".into());
        let place = db.insert_place("owner-1", &new).unwrap();

        let patch = PlacePatch {
            category: Patch::Clear,
            photo_id: Patch::Clear,
            ..Default::default()
        };
        db.update_place(&place.id, &patch).unwrap();

        let stored = db.get_place(&place.id).unwrap().unwrap();
        assert_eq!(stored.category, "");
        assert_eq!(stored.photo_id, None);
        assert_eq!(stored.name, "Beach");
    }

    #[test]
    fn update_of_missing_place_reports_false() {
        let db = db();
        let patch = PlacePatch {
            name: Patch::Set("X".into()),
            ..Default::default()
        };
        assert!(!db.update_place("missing", &patch).unwrap());
        assert!(!db.update_place("missing", &PlacePatch::default()).unwrap());
    }

    #[test]
    fn places_filter_by_owner() {
        let db = db();
        db.insert_place("a", &beach()).unwrap();
        db.insert_place("b", &beach()).unwrap();
        db.insert_place("a", &beach()).unwrap();

        assert_eq!(db.list_places().unwrap().len(), 3);
        let mine = db.list_places_by_owner("a").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.created_by == "a"));
    }

    #[test]
    fn reviews_filter_by_place() {
        let db = db();
        let review = |pid: &str| NewReview {
            place_id: PlaceRef::from(pid),
            rating: 4,
            comment: String::new(),
        };
        db.insert_review("u1", &review("p1")).unwrap();
        db.insert_review("u2", &review("p2")).unwrap();

        assert_eq!(db.list_reviews(None).unwrap().len(), 2);
        let for_p1 = db.list_reviews(Some("p1")).unwrap();
        assert_eq!(for_p1.len(), 1);
        assert_eq!(for_p1[0].user_id, "u1");
    }

    #[test]
    fn join_keeps_reviews_of_deleted_and_malformed_places() {
        let db = db();
        let kept = db.insert_place("owner", &beach()).unwrap();
        let doomed = db.insert_place("owner", &beach()).unwrap();

        for pid in [kept.id.as_str(), doomed.id.as_str(), "not-an-id"] {
            db.insert_review(
                "reviewer",
                &NewReview {
                    place_id: PlaceRef::from(pid),
                    rating: 5,
                    comment: "nice".into(),
                },
            )
            .unwrap();
        }
        // someone else's review must not leak in
        db.insert_review(
            "other",
            &NewReview {
                place_id: PlaceRef::from(kept.id.as_str()),
                rating: 1,
                comment: String::new(),
            },
        )
        .unwrap();

        assert!(db.delete_place(&doomed.id).unwrap());

        let rows = db.list_reviews_with_place("reviewer").unwrap();
        assert_eq!(rows.len(), 3);

        let name_of = |pid: &str| {
            rows.iter()
                .find(|r| r.place_id.as_str() == pid)
                .map(|r| r.place_name.clone())
                .unwrap()
        };
        assert_eq!(name_of(&kept.id), Some("Beach".to_string()));
        assert_eq!(name_of(&doomed.id), None);
        assert_eq!(name_of("not-an-id"), None);
    }

    #[test]
    fn expired_sessions_do_not_resolve() {
        let db = db();
        let user = db.create_user("Ann", "ann@x.com", "hash").unwrap();
        let identity = Identity {
            user_id: user.id.clone(),
            role: Role::User,
        };
        db.insert_session("live", &identity, now() + 60).unwrap();
        db.insert_session("stale", &identity, now() - 60).unwrap();

        let live = db.get_session("live").unwrap().unwrap();
        assert_eq!(live.user_id, user.id);
        assert_eq!(live.role, Role::User);
        assert!(db.get_session("stale").unwrap().is_none());

        assert_eq!(db.purge_expired_sessions().unwrap(), 1);
        assert!(db.delete_session("live").unwrap());
        assert!(db.get_session("live").unwrap().is_none());
    }

    #[test]
    fn blob_metadata_round_trips() {
        let db = db();
        let blob = BlobRow {
            id: "b1".into(),
            filename: "beach.png".into(),
            content_type: "image/png".into(),
            size: 3,
            sha256: "abc".into(),
            created_at: now(),
        };
        db.insert_blob(&blob).unwrap();
        assert_eq!(db.get_blob("b1").unwrap(), Some(blob));
        assert_eq!(db.get_blob("b2").unwrap(), None);
    }
}
