//! User Storage
//! Mission: Persist user accounts with SQLite, soft-delete aware

use crate::auth::models::Role;
use crate::db::{open_connection, unique_violation_column};
use crate::errors::UniqueViolation;
use crate::users::models::{NewUser, User};
use crate::users::query::UserFilter;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::info;

const USER_COLUMNS: &str =
    "id, username, email, phone, password_hash, role, created_at, updated_at, deleted_at";

/// Credential store contract.
///
/// `find_*` and `exists_*` see only active (not soft-deleted) accounts.
/// Writes that collide with another active account fail with an error
/// carrying [`UniqueViolation`].
pub trait UserRepository: Send + Sync {
    fn create(&self, user: &NewUser) -> Result<User>;
    /// Persist username/email/phone/role; `None` if the account is gone
    fn update(&self, user: &User) -> Result<Option<User>>;
    fn soft_delete(&self, id: i64) -> Result<bool>;
    fn hard_delete(&self, id: i64) -> Result<bool>;
    fn restore(&self, id: i64) -> Result<bool>;

    fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;
    fn find_all(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)>;
    fn find_all_deleted(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)>;

    fn exists_by_username(&self, username: &str) -> Result<bool>;
    fn exists_by_email(&self, email: &str) -> Result<bool>;
    fn exists_by_phone(&self, phone: &str) -> Result<bool>;

    fn count_by_role(&self, role: Role) -> Result<u64>;
}

/// User storage with SQLite backend
pub struct SqliteUserStore {
    db_path: String,
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(5)?;
    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown role {role_str:?}").into(),
        )
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        password_hash: row.get(4)?,
        role,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

/// Classify a failed write, lifting UNIQUE violations into a typed error
fn write_error(err: rusqlite::Error, context: &'static str) -> anyhow::Error {
    match unique_violation_column(&err) {
        Some(field) => anyhow::Error::new(UniqueViolation { field }).context(context),
        None => anyhow::Error::new(err).context(context),
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl SqliteUserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;

        // Uniqueness only binds active accounts, so a soft-deleted row never
        // blocks a new registration.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_active
                ON users(username) WHERE deleted_at IS NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_active
                ON users(email) WHERE deleted_at IS NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_phone_active
                ON users(phone) WHERE deleted_at IS NULL;
            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
            CREATE INDEX IF NOT EXISTS idx_users_deleted_at ON users(deleted_at);",
        )
        .context("Failed to create users table")?;

        Ok(())
    }

    fn find_active_by(&self, column: &'static str, value: &str) -> Result<Option<User>> {
        let conn = open_connection(&self.db_path)?;
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1 AND deleted_at IS NULL");
        let user = conn
            .query_row(&sql, params![value], row_to_user)
            .optional()
            .with_context(|| format!("Failed to look up user by {column}"))?;
        Ok(user)
    }

    fn exists_active_by(&self, column: &'static str, value: &str) -> Result<bool> {
        let conn = open_connection(&self.db_path)?;
        let sql = format!("SELECT COUNT(*) FROM users WHERE {column} = ?1 AND deleted_at IS NULL");
        let count: i64 = conn
            .query_row(&sql, params![value], |row| row.get(0))
            .with_context(|| format!("Failed to check {column}"))?;
        Ok(count > 0)
    }

    fn list(&self, filter: &UserFilter, deleted: bool) -> Result<(Vec<User>, u64)> {
        let conn = open_connection(&self.db_path)?;

        let mut clauses = vec![if deleted {
            "deleted_at IS NOT NULL".to_string()
        } else {
            "deleted_at IS NULL".to_string()
        }];
        let mut args: Vec<Value> = Vec::new();

        if let Some(search) = &filter.search {
            args.push(Value::Text(like_pattern(search)));
            let n = args.len();
            clauses.push(format!(
                "(LOWER(username) LIKE ?{n} ESCAPE '\\' OR LOWER(email) LIKE ?{n} ESCAPE '\\' \
                 OR LOWER(phone) LIKE ?{n} ESCAPE '\\')"
            ));
        }

        if let Some(role) = filter.role {
            args.push(Value::Text(role.as_str().to_string()));
            clauses.push(format!("role = ?{}", args.len()));
        }

        let where_clause = clauses.join(" AND ");

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM users WHERE {where_clause}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .context("Failed to count users")?;

        let limit_idx = args.len() + 1;
        let offset_idx = args.len() + 2;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {where_clause} \
             ORDER BY {} {} LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
            filter.sort_by.column(),
            filter.sort.as_sql(),
        );
        args.push(Value::Integer(i64::from(filter.limit)));
        args.push(Value::Integer(filter.offset() as i64));

        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(args.iter()), row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to fetch users")?;

        Ok((users, total as u64))
    }
}

impl UserRepository for SqliteUserStore {
    fn create(&self, new_user: &NewUser) -> Result<User> {
        let now = Utc::now();
        let conn = open_connection(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (username, email, phone, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new_user.username,
                new_user.email,
                new_user.phone,
                new_user.password_hash,
                new_user.role.as_str(),
                now,
                now,
            ],
        )
        .map_err(|e| write_error(e, "Failed to insert user"))?;

        let user = User {
            id: conn.last_insert_rowid(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            phone: new_user.phone.clone(),
            password_hash: new_user.password_hash.clone(),
            role: new_user.role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        info!("Created user: {} ({})", user.username, user.role.as_str());

        Ok(user)
    }

    fn update(&self, user: &User) -> Result<Option<User>> {
        let now = Utc::now();
        let conn = open_connection(&self.db_path)?;
        let rows_affected = conn
            .execute(
                "UPDATE users SET username = ?1, email = ?2, phone = ?3, role = ?4, updated_at = ?5
                 WHERE id = ?6 AND deleted_at IS NULL",
                params![
                    user.username,
                    user.email,
                    user.phone,
                    user.role.as_str(),
                    now,
                    user.id,
                ],
            )
            .map_err(|e| write_error(e, "Failed to update user"))?;

        if rows_affected == 0 {
            return Ok(None);
        }

        Ok(Some(User {
            updated_at: now,
            ..user.clone()
        }))
    }

    fn soft_delete(&self, id: i64) -> Result<bool> {
        let conn = open_connection(&self.db_path)?;
        let rows_affected = conn
            .execute(
                "UPDATE users SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![Utc::now(), id],
            )
            .context("Failed to delete user")?;

        if rows_affected > 0 {
            info!("Soft-deleted user: {}", id);
        }
        Ok(rows_affected > 0)
    }

    fn hard_delete(&self, id: i64) -> Result<bool> {
        let conn = open_connection(&self.db_path)?;
        let rows_affected = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .context("Failed to permanently delete user")?;

        if rows_affected > 0 {
            info!("Permanently deleted user: {}", id);
        }
        Ok(rows_affected > 0)
    }

    fn restore(&self, id: i64) -> Result<bool> {
        let conn = open_connection(&self.db_path)?;
        let rows_affected = conn
            .execute(
                "UPDATE users SET deleted_at = NULL, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NOT NULL",
                params![Utc::now(), id],
            )
            .map_err(|e| write_error(e, "Failed to restore user"))?;

        if rows_affected > 0 {
            info!("Restored user: {}", id);
        }
        Ok(rows_affected > 0)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = open_connection(&self.db_path)?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL"),
                params![id],
                row_to_user,
            )
            .optional()
            .context("Failed to look up user by id")?;
        Ok(user)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_active_by("username", username)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_active_by("email", email)
    }

    fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.find_active_by("phone", phone)
    }

    fn find_all(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)> {
        self.list(filter, false)
    }

    fn find_all_deleted(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)> {
        self.list(filter, true)
    }

    fn exists_by_username(&self, username: &str) -> Result<bool> {
        self.exists_active_by("username", username)
    }

    fn exists_by_email(&self, email: &str) -> Result<bool> {
        self.exists_active_by("email", email)
    }

    fn exists_by_phone(&self, phone: &str) -> Result<bool> {
        self.exists_active_by("phone", phone)
    }

    fn count_by_role(&self, role: Role) -> Result<u64> {
        let conn = open_connection(&self.db_path)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?1 AND deleted_at IS NULL",
                params![role.as_str()],
                |row| row.get(0),
            )
            .context("Failed to count users by role")?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::query::{SortField, SortOrder};
    use tempfile::NamedTempFile;

    fn create_test_store() -> (SqliteUserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = SqliteUserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    fn phone_for(name: &str) -> String {
        let n = name
            .bytes()
            .fold(0u64, |h, b| (h * 31 + u64::from(b)) % 100_000_000);
        format!("08{n:08}")
    }

    fn new_user(name: &str, role: Role) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            phone: phone_for(name),
            password_hash: "hash".to_string(),
            role,
        }
    }

    fn unique_field(err: &anyhow::Error) -> Option<&str> {
        err.downcast_ref::<UniqueViolation>()
            .map(|v| v.field.as_str())
    }

    #[test]
    fn test_create_and_retrieve_user() {
        let (store, _temp) = create_test_store();

        let created = store.create(&new_user("member1", Role::User)).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.role, Role::User);

        let by_name = store.find_by_username("member1").unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.email, "member1@example.com");

        let by_email = store.find_by_email("member1@example.com").unwrap();
        assert!(by_email.is_some());
        let by_phone = store.find_by_phone(&created.phone).unwrap();
        assert!(by_phone.is_some());
        let by_id = store.find_by_id(created.id).unwrap();
        assert!(by_id.is_some());

        assert!(store.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_fields_raise_unique_violation() {
        let (store, _temp) = create_test_store();
        let first = new_user("alice", Role::User);
        store.create(&first).unwrap();

        let same_name = NewUser {
            email: "other@example.com".into(),
            phone: "0899999999".into(),
            ..first.clone()
        };
        let err = store.create(&same_name).unwrap_err();
        assert_eq!(unique_field(&err), Some("username"));

        let same_email = NewUser {
            username: "alice2".into(),
            phone: "0899999998".into(),
            ..first.clone()
        };
        let err = store.create(&same_email).unwrap_err();
        assert_eq!(unique_field(&err), Some("email"));

        let same_phone = NewUser {
            username: "alice3".into(),
            email: "alice3@example.com".into(),
            ..first
        };
        let err = store.create(&same_phone).unwrap_err();
        assert_eq!(unique_field(&err), Some("phone"));
    }

    #[test]
    fn test_email_match_is_case_sensitive() {
        let (store, _temp) = create_test_store();
        store.create(&new_user("bob", Role::User)).unwrap();

        assert!(store.exists_by_email("bob@example.com").unwrap());
        assert!(!store.exists_by_email("BOB@example.com").unwrap());
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let (store, _temp) = create_test_store();
        let user = store.create(&new_user("tempuser", Role::User)).unwrap();

        assert!(store.soft_delete(user.id).unwrap());
        assert!(!store.soft_delete(user.id).unwrap());
        assert!(store.find_by_id(user.id).unwrap().is_none());
        assert!(!store.exists_by_username("tempuser").unwrap());

        let (deleted, total) = store.find_all_deleted(&UserFilter::default()).unwrap();
        assert_eq!(total, 1);
        assert!(deleted[0].is_deleted());

        assert!(store.restore(user.id).unwrap());
        assert!(!store.restore(user.id).unwrap());
        assert!(store.find_by_id(user.id).unwrap().is_some());
    }

    #[test]
    fn test_soft_deleted_row_frees_unique_fields() {
        let (store, _temp) = create_test_store();
        let original = store.create(&new_user("carol", Role::User)).unwrap();
        store.soft_delete(original.id).unwrap();

        let replacement = store.create(&new_user("carol", Role::User)).unwrap();
        assert_ne!(replacement.id, original.id);

        // Bringing the original back would duplicate an active account
        let err = store.restore(original.id).unwrap_err();
        assert!(unique_field(&err).is_some());
        assert!(store.find_by_id(original.id).unwrap().is_none());
    }

    #[test]
    fn test_hard_delete() {
        let (store, _temp) = create_test_store();
        let user = store.create(&new_user("gone", Role::User)).unwrap();
        store.soft_delete(user.id).unwrap();

        assert!(store.hard_delete(user.id).unwrap());
        assert!(!store.hard_delete(user.id).unwrap());
        assert!(!store.restore(user.id).unwrap());
    }

    #[test]
    fn test_update_user() {
        let (store, _temp) = create_test_store();
        let user = store.create(&new_user("dave", Role::User)).unwrap();
        store.create(&new_user("erin", Role::User)).unwrap();

        let changed = User {
            username: "david".into(),
            role: Role::Admin,
            ..user.clone()
        };
        let updated = store.update(&changed).unwrap().unwrap();
        assert_eq!(updated.username, "david");
        assert!(updated.updated_at >= user.updated_at);

        let reloaded = store.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(reloaded.role, Role::Admin);

        let clash = User {
            username: "erin".into(),
            ..reloaded
        };
        let err = store.update(&clash).unwrap_err();
        assert_eq!(unique_field(&err), Some("username"));
    }

    #[test]
    fn test_list_users_filters_and_pages() {
        let (store, _temp) = create_test_store();
        for name in ["anna", "andy", "bert", "cody"] {
            store.create(&new_user(name, Role::User)).unwrap();
        }
        store.create(&new_user("root", Role::Admin)).unwrap();

        let (all, total) = store.find_all(&UserFilter::default()).unwrap();
        assert_eq!(total, 5);
        assert_eq!(all[0].username, "root"); // id DESC

        let search = UserFilter {
            search: Some("AN".into()),
            sort: SortOrder::Asc,
            sort_by: SortField::Username,
            ..UserFilter::default()
        };
        let (found, total) = store.find_all(&search).unwrap();
        assert_eq!(total, 2);
        assert_eq!(found[0].username, "andy");
        assert_eq!(found[1].username, "anna");

        let admins = UserFilter {
            role: Some(Role::Admin),
            ..UserFilter::default()
        };
        let (found, total) = store.find_all(&admins).unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].username, "root");

        let second_page = UserFilter {
            page: 2,
            limit: 2,
            sort: SortOrder::Asc,
            ..UserFilter::default()
        };
        let (page, total) = store.find_all(&second_page).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].username, "bert");
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let (store, _temp) = create_test_store();
        store.create(&new_user("plain", Role::User)).unwrap();

        let filter = UserFilter {
            search: Some("%".into()),
            ..UserFilter::default()
        };
        let (_, total) = store.find_all(&filter).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_count_by_role() {
        let (store, _temp) = create_test_store();
        store.create(&new_user("admin", Role::Admin)).unwrap();
        store.create(&new_user("user", Role::User)).unwrap();

        assert_eq!(store.count_by_role(Role::Admin).unwrap(), 1);
        assert_eq!(store.count_by_role(Role::User).unwrap(), 1);
    }
}
