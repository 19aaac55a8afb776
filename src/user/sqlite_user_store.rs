use super::auth::{
    AuthToken, AuthTokenValue, MoodifyHasher, UserAuthCredentials, UsernamePasswordCredentials,
};
use super::user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::SystemTime,
};

const BASE_DB_VERSION: usize = 9000;

struct Table {
    name: &'static str,
    schema: &'static str,
    columns: &'static [&'static str],
    indices: &'static [&'static str],
}

const USER_TABLE: Table = Table {
    name: "user",
    schema: "CREATE TABLE user (id INTEGER UNIQUE, handle TEXT NOT NULL UNIQUE, created INTEGER DEFAULT (cast(strftime('%s','now') as int)), PRIMARY KEY (id));",
    columns: &["id", "handle", "created"],
    indices: &["CREATE INDEX handle_index ON user (handle);"],
};
const AUTH_TOKEN_TABLE: Table = Table {
    name: "auth_token",
    schema: "CREATE TABLE auth_token (user_id INTEGER NOT NULL, value TEXT NOT NULL UNIQUE, created INTEGER DEFAULT (cast(strftime('%s','now') as int)), last_used INTEGER, CONSTRAINT user_id FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE)",
    columns: &["user_id", "value", "created", "last_used"],
    indices: &["CREATE INDEX auth_token_value_index ON auth_token (value);"],
};
const USER_PASSWORD_CREDENTIALS_TABLE: Table = Table {
    name: "user_password_credentials",
    schema: "CREATE TABLE user_password_credentials (user_id INTEGER NOT NULL, salt TEXT NOT NULL, hash TEXT NOT NULL, hasher TEXT NOT NULL, created INTEGER DEFAULT (cast(strftime('%s','now') as int)), last_tried INTEGER, last_used INTEGER, CONSTRAINT user_id FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE)",
    columns: &[
        "user_id",
        "salt",
        "hash",
        "hasher",
        "created",
        "last_tried",
        "last_used",
    ],
    indices: &[],
};

const TABLES: &[Table] = &[USER_TABLE, AUTH_TOKEN_TABLE, USER_PASSWORD_CREDENTIALS_TABLE];

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON;", [])?;
    for table in TABLES {
        conn.execute(table.schema, [])?;
        for index in table.indices {
            conn.execute(index, [])?;
        }
    }
    conn.execute(&format!("PRAGMA user_version = {}", BASE_DB_VERSION), [])?;
    Ok(())
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for table in TABLES {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(1))?
            .collect::<Result<_, _>>()?;

        if columns != table.columns {
            bail!(
                "Schema validation failed for {} table, found columns {:?}",
                table.name,
                columns
            );
        }
    }
    Ok(())
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(value as u64)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            create_schema(&conn)?;
            conn
        };

        let version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, usize>(0))
            .context("Failed to read database version")?;
        if version != BASE_DB_VERSION {
            bail!("Unexpected database version {}", version);
        }
        validate_schema(&conn)?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (handle) VALUES (?1)",
            params![user_handle],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT handle FROM {} WHERE id = ?1",
            USER_TABLE.name
        ))?;
        let handle = stmt
            .query_row(params![user_id], |row| row.get(0))
            .optional()?;

        Ok(handle)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM {} WHERE handle = ?1",
            USER_TABLE.name
        ))?;
        let id: Option<i64> = stmt
            .query_row(params![user_handle], |row| row.get(0))
            .optional()?;

        Ok(id.map(|id| id as usize))
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT handle FROM {}", USER_TABLE.name))?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(rows)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM auth_token WHERE value = ?1")?;
        let token = stmt
            .query_row(params![value.0], |row| {
                Ok(AuthToken {
                    user_id: row.get(0)?,
                    value: AuthTokenValue(row.get(1)?),
                    created: system_time_from_column_result(row.get(2)?),
                    last_used: row
                        .get::<usize, Option<i64>>(3)?
                        .map(system_time_from_column_result),
                })
            })
            .optional()?;

        Ok(token)
    }

    fn delete_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let token = match self.get_user_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM auth_token WHERE value = ?1",
            params![token.value.0],
        )?;
        Ok(Some(token))
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = (cast(strftime('%s','now') as int)) WHERE value = ?1",
            params![token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (value, user_id) VALUES (?1, ?2)",
            params![token.value.0, token.user_id],
        )?;
        Ok(())
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let user_id = match self.get_user_id(user_handle)? {
            Some(user_id) => user_id,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM user_password_credentials WHERE user_id = ?1")?;

        let password_credentials = stmt
            .query_row(params![user_id], |row| {
                let hasher = match MoodifyHasher::from_str(&row.get::<usize, String>(3)?) {
                    Ok(x) => x,
                    Err(_) => return Err(rusqlite::Error::InvalidQuery),
                };
                Ok(UsernamePasswordCredentials {
                    user_id: row.get(0)?,
                    salt: row.get(1)?,
                    hash: row.get(2)?,
                    hasher,
                    created: system_time_from_column_result(row.get(4)?),
                    last_tried: row
                        .get::<usize, Option<i64>>(5)?
                        .map(system_time_from_column_result),
                    last_used: row
                        .get::<usize, Option<i64>>(6)?
                        .map(system_time_from_column_result),
                })
            })
            .optional()?;

        Ok(Some(UserAuthCredentials {
            user_id,
            username_password: password_credentials,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let user_id = credentials.user_id;
        match credentials.username_password.as_ref() {
            Some(password_credentials) => {
                let updated = conn.execute(
                    "UPDATE user_password_credentials SET salt = ?1, hash = ?2, hasher = ?3 WHERE user_id = ?4",
                    params![
                        password_credentials.salt,
                        password_credentials.hash,
                        password_credentials.hasher.to_string(),
                        user_id
                    ],
                )?;
                if updated == 0 {
                    conn.execute(
                        "INSERT INTO user_password_credentials (salt, hash, hasher, user_id) VALUES (?1, ?2, ?3, ?4)",
                        params![
                            password_credentials.salt,
                            password_credentials.hash,
                            password_credentials.hasher.to_string(),
                            user_id
                        ],
                    )?;
                }
            }
            None => {
                conn.execute(
                    "DELETE FROM user_password_credentials WHERE user_id = ?1",
                    params![user_id],
                )?;
            }
        };
        Ok(())
    }
}
