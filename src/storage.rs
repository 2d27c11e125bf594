//! Local contact persistence.
//!
//! The reconciler only sees [`ContactRepository`]; [`SqliteContactStore`] is
//! the production backend and [`InMemoryContactStore`] the substitute used in
//! tests and dry runs.
//!
//! Every create/update is a single statement, so a reader never observes a
//! half-written contact.

use crate::contact::{Contact, ContactAttributes, ExternalId};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use log::{debug, info};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type StoreResult<T> = Result<T, StoreError>;

const CONTACT_COLUMNS: &str =
    "id, external_id, name, email, phone, street, city, zip_code, country, last_synced_at";

pub trait ContactRepository {
    fn find_by_external_id(&self, external_id: &ExternalId) -> StoreResult<Option<Contact>>;
    fn create(&mut self, attrs: ContactAttributes, synced_at: DateTime<Utc>) -> StoreResult<Contact>;
    fn update(&mut self, contact: &Contact) -> StoreResult<()>;
}

pub fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "OdooContactSync")?;
    Some(proj.data_dir().join("contacts.sqlite"))
}

fn ensure_dir(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

pub struct SqliteContactStore {
    conn: Connection,
}

impl SqliteContactStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        ensure_dir(path)?;
        let conn = Connection::open(path).map_err(|err| {
            debug!("event=store_open module=storage status=error path={} error={err}", path.display());
            err
        })?;
        let store = Self::init(conn)?;
        info!("event=store_open module=storage status=ok path={}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                street TEXT,
                city TEXT,
                zip_code TEXT,
                country TEXT,
                last_synced_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        usize::try_from(n).map_err(|_| StoreError::InvalidData(format!("negative count {n}")))
    }

    /// Contacts ordered by name. `search` is a literal substring of name or
    /// email, matched case-insensitively. No `limit` means every row.
    pub fn list(&self, search: Option<&str>, limit: Option<usize>) -> StoreResult<Vec<Contact>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
        // SQLite treats a negative LIMIT as unbounded.
        let lim = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(&format!(
            r"SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE ?1 IS NULL
                OR lower(name) LIKE ?1 ESCAPE '\'
                OR lower(coalesce(email, '')) LIKE ?1 ESCAPE '\'
             ORDER BY name ASC, id ASC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![pattern, lim], contact_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        external_id: ExternalId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        street: row.get(5)?,
        city: row.get(6)?,
        zip_code: row.get(7)?,
        country: row.get(8)?,
        last_synced_at: row.get(9)?,
    })
}

impl ContactRepository for SqliteContactStore {
    fn find_by_external_id(&self, external_id: &ExternalId) -> StoreResult<Option<Contact>> {
        let contact = self
            .conn
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE external_id = ?1"),
                params![external_id.as_str()],
                contact_from_row,
            )
            .optional()?;
        Ok(contact)
    }

    fn create(&mut self, attrs: ContactAttributes, synced_at: DateTime<Utc>) -> StoreResult<Contact> {
        let inserted = self.conn.execute(
            r#"
            INSERT INTO contacts (external_id, name, email, phone, street, city, zip_code, country, last_synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                attrs.external_id.as_str(),
                attrs.name,
                attrs.email,
                attrs.phone,
                attrs.street,
                attrs.city,
                attrs.zip_code,
                attrs.country,
                synced_at,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::Duplicate(attrs.external_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let ContactAttributes { external_id, name, email, phone, street, city, zip_code, country } = attrs;
        Ok(Contact {
            id: self.conn.last_insert_rowid(),
            external_id,
            name,
            email,
            phone,
            street,
            city,
            zip_code,
            country,
            last_synced_at: synced_at,
        })
    }

    fn update(&mut self, contact: &Contact) -> StoreResult<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE contacts SET
                name = ?2,
                email = ?3,
                phone = ?4,
                street = ?5,
                city = ?6,
                zip_code = ?7,
                country = ?8,
                last_synced_at = ?9
            WHERE external_id = ?1
            "#,
            params![
                contact.external_id.as_str(),
                contact.name,
                contact.email,
                contact.phone,
                contact.street,
                contact.city,
                contact.zip_code,
                contact.country,
                contact.last_synced_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(contact.external_id.to_string()));
        }
        Ok(())
    }
}

/// Map-backed store keyed by external id.
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    contacts: BTreeMap<ExternalId, Contact>,
    next_id: i64,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }
}

impl ContactRepository for InMemoryContactStore {
    fn find_by_external_id(&self, external_id: &ExternalId) -> StoreResult<Option<Contact>> {
        Ok(self.contacts.get(external_id).cloned())
    }

    fn create(&mut self, attrs: ContactAttributes, synced_at: DateTime<Utc>) -> StoreResult<Contact> {
        if self.contacts.contains_key(&attrs.external_id) {
            return Err(StoreError::Duplicate(attrs.external_id.to_string()));
        }
        self.next_id += 1;
        let ContactAttributes { external_id, name, email, phone, street, city, zip_code, country } = attrs;
        let contact = Contact {
            id: self.next_id,
            external_id,
            name,
            email,
            phone,
            street,
            city,
            zip_code,
            country,
            last_synced_at: synced_at,
        };
        self.contacts.insert(contact.external_id.clone(), contact.clone());
        Ok(contact)
    }

    fn update(&mut self, contact: &Contact) -> StoreResult<()> {
        match self.contacts.get_mut(&contact.external_id) {
            Some(slot) => {
                *slot = contact.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(contact.external_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    fn ann() -> ContactAttributes {
        let mut attrs = ContactAttributes::new(1_i64, "Ann");
        attrs.email = Some("a@x.com".to_string());
        attrs.country = Some("Testland".to_string());
        attrs
    }

    #[test]
    fn sqlite_create_then_find() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        let created = store.create(ann(), at(1_700_000_000)).unwrap();

        let found = store.find_by_external_id(&ExternalId::from(1_i64)).unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.email.as_deref(), Some("a@x.com"));
        assert_eq!(found.last_synced_at, at(1_700_000_000));
        assert!(store.find_by_external_id(&ExternalId::from(2_i64)).unwrap().is_none());
    }

    #[test]
    fn sqlite_rejects_duplicate_external_id() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        store.create(ann(), at(1)).unwrap();

        let err = store.create(ann(), at(2)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref id) if id == "1"), "{err}");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn sqlite_update_overwrites_and_clears() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        let mut contact = store.create(ann(), at(1)).unwrap();

        contact.apply(ContactAttributes::new(1_i64, "Ann B."), at(2));
        store.update(&contact).unwrap();

        let found = store.find_by_external_id(&contact.external_id).unwrap().unwrap();
        assert_eq!(found.name, "Ann B.");
        assert_eq!(found.email, None);
        assert_eq!(found.country, None);
        assert_eq!(found.last_synced_at, at(2));
        assert_eq!(found.id, contact.id);
    }

    #[test]
    fn sqlite_update_missing_is_not_found() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        let mut contact = store.create(ann(), at(1)).unwrap();
        contact.external_id = ExternalId::from(99_i64);

        assert!(matches!(store.update(&contact), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn sqlite_list_filters_by_name_or_email() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        store.create(ann(), at(1)).unwrap();
        let mut bob = ContactAttributes::new(2_i64, "Bob");
        bob.email = Some("bob@ANN-corp.com".to_string());
        store.create(bob, at(1)).unwrap();
        store.create(ContactAttributes::new(3_i64, "Carla"), at(1)).unwrap();

        let names = |v: Vec<Contact>| v.into_iter().map(|c| c.name).collect::<Vec<_>>();
        assert_eq!(names(store.list(None, None).unwrap()), ["Ann", "Bob", "Carla"]);
        assert_eq!(names(store.list(Some("ann"), None).unwrap()), ["Ann", "Bob"]);
        assert_eq!(names(store.list(Some("  "), Some(1)).unwrap()), ["Ann"]);
    }

    #[test]
    fn sqlite_list_without_limit_returns_every_row() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        for id in 1..=600_i64 {
            store.create(ContactAttributes::new(id, format!("Contact {id:03}")), at(1)).unwrap();
        }

        assert_eq!(store.count().unwrap(), 600);
        assert_eq!(store.list(None, None).unwrap().len(), 600);
        assert_eq!(store.list(None, Some(10)).unwrap().len(), 10);
    }

    #[test]
    fn sqlite_list_matches_wildcards_literally() {
        let mut store = SqliteContactStore::open_in_memory().unwrap();
        store.create(ContactAttributes::new(1_i64, "100% Organic"), at(1)).unwrap();
        store.create(ContactAttributes::new(2_i64, "1000 Organic"), at(1)).unwrap();
        let mut underscored = ContactAttributes::new(3_i64, "Dana");
        underscored.email = Some("dana_k@x.com".to_string());
        store.create(underscored, at(1)).unwrap();
        let mut plain = ContactAttributes::new(4_i64, "Dan");
        plain.email = Some("danak@x.com".to_string());
        store.create(plain, at(1)).unwrap();
        store.create(ContactAttributes::new(5_i64, r"Back\slash"), at(1)).unwrap();

        let names = |v: Vec<Contact>| v.into_iter().map(|c| c.name).collect::<Vec<_>>();
        assert_eq!(names(store.list(Some("0%"), None).unwrap()), ["100% Organic"]);
        assert_eq!(names(store.list(Some("a_k"), None).unwrap()), ["Dana"]);
        assert_eq!(names(store.list(Some(r"k\s"), None).unwrap()), [r"Back\slash"]);
        assert_eq!(names(store.list(Some("%"), None).unwrap()), ["100% Organic"]);
    }

    #[test]
    fn sqlite_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("contacts.sqlite");
        {
            let mut store = SqliteContactStore::open(&path).unwrap();
            store.create(ann(), at(1)).unwrap();
        }
        let store = SqliteContactStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn memory_store_enforces_unique_external_id() {
        let mut store = InMemoryContactStore::new();
        let first = store.create(ann(), at(1)).unwrap();
        assert_eq!(first.id, 1);
        assert!(matches!(store.create(ann(), at(2)), Err(StoreError::Duplicate(_))));
        assert_eq!(store.len(), 1);
    }
}
