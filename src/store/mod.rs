//! Member Store - SQLite persistence for the membership API
//!
//! Members with their occupations, and workplaces members are assigned to
//! through `members_workplaces`. Timestamps are stored as
//! RFC 3339 UTC strings with fixed precision so they sort as text.

pub mod error;

pub use error::{StoreError, StoreResult};

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::model::{
    Language, Member, MemberFilter, MemberOverview, MemberUpdate, MembersStats, NewMember,
    NewOccupation, NewWorkplace, Occupation, Workplace, NEW_MEMBER_DAYS,
};

const MEMBER_COLUMNS: &str = "id, member_number, email, first_name, last_name, date_of_birth, \
     address, city, postal_code, language, phone_number, note, left_at, created_at";

const OVERVIEW_SELECT: &str = "SELECT m.id, m.member_number, m.first_name, m.last_name, m.email,
            m.phone_number, m.note, m.city, m.left_at, m.created_at,
            (SELECT GROUP_CONCAT(COALESCE(o.company_name, ''), char(31))
               FROM occupations o WHERE o.member_id = m.id) AS company_names
     FROM members m";

/// Separator for aggregated company names
const NAME_SEPARATOR: char = '\u{1f}';

/// SQLite-backed member records
pub struct MemberStore {
    conn: Mutex<Connection>,
}

impl MemberStore {
    /// Create or open the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Self::init(conn)
    }

    /// Throwaway database, used by tests
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                member_number INTEGER NOT NULL UNIQUE,
                email TEXT,
                first_name TEXT,
                last_name TEXT,
                date_of_birth TEXT,
                address TEXT,
                city TEXT,
                postal_code TEXT,
                language TEXT NOT NULL DEFAULT 'cs',
                phone_number TEXT,
                note TEXT,
                left_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS occupations (
                id TEXT PRIMARY KEY,
                member_id TEXT NOT NULL REFERENCES members(id),
                company_name TEXT,
                position TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_occupations_member ON occupations(member_id);

            CREATE TABLE IF NOT EXISTS workplaces (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS members_workplaces (
                workplace_id TEXT NOT NULL REFERENCES workplaces(id),
                member_id TEXT NOT NULL REFERENCES members(id),
                PRIMARY KEY (workplace_id, member_id)
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// True when the database answers a trivial query
    pub fn ping(&self) -> bool {
        match self.conn() {
            Ok(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Members matching `filter`, highest member number first
    pub fn list(&self, filter: MemberFilter) -> StoreResult<Vec<MemberOverview>> {
        let (condition, args): (&str, Vec<String>) = match filter {
            MemberFilter::All => ("1 = 1", vec![]),
            MemberFilter::Current => ("m.left_at IS NULL", vec![]),
            MemberFilter::Past => ("m.left_at IS NOT NULL", vec![]),
            MemberFilter::New => (
                "m.left_at IS NULL AND m.created_at >= ?1",
                vec![timestamp(Utc::now() - Duration::days(NEW_MEMBER_DAYS))],
            ),
        };

        let sql = format!(
            "{} WHERE {} ORDER BY m.member_number DESC",
            OVERVIEW_SELECT, condition
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), OverviewRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(OverviewRow::into_overview).collect()
    }

    /// One past the highest member number in use
    pub fn next_member_number(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        next_member_number(&conn)
    }

    /// Insert a member, assigning the next member number when none is given
    pub fn create(&self, member: &NewMember) -> StoreResult<MemberOverview> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let member_number = match member.member_number {
            Some(number) => number,
            None => next_member_number(&tx)?,
        };
        let id = Uuid::new_v4();

        tx.execute(
            "INSERT INTO members (id, member_number, email, first_name, last_name, date_of_birth,
                                  address, city, postal_code, language, phone_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id.to_string(),
                member_number,
                member.email,
                member.first_name,
                member.last_name,
                member.date_of_birth.map(|d| d.to_string()),
                member.address,
                member.city,
                member.postal_code,
                member.language.as_str(),
                member.phone_number,
                timestamp(Utc::now()),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict(format!("Member number {} is already taken", member_number))
            } else {
                StoreError::Sqlite(e)
            }
        })?;

        let created = load_overview(&tx, id)?;
        tx.commit()?;

        tracing::info!(member_id = %id, member_number, "Created member");
        Ok(created)
    }

    /// Full record of one member
    pub fn detail(&self, id: Uuid) -> StoreResult<Member> {
        let conn = self.conn()?;
        load_member(&conn, id)
    }

    /// Replace the editable fields of a member
    pub fn update(&self, id: Uuid, update: &MemberUpdate) -> StoreResult<Member> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE members
                SET first_name = ?2, last_name = ?3, date_of_birth = ?4, email = ?5,
                    phone_number = ?6, note = ?7, address = ?8, city = ?9, postal_code = ?10,
                    language = ?11
              WHERE id = ?1",
            params![
                id.to_string(),
                update.first_name,
                update.last_name,
                update.date_of_birth.map(|d| d.to_string()),
                update.email,
                update.phone_number,
                update.note,
                update.address,
                update.city,
                update.postal_code,
                update.language.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("Member {}", id)));
        }
        load_member(&conn, id)
    }

    pub fn update_note(&self, id: Uuid, note: Option<&str>) -> StoreResult<Member> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE members SET note = ?2 WHERE id = ?1",
            params![id.to_string(), note],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("Member {}", id)));
        }
        load_member(&conn, id)
    }

    /// Mark a member as having left the organization
    pub fn remove(&self, id: Uuid) -> StoreResult<Member> {
        let conn = self.conn()?;
        let member = load_member(&conn, id)?;

        if member.left_at.is_some() {
            return Err(StoreError::Conflict(format!(
                "Id {} is no longer a member of organization",
                id
            )));
        }

        conn.execute(
            "UPDATE members SET left_at = ?2 WHERE id = ?1",
            params![id.to_string(), timestamp(Utc::now())],
        )?;

        tracing::info!(member_id = %id, "Member left");
        load_member(&conn, id)
    }

    /// Occupations of a member, newest first
    pub fn occupations(&self, member_id: Uuid) -> StoreResult<Vec<Occupation>> {
        let conn = self.conn()?;
        ensure_member(&conn, member_id)?;

        let mut stmt = conn.prepare_cached(
            "SELECT id, member_id, company_name, position, created_at
               FROM occupations
              WHERE member_id = ?1
              ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![member_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, member_id, company_name, position, created_at)| {
                Ok(Occupation {
                    id: parse_uuid(&id)?,
                    member_id: Some(parse_uuid(&member_id)?),
                    company_name,
                    position,
                    created_at: Some(parse_timestamp(&created_at)?),
                })
            })
            .collect()
    }

    pub fn add_occupation(&self, member_id: Uuid, occupation: &NewOccupation) -> StoreResult<Occupation> {
        let conn = self.conn()?;
        ensure_member(&conn, member_id)?;

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO occupations (id, member_id, company_name, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                member_id.to_string(),
                occupation.company_name,
                occupation.position,
                timestamp(created_at),
            ],
        )?;

        Ok(Occupation {
            id,
            member_id: Some(member_id),
            company_name: occupation.company_name.clone(),
            position: occupation.position.clone(),
            created_at: Some(created_at),
        })
    }

    /// All workplaces, newest first
    pub fn workplaces(&self) -> StoreResult<Vec<Workplace>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, email, created_at FROM workplaces ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([], WorkplaceRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(WorkplaceRow::into_workplace).collect()
    }

    /// Insert a workplace; `workplace` must already be validated
    pub fn create_workplace(&self, workplace: &NewWorkplace) -> StoreResult<Workplace> {
        let conn = self.conn()?;
        let created = Workplace {
            id: Uuid::new_v4(),
            name: workplace.name.clone().unwrap_or_default(),
            email: workplace.email.clone().unwrap_or_default(),
            // Stored with microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        };

        conn.execute(
            "INSERT INTO workplaces (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                created.id.to_string(),
                created.name,
                created.email,
                timestamp(created.created_at),
            ],
        )?;

        tracing::info!(workplace_id = %created.id, name = %created.name, "Created workplace");
        Ok(created)
    }

    /// Members assigned to a workplace, highest member number first
    pub fn workplace_members(&self, workplace_id: Uuid) -> StoreResult<Vec<MemberOverview>> {
        let conn = self.conn()?;
        ensure_workplace(&conn, workplace_id)?;

        let sql = format!(
            "{} JOIN members_workplaces mw ON mw.member_id = m.id
              WHERE mw.workplace_id = ?1
              ORDER BY m.member_number DESC",
            OVERVIEW_SELECT
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![workplace_id.to_string()], OverviewRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(OverviewRow::into_overview).collect()
    }

    pub fn assign_member(&self, workplace_id: Uuid, member_id: Uuid) -> StoreResult<()> {
        let conn = self.conn()?;
        ensure_workplace(&conn, workplace_id)?;
        ensure_member(&conn, member_id)?;

        conn.execute(
            "INSERT INTO members_workplaces (workplace_id, member_id) VALUES (?1, ?2)",
            params![workplace_id.to_string(), member_id.to_string()],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict(format!(
                    "Member {} is already assigned to workplace {}",
                    member_id, workplace_id
                ))
            } else {
                StoreError::Sqlite(e)
            }
        })?;

        tracing::info!(%workplace_id, %member_id, "Assigned member to workplace");
        Ok(())
    }

    pub fn unassign_member(&self, workplace_id: Uuid, member_id: Uuid) -> StoreResult<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM members_workplaces WHERE workplace_id = ?1 AND member_id = ?2",
            params![workplace_id.to_string(), member_id.to_string()],
        )?;

        if removed == 0 {
            return Err(StoreError::NotFound(format!(
                "Member {} in workplace {}",
                member_id, workplace_id
            )));
        }

        tracing::info!(%workplace_id, %member_id, "Removed member from workplace");
        Ok(())
    }

    /// Counts of new, current and past members
    pub fn stats(&self) -> StoreResult<MembersStats> {
        let conn = self.conn()?;
        let cutoff = timestamp(Utc::now() - Duration::days(NEW_MEMBER_DAYS));

        let count = |sql: &str, args: &[&dyn rusqlite::ToSql]| -> StoreResult<i64> {
            Ok(conn.query_row(sql, args, |row| row.get(0))?)
        };

        Ok(MembersStats {
            new: count(
                "SELECT COUNT(*) FROM members WHERE left_at IS NULL AND created_at >= ?1",
                &[&cutoff],
            )?,
            current: count("SELECT COUNT(*) FROM members WHERE left_at IS NULL", &[])?,
            past: count("SELECT COUNT(*) FROM members WHERE left_at IS NOT NULL", &[])?,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corruption(format!("timestamp {}: {}", raw, e)))
}

fn parse_uuid(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corruption(format!("id {}: {}", raw, e)))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn next_member_number(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(member_number), 0) + 1 FROM members",
        [],
        |row| row.get(0),
    )?)
}

fn ensure_member(conn: &Connection, id: Uuid) -> StoreResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM members WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match exists {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(format!("Member {}", id))),
    }
}

fn ensure_workplace(conn: &Connection, id: Uuid) -> StoreResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM workplaces WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match exists {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(format!("Workplace {}", id))),
    }
}

fn load_overview(conn: &Connection, id: Uuid) -> StoreResult<MemberOverview> {
    conn.query_row(
        &format!("{} WHERE m.id = ?1", OVERVIEW_SELECT),
        params![id.to_string()],
        OverviewRow::from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("Member {}", id)))?
    .into_overview()
}

fn load_member(conn: &Connection, id: Uuid) -> StoreResult<Member> {
    let sql = format!("SELECT {} FROM members WHERE id = ?1", MEMBER_COLUMNS);
    let row = conn
        .query_row(&sql, params![id.to_string()], MemberRow::from_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("Member {}", id)))?;

    row.into_member()
}

/// Raw `members` row before parsing ids, dates and timestamps
struct MemberRow {
    id: String,
    member_number: i64,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    language: String,
    phone_number: Option<String>,
    note: Option<String>,
    left_at: Option<String>,
    created_at: String,
}

impl MemberRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            member_number: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            date_of_birth: row.get(5)?,
            address: row.get(6)?,
            city: row.get(7)?,
            postal_code: row.get(8)?,
            language: row.get(9)?,
            phone_number: row.get(10)?,
            note: row.get(11)?,
            left_at: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn into_member(self) -> StoreResult<Member> {
        let date_of_birth = self
            .date_of_birth
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|e| StoreError::Corruption(format!("date {}: {}", d, e)))
            })
            .transpose()?;

        Ok(Member {
            id: parse_uuid(&self.id)?,
            member_number: self.member_number,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            language: self.language.parse::<Language>().unwrap_or_default(),
            phone_number: self.phone_number,
            note: self.note,
            left_at: self.left_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: Some(parse_timestamp(&self.created_at)?),
        })
    }
}

struct OverviewRow {
    id: String,
    member_number: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    note: Option<String>,
    city: Option<String>,
    left_at: Option<String>,
    created_at: String,
    company_names: Option<String>,
}

impl OverviewRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            member_number: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            phone_number: row.get(5)?,
            note: row.get(6)?,
            city: row.get(7)?,
            left_at: row.get(8)?,
            created_at: row.get(9)?,
            company_names: row.get(10)?,
        })
    }

    fn into_overview(self) -> StoreResult<MemberOverview> {
        let company_names = self
            .company_names
            .map(|joined| {
                joined
                    .split(NAME_SEPARATOR)
                    .map(|name| Some(name.to_string()).filter(|n| !n.is_empty()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(MemberOverview {
            id: parse_uuid(&self.id)?,
            member_number: self.member_number,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            note: self.note,
            city: self.city,
            left_at: self.left_at.as_deref().map(parse_timestamp).transpose()?,
            company_names,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct WorkplaceRow {
    id: String,
    name: String,
    email: String,
    created_at: String,
}

impl WorkplaceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_workplace(self) -> StoreResult<Workplace> {
        Ok(Workplace {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_member(number: Option<i64>, email: &str) -> NewMember {
        NewMember {
            member_number: number,
            email: Some(email.to_string()),
            first_name: Some("Jana".to_string()),
            last_name: Some("Nováková".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 1),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("members.db");
        let store = MemberStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.ping());
    }

    #[test]
    fn test_create_assigns_member_number() {
        let store = MemberStore::in_memory().unwrap();

        let first = store.create(&new_member(None, "a@example.org")).unwrap();
        assert_eq!(first.member_number, 1);
        assert_eq!(first.email.as_deref(), Some("a@example.org"));
        assert!(first.company_names.is_empty());
        assert!(first.left_at.is_none());

        let explicit = store.create(&new_member(Some(10), "b@example.org")).unwrap();
        assert_eq!(explicit.member_number, 10);

        let next = store.create(&new_member(None, "c@example.org")).unwrap();
        assert_eq!(next.member_number, 11);
        assert_eq!(store.next_member_number().unwrap(), 12);
    }

    #[test]
    fn test_duplicate_member_number_conflicts() {
        let store = MemberStore::in_memory().unwrap();
        store.create(&new_member(Some(5), "a@example.org")).unwrap();

        let err = store.create(&new_member(Some(5), "b@example.org")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_detail_roundtrips_fields() {
        let store = MemberStore::in_memory().unwrap();
        let created = store.create(&new_member(Some(1), "a@example.org")).unwrap();

        let member = store.detail(created.id).unwrap();
        assert_eq!(member.member_number, 1);
        assert_eq!(member.last_name.as_deref(), Some("Nováková"));
        assert_eq!(member.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 1));
        assert_eq!(member.language, Language::Cs);
        assert!(member.created_at.is_some());

        let err = store.detail(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_update_and_note() {
        let store = MemberStore::in_memory().unwrap();
        let created = store.create(&new_member(Some(1), "a@example.org")).unwrap();

        let mut update = MemberUpdate::from(&store.detail(created.id).unwrap());
        update.city = Some("Brno".to_string());
        update.language = Language::En;
        let member = store.update(created.id, &update).unwrap();
        assert_eq!(member.city.as_deref(), Some("Brno"));
        assert_eq!(member.language, Language::En);

        let member = store.update_note(created.id, Some("pays yearly")).unwrap();
        assert_eq!(member.note.as_deref(), Some("pays yearly"));

        let err = store.update_note(Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_remove_and_filters() {
        let store = MemberStore::in_memory().unwrap();
        let stays = store.create(&new_member(Some(1), "a@example.org")).unwrap();
        let leaves = store.create(&new_member(Some(2), "b@example.org")).unwrap();

        let removed = store.remove(leaves.id).unwrap();
        assert!(removed.left_at.is_some());

        let err = store.remove(leaves.id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let all = store.list(MemberFilter::All).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].member_number, 2);

        let current = store.list(MemberFilter::Current).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, stays.id);

        let past = store.list(MemberFilter::Past).unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, leaves.id);

        let new = store.list(MemberFilter::New).unwrap();
        assert_eq!(new.len(), 1);

        assert_eq!(
            store.stats().unwrap(),
            MembersStats {
                new: 1,
                current: 1,
                past: 1
            }
        );
    }

    #[test]
    fn test_occupations() {
        let store = MemberStore::in_memory().unwrap();
        let member = store.create(&new_member(Some(1), "a@example.org")).unwrap();

        store
            .add_occupation(
                member.id,
                &NewOccupation {
                    company_name: Some("ACME".to_string()),
                    position: Some("Welder".to_string()),
                    member_id: None,
                },
            )
            .unwrap();
        store
            .add_occupation(
                member.id,
                &NewOccupation {
                    company_name: None,
                    position: Some("Volunteer".to_string()),
                    member_id: None,
                },
            )
            .unwrap();

        let occupations = store.occupations(member.id).unwrap();
        assert_eq!(occupations.len(), 2);
        assert!(occupations.iter().all(|o| o.member_id == Some(member.id)));

        let listed = store.list(MemberFilter::All).unwrap();
        let mut names = listed[0].company_names.clone();
        names.sort();
        assert_eq!(names, vec![None, Some("ACME".to_string())]);

        let err = store.occupations(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    fn new_workplace(name: &str) -> NewWorkplace {
        NewWorkplace {
            name: Some(name.to_string()),
            email: Some("odbory@example.org".to_string()),
        }
    }

    #[test]
    fn test_workplaces() {
        let store = MemberStore::in_memory().unwrap();
        let depot = store.create_workplace(&new_workplace("Depo Hostivař")).unwrap();
        let office = store.create_workplace(&new_workplace("Kancelář")).unwrap();

        let listed = store.workplaces().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, office.id);
        assert_eq!(listed[1].name, "Depo Hostivař");

        let first = store.create(&new_member(Some(1), "a@example.org")).unwrap();
        let second = store.create(&new_member(Some(2), "b@example.org")).unwrap();
        store.assign_member(depot.id, first.id).unwrap();
        store.assign_member(depot.id, second.id).unwrap();
        store.assign_member(office.id, first.id).unwrap();

        let members = store.workplace_members(depot.id).unwrap();
        let numbers: Vec<i64> = members.iter().map(|m| m.member_number).collect();
        assert_eq!(numbers, vec![2, 1]);

        let err = store.assign_member(depot.id, first.id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.unassign_member(depot.id, second.id).unwrap();
        assert_eq!(store.workplace_members(depot.id).unwrap().len(), 1);
        assert_eq!(store.workplace_members(office.id).unwrap().len(), 1);

        let err = store.unassign_member(depot.id, second.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_workplace_unknown_ids() {
        let store = MemberStore::in_memory().unwrap();
        let depot = store.create_workplace(&new_workplace("Depo Hostivař")).unwrap();
        let member = store.create(&new_member(Some(1), "a@example.org")).unwrap();

        let err = store.assign_member(Uuid::new_v4(), member.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store.assign_member(depot.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store.workplace_members(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
