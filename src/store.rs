// Generic embedded store on top of SQLite

use crate::error::{Result, StoreError};
use crate::filter::Filter;
use crate::live::{LiveRegistry, Subscription};
use crate::record::{IndexValue, Record, Schema};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;
const DB_FILE: &str = "todostore.db";

/// Record id and serialized record, as stored
pub(crate) type RawRow = (String, String);

/// Embedded persistent store constrained to a fixed schema
pub struct Store {
    base_path: Option<PathBuf>,
    db: Connection,
    schema: Schema,
    live: LiveRegistry,
}

impl Store {
    /// Open or create a store in the given directory
    ///
    /// The database lives in `{path}/todostore.db`. Only the record types
    /// registered in `schema` can be read or written.
    pub fn open<P: AsRef<Path>>(path: P, schema: Schema) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        Self::check_schema(&schema)?;

        fs::create_dir_all(&base_path).map_err(|e| StoreError::StoreUnavailable {
            path: base_path.display().to_string(),
            source: Box::new(e),
        })?;

        let db_path = base_path.join(DB_FILE);
        let db = Connection::open(&db_path).map_err(|e| StoreError::StoreUnavailable {
            path: db_path.display().to_string(),
            source: Box::new(e),
        })?;
        db.execute_batch("PRAGMA journal_mode = WAL;")?;

        let store = Self::init(db, Some(base_path), schema)?;
        store.write_version()?;
        info!(path = ?db_path, "Opened store");
        Ok(store)
    }

    /// Open a store backed by an in-memory database
    pub fn open_in_memory(schema: Schema) -> Result<Self> {
        Self::check_schema(&schema)?;
        let db = Connection::open_in_memory().map_err(|e| StoreError::StoreUnavailable {
            path: ":memory:".to_string(),
            source: Box::new(e),
        })?;
        Self::init(db, None, schema)
    }

    fn init(db: Connection, base_path: Option<PathBuf>, schema: Schema) -> Result<Self> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            base_path,
            db,
            schema,
            live: LiveRegistry::default(),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn check_schema(schema: &Schema) -> Result<()> {
        if schema.is_empty() {
            return Err(StoreError::InvalidConfig("schema has no record types".to_string()));
        }
        for collection in schema.collections() {
            Self::validate_collection_name(collection)?;
        }
        Ok(())
    }

    /// Get the directory of this store (None for in-memory stores)
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of live queries still registered
    pub fn live_query_count(&self) -> usize {
        self.live.len()
    }

    /// Close the store, disconnecting any remaining live queries
    pub fn close(mut self) -> Result<()> {
        let remaining = self.live.len();
        if remaining > 0 {
            warn!(remaining, "Closing store with live queries still registered");
        }
        self.live.clear();
        self.db.close().map_err(|(_, e)| StoreError::from(e))?;
        info!("Closed store");
        Ok(())
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            -- Generic records table; seq gives the store-native iteration order
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, seq);

            -- Generic indexes table (for filtering on indexed fields)
            CREATE TABLE IF NOT EXISTS record_indexes (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                field_name TEXT NOT NULL,
                field_value_str TEXT,
                field_value_int INTEGER,
                field_value_bool INTEGER,
                PRIMARY KEY (collection, id, field_name),
                FOREIGN KEY (collection, id) REFERENCES records(collection, id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_record_indexes_field_str ON record_indexes(collection, field_name, field_value_str);
            CREATE INDEX IF NOT EXISTS idx_record_indexes_field_int ON record_indexes(collection, field_name, field_value_int);
            CREATE INDEX IF NOT EXISTS idx_record_indexes_field_bool ON record_indexes(collection, field_name, field_value_bool);
            "#,
        )?;

        Ok(())
    }

    /// Write version file
    fn write_version(&self) -> Result<()> {
        let Some(base_path) = &self.base_path else {
            return Ok(());
        };
        let version_path = base_path.join(".version");
        if !version_path.exists() {
            fs::write(&version_path, CURRENT_VERSION.to_string()).map_err(|e| StoreError::StoreUnavailable {
                path: version_path.display().to_string(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    fn collection_of<T: Record>(&self) -> Result<&'static str> {
        checked_collection::<T>(&self.schema)
    }

    // ========================================================================
    // Read API
    // ========================================================================

    /// Get a record by ID
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        let collection = self.collection_of::<T>()?;
        get_in(&self.db, collection, id)
    }

    /// List records with optional filtering, in store-native order
    pub fn list<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        let collection = self.collection_of::<T>()?;
        self.schema.check_filters(collection, filters)?;
        decode_rows(select_rows(&self.db, collection, filters)?)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Run `f` inside one write transaction
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back on `Err`
    /// or unwinding. Live queries are re-evaluated only after a commit that
    /// wrote something.
    pub fn write<R, F>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<R>,
    {
        let tx = self.db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut txn = WriteTxn {
            tx,
            schema: &self.schema,
            touched: BTreeSet::new(),
        };

        let out = f(&mut txn)?;
        let touched = txn.commit()?;

        if !touched.is_empty() {
            debug!(?touched, "Write committed");
            self.live.refresh(&self.db, &touched);
        }
        Ok(out)
    }

    /// Register a live query on `T` records matching `filters`
    pub fn subscribe<T: Record>(&mut self, filters: &[Filter]) -> Result<Subscription<T>> {
        let collection = self.collection_of::<T>()?;
        self.schema.check_filters(collection, filters)?;
        let rows = select_rows(&self.db, collection, filters)?;
        Ok(self.live.register::<T>(filters, rows))
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn validate_collection_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidName("Collection name cannot be empty".to_string()));
        }
        if name.len() > 64 {
            return Err(StoreError::InvalidName(format!(
                "Collection name too long: {} (max 64 chars)",
                name
            )));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(StoreError::InvalidName(format!(
                "Invalid collection name: {} (must be alphanumeric with _/-)",
                name
            )));
        }
        Ok(())
    }
}

/// A write transaction handed to the closure of [`Store::write`]
pub struct WriteTxn<'a> {
    tx: rusqlite::Transaction<'a>,
    schema: &'a Schema,
    touched: BTreeSet<&'static str>,
}

impl WriteTxn<'_> {
    fn commit(self) -> Result<BTreeSet<&'static str>> {
        let WriteTxn { tx, touched, .. } = self;
        tx.commit()?;
        Ok(touched)
    }

    /// Insert a new record
    pub fn insert<T: Record>(&mut self, record: &T) -> Result<String> {
        let collection = checked_collection::<T>(self.schema)?;
        let id = record.id();
        validate_id(&id)?;

        let data_json = serde_json::to_string(record)?;
        self.tx.execute(
            "INSERT INTO records (collection, id, data_json, updated_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![collection, &id, data_json, record.updated_at()],
        )?;
        update_indexes_tx(&self.tx, collection, &id, &record.indexed_fields())?;

        self.touched.insert(collection);
        Ok(id)
    }

    /// Replace an existing record, keeping its position in the collection
    pub fn update<T: Record>(&mut self, record: &T) -> Result<()> {
        let collection = checked_collection::<T>(self.schema)?;
        let id = record.id();

        let data_json = serde_json::to_string(record)?;
        let updated = self.tx.execute(
            "UPDATE records SET data_json = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, &id, data_json, record.updated_at()],
        )?;
        if updated == 0 {
            return Err(StoreError::RecordNotFound {
                collection: collection.to_string(),
                id,
            });
        }
        update_indexes_tx(&self.tx, collection, &id, &record.indexed_fields())?;

        self.touched.insert(collection);
        Ok(())
    }

    /// Delete a record by ID
    pub fn delete<T: Record>(&mut self, id: &str) -> Result<()> {
        let collection = checked_collection::<T>(self.schema)?;

        let deleted = self.tx.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;
        if deleted == 0 {
            return Err(StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        self.touched.insert(collection);
        Ok(())
    }

    /// Delete every given record. Returns the number deleted.
    pub fn delete_many<T: Record>(&mut self, records: &[T]) -> Result<usize> {
        for record in records {
            self.delete::<T>(&record.id())?;
        }
        Ok(records.len())
    }

    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        let collection = checked_collection::<T>(self.schema)?;
        get_in(&self.tx, collection, id)
    }

    /// List records as seen inside this transaction
    pub fn list<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        let collection = checked_collection::<T>(self.schema)?;
        self.schema.check_filters(collection, filters)?;
        decode_rows(select_rows(&self.tx, collection, filters)?)
    }
}

// ============================================================================
// Helpers shared by Store, WriteTxn and live queries
// ============================================================================

fn checked_collection<T: Record>(schema: &Schema) -> Result<&'static str> {
    let collection = T::collection_name();
    if !schema.contains(collection) {
        return Err(StoreError::UnknownCollection(collection.to_string()));
    }
    Ok(collection)
}

fn get_in<T: Record>(conn: &Connection, collection: &str, id: &str) -> Result<Option<T>> {
    let mut stmt = conn.prepare("SELECT data_json FROM records WHERE collection = ?1 AND id = ?2")?;

    let result = stmt
        .query_row(rusqlite::params![collection, id], |row| row.get::<_, String>(0))
        .optional()?;

    match result {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn decode_rows<T: Record>(rows: Vec<RawRow>) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(rows.len());
    for (_, data_json) in rows {
        results.push(serde_json::from_str(&data_json)?);
    }
    Ok(results)
}

/// Select `(id, data_json)` rows of a collection in insertion order
pub(crate) fn select_rows(conn: &Connection, collection: &str, filters: &[Filter]) -> Result<Vec<RawRow>> {
    let mut query = String::from(
        "SELECT r.id, r.data_json
         FROM records r
         WHERE r.collection = ?1",
    );

    for (i, filter) in filters.iter().enumerate() {
        validate_field_name(&filter.field)?;

        let join_alias = format!("idx{}", i);
        query.push_str(&format!(
            " AND EXISTS (
                SELECT 1 FROM record_indexes {}
                WHERE {}.collection = r.collection
                  AND {}.id = r.id
                  AND {}.field_name = ?{}",
            join_alias,
            join_alias,
            join_alias,
            join_alias,
            i + 2
        ));

        let column = match &filter.value {
            IndexValue::String(_) => format!("{}.field_value_str", join_alias),
            IndexValue::Int(_) => format!("{}.field_value_int", join_alias),
            IndexValue::Bool(_) => format!("{}.field_value_bool", join_alias),
        };
        query.push_str(" AND ");
        query.push_str(&filter.to_sql(&column, i + 2 + filters.len())?);
        query.push(')');
    }

    query.push_str(" ORDER BY r.seq ASC");

    let mut stmt = conn.prepare(&query)?;

    // Bind parameters: collection, then field names, then values
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    params.push(Box::new(collection.to_string()));

    for filter in filters {
        params.push(Box::new(filter.field.clone()));
    }

    for filter in filters {
        match &filter.value {
            IndexValue::String(s) => params.push(Box::new(s.clone())),
            IndexValue::Int(i) => params.push(Box::new(*i)),
            IndexValue::Bool(b) => params.push(Box::new(*b as i64)),
        }
    }

    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn update_indexes_tx(
    tx: &rusqlite::Transaction,
    collection: &str,
    id: &str,
    fields: &HashMap<String, IndexValue>,
) -> Result<()> {
    debug!(collection, id, field_count = fields.len(), "update_indexes_tx: called");

    tx.execute(
        "DELETE FROM record_indexes WHERE collection = ?1 AND id = ?2",
        rusqlite::params![collection, id],
    )?;

    for (field_name, value) in fields {
        validate_field_name(field_name)?;

        match value {
            IndexValue::String(s) => {
                tx.execute(
                    "INSERT INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                     VALUES (?1, ?2, ?3, ?4, NULL, NULL)",
                    rusqlite::params![collection, id, field_name, s],
                )?;
            }
            IndexValue::Int(i) => {
                tx.execute(
                    "INSERT INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                     VALUES (?1, ?2, ?3, NULL, ?4, NULL)",
                    rusqlite::params![collection, id, field_name, i],
                )?;
            }
            IndexValue::Bool(b) => {
                tx.execute(
                    "INSERT INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                     VALUES (?1, ?2, ?3, NULL, NULL, ?4)",
                    rusqlite::params![collection, id, field_name, *b as i64],
                )?;
            }
        }
    }

    Ok(())
}

fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("Field name cannot be empty".to_string()));
    }
    if name.len() > 64 {
        return Err(StoreError::InvalidName(format!("Field name too long: {} (max 64 chars)", name)));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidName(format!(
            "Invalid field name: {} (must be alphanumeric with _)",
            name
        )));
    }
    Ok(())
}

/// Validate record ID
fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(StoreError::InvalidName(
            "Record ID cannot be empty or whitespace-only".to_string(),
        ));
    }
    if id.len() > 256 {
        return Err(StoreError::InvalidName(format!(
            "Record ID too long: {} chars (max 256)",
            id.len()
        )));
    }
    Ok(())
}

// Helper function for timestamps
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::ResultsChange;
    use crate::record::IndexKind;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tempfile::TempDir;

    // Test record type
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestRecord {
        id: String,
        name: String,
        status: String,
        count: i64,
        active: bool,
        updated_at: i64,
    }

    impl Record for TestRecord {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn updated_at(&self) -> i64 {
            self.updated_at
        }

        fn collection_name() -> &'static str {
            "test_records"
        }

        fn indexed_fields(&self) -> HashMap<String, IndexValue> {
            let mut fields = HashMap::new();
            fields.insert("status".to_string(), IndexValue::String(self.status.clone()));
            fields.insert("count".to_string(), IndexValue::Int(self.count));
            fields.insert("active".to_string(), IndexValue::Bool(self.active));
            fields
        }

        fn indexed_field_kinds() -> Vec<(&'static str, IndexKind)> {
            vec![
                ("status", IndexKind::String),
                ("count", IndexKind::Int),
                ("active", IndexKind::Bool),
            ]
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Unregistered {
        id: String,
    }

    impl Record for Unregistered {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn updated_at(&self) -> i64 {
            0
        }

        fn collection_name() -> &'static str {
            "unregistered"
        }
    }

    fn schema() -> Schema {
        Schema::new().with::<TestRecord>()
    }

    fn record(id: &str, status: &str) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            name: format!("Record {}", id),
            status: status.to_string(),
            count: 1,
            active: true,
            updated_at: now_ms(),
        }
    }

    fn insert(store: &mut Store, rec: &TestRecord) {
        store.write(|txn| txn.insert(rec)).unwrap();
    }

    #[test]
    fn test_store_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data");

        let store = Store::open(&path, schema()).unwrap();
        assert!(path.join("todostore.db").exists());
        assert!(path.join(".version").exists());
        assert_eq!(store.base_path(), Some(path.as_path()));
        store.close().unwrap();
    }

    #[test]
    fn test_store_open_rejects_empty_schema() {
        let temp = TempDir::new().unwrap();
        let result = Store::open(temp.path(), Schema::new());
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let temp = TempDir::new().unwrap();

        let mut store = Store::open(temp.path(), schema()).unwrap();
        insert(&mut store, &record("rec1", "active"));
        store.close().unwrap();

        let store = Store::open(temp.path(), schema()).unwrap();
        let retrieved: Option<TestRecord> = store.get("rec1").unwrap();
        assert_eq!(retrieved.unwrap().status, "active");
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let rec = record("rec1", "active");

        let id = store.write(|txn| txn.insert(&rec)).unwrap();
        assert_eq!(id, "rec1");

        let retrieved: TestRecord = store.get("rec1").unwrap().unwrap();
        assert_eq!(retrieved, rec);

        let missing: Option<TestRecord> = store.get("nonexistent").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let rec = record("rec1", "active");
        insert(&mut store, &rec);

        assert!(store.write(|txn| txn.insert(&rec)).is_err());
        assert_eq!(store.list::<TestRecord>(&[]).unwrap().len(), 1);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        for id in ["a", "b", "c"] {
            insert(&mut store, &record(id, "draft"));
        }

        let mut first = record("a", "active");
        first.count = 9;
        store.write(|txn| txn.update(&first)).unwrap();

        let ids: Vec<String> = store.list::<TestRecord>(&[]).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let active: Vec<TestRecord> = store.list(&[Filter::eq("status", "active")]).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].count, 9);
    }

    #[test]
    fn test_update_missing_record_fails() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let result = store.write(|txn| txn.update(&record("ghost", "active")));
        assert!(matches!(result, Err(StoreError::RecordNotFound { .. })));
    }

    #[test]
    fn test_delete() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        insert(&mut store, &record("rec1", "active"));

        store.write(|txn| txn.delete::<TestRecord>("rec1")).unwrap();

        let retrieved: Option<TestRecord> = store.get("rec1").unwrap();
        assert!(retrieved.is_none());
        let filtered: Vec<TestRecord> = store.list(&[Filter::eq("status", "active")]).unwrap();
        assert!(filtered.is_empty());

        let again = store.write(|txn| txn.delete::<TestRecord>("rec1"));
        assert!(matches!(again, Err(StoreError::RecordNotFound { .. })));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = Store::open_in_memory(schema()).unwrap();

        let result: Result<()> = store.write(|txn| {
            txn.insert(&record("rec1", "active"))?;
            txn.insert(&record("rec2", "active"))?;
            Err(StoreError::InvalidConfig("abort".to_string()))
        });
        assert!(result.is_err());
        assert!(store.list::<TestRecord>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        insert(&mut store, &record("rec1", "active"));
        insert(&mut store, &record("rec2", "draft"));
        let mut inactive = record("rec3", "Active");
        inactive.active = false;
        inactive.count = 5;
        insert(&mut store, &inactive);

        let active: Vec<TestRecord> = store.list(&[Filter::eq("status", "active")]).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "rec1");

        let not_draft: Vec<TestRecord> = store.list(&[Filter::ne("status", "draft")]).unwrap();
        assert_eq!(not_draft.len(), 2);

        let flagged: Vec<TestRecord> = store.list(&[Filter::eq("active", false)]).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, "rec3");

        let combined: Vec<TestRecord> = store
            .list(&[Filter::eq("count", 1_i64), Filter::eq("active", true)])
            .unwrap();
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn test_starts_with_is_case_sensitive() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        insert(&mut store, &record("rec1", "Done"));
        insert(&mut store, &record("rec2", "done"));
        insert(&mut store, &record("rec3", "D%"));

        let upper: Vec<TestRecord> = store.list(&[Filter::starts_with("status", "D")]).unwrap();
        assert_eq!(upper.len(), 2);
        assert!(upper.iter().all(|r| r.status.starts_with('D')));

        let literal: Vec<TestRecord> = store.list(&[Filter::starts_with("status", "D%")]).unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].id, "rec3");
    }

    #[test]
    fn test_filter_on_unindexed_field_rejected() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        insert(&mut store, &record("rec1", "active"));

        let by_id = store.list::<TestRecord>(&[Filter::starts_with("id", "rec")]);
        assert!(matches!(by_id, Err(StoreError::InvalidFilter(_))));

        let by_name = store.list::<TestRecord>(&[Filter::eq("name", "Record rec1")]);
        assert!(matches!(by_name, Err(StoreError::InvalidFilter(_))));

        let sub = store.subscribe::<TestRecord>(&[Filter::eq("missing", true)]);
        assert!(matches!(sub, Err(StoreError::InvalidFilter(_))));
        assert_eq!(store.live_query_count(), 0);

        let in_txn = store.write(|txn| txn.list::<TestRecord>(&[Filter::ne("name", "x")]));
        assert!(matches!(in_txn, Err(StoreError::InvalidFilter(_))));
    }

    #[test]
    fn test_filter_kind_mismatch_rejected() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        insert(&mut store, &record("rec1", "active"));

        let prefix_on_bool = store.list::<TestRecord>(&[Filter::starts_with("active", "t")]);
        assert!(matches!(prefix_on_bool, Err(StoreError::InvalidFilter(_))));

        let string_for_int = store.list::<TestRecord>(&[Filter::eq("count", "1")]);
        assert!(matches!(string_for_int, Err(StoreError::InvalidFilter(_))));

        let ok: Vec<TestRecord> = store.list(&[Filter::eq("count", 1_i64)]).unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn test_txn_reads_its_own_writes() {
        let mut store = Store::open_in_memory(schema()).unwrap();

        let seen = store
            .write(|txn| {
                txn.insert(&record("rec1", "draft"))?;
                let before = txn.get::<TestRecord>("rec1")?;

                txn.update(&record("rec1", "active"))?;
                let after = txn.get::<TestRecord>("rec1")?;
                let missing = txn.get::<TestRecord>("rec2")?;
                Ok((before, after, missing))
            })
            .unwrap();

        assert_eq!(seen.0.unwrap().status, "draft");
        assert_eq!(seen.1.unwrap().status, "active");
        assert!(seen.2.is_none());

        let rolled_back: Result<()> = store.write(|txn| {
            txn.insert(&record("rec2", "active"))?;
            assert!(txn.get::<TestRecord>("rec2")?.is_some());
            Err(StoreError::InvalidConfig("abort".to_string()))
        });
        assert!(rolled_back.is_err());
        assert!(store.get::<TestRecord>("rec2").unwrap().is_none());

        let unknown = store.write(|txn| txn.get::<Unregistered>("x"));
        assert!(matches!(unknown, Err(StoreError::UnknownCollection(_))));
    }

    #[test]
    fn test_unknown_collection_rejected() {
        let mut store = Store::open_in_memory(schema()).unwrap();

        let read = store.list::<Unregistered>(&[]);
        assert!(matches!(read, Err(StoreError::UnknownCollection(_))));

        let write = store.write(|txn| txn.insert(&Unregistered { id: "x".to_string() }));
        assert!(matches!(write, Err(StoreError::UnknownCollection(_))));
    }

    #[test]
    fn test_subscribe_initial_then_updates() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        insert(&mut store, &record("rec1", "active"));

        let sub = store.subscribe::<TestRecord>(&[]).unwrap();
        match sub.try_next().unwrap() {
            Some(ResultsChange::Initial { list }) => assert_eq!(list.len(), 1),
            other => panic!("expected initial snapshot, got {:?}", other),
        }
        assert!(sub.try_next().unwrap().is_none());

        insert(&mut store, &record("rec2", "active"));
        match sub.try_next().unwrap() {
            Some(ResultsChange::Updated(updated)) => {
                assert_eq!(updated.insertions, vec![1]);
                assert_eq!(updated.list.len(), 2);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_with_filter_ignores_unrelated_writes() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let sub = store.subscribe::<TestRecord>(&[Filter::eq("status", "active")]).unwrap();
        sub.drain().unwrap();

        insert(&mut store, &record("rec1", "draft"));
        assert!(sub.try_next().unwrap().is_none());

        insert(&mut store, &record("rec2", "active"));
        let changes = sub.drain().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].list().len(), 1);
    }

    #[test]
    fn test_next_timeout_waits_for_commits() {
        let wait = Duration::from_millis(20);
        let mut store = Store::open_in_memory(schema()).unwrap();
        let sub = store.subscribe::<TestRecord>(&[]).unwrap();

        match sub.next_timeout(wait).unwrap() {
            Some(ResultsChange::Initial { list }) => assert!(list.is_empty()),
            other => panic!("expected initial snapshot, got {:?}", other),
        }
        assert!(sub.next_timeout(wait).unwrap().is_none());
        assert!(sub.is_active());

        insert(&mut store, &record("rec1", "active"));
        match sub.next_timeout(wait).unwrap() {
            Some(ResultsChange::Updated(updated)) => {
                assert_eq!(updated.insertions, vec![0]);
                assert_eq!(updated.list[0].id, "rec1");
            }
            other => panic!("expected update, got {:?}", other),
        }

        store.close().unwrap();
        assert!(sub.next_timeout(wait).unwrap().is_none());
        assert!(!sub.is_active());
    }

    #[test]
    fn test_rolled_back_write_does_not_notify() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let sub = store.subscribe::<TestRecord>(&[]).unwrap();
        sub.drain().unwrap();

        let _ = store.write(|txn| {
            txn.insert(&record("rec1", "active"))?;
            Err::<(), _>(StoreError::InvalidConfig("abort".to_string()))
        });
        assert!(sub.try_next().unwrap().is_none());
    }

    #[test]
    fn test_cancelled_subscription_is_pruned() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let sub = store.subscribe::<TestRecord>(&[]).unwrap();
        assert_eq!(store.live_query_count(), 1);

        sub.cancel();
        insert(&mut store, &record("rec1", "active"));
        assert_eq!(store.live_query_count(), 0);
    }

    #[test]
    fn test_close_disconnects_subscribers() {
        let mut store = Store::open_in_memory(schema()).unwrap();
        let sub = store.subscribe::<TestRecord>(&[]).unwrap();
        sub.drain().unwrap();

        store.close().unwrap();
        assert!(!sub.is_active());
        assert!(sub.try_next().unwrap().is_none());
    }

    #[test]
    fn test_validation_collection_name() {
        assert!(Store::validate_collection_name("valid_name").is_ok());
        assert!(Store::validate_collection_name("valid-name").is_ok());

        assert!(Store::validate_collection_name("invalid/name").is_err());
        assert!(Store::validate_collection_name("").is_err());
        assert!(Store::validate_collection_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validation_field_name() {
        assert!(validate_field_name("valid_field").is_ok());

        assert!(validate_field_name("invalid-field").is_err());
        assert!(validate_field_name("").is_err());
        assert!(validate_field_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validation_id() {
        assert!(validate_id("abc").is_ok());
        assert!(validate_id("   ").is_err());
        assert!(validate_id(&"x".repeat(257)).is_err());
    }
}
