use crate::ids::IdGenerator;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Slot key the customer list is stored under.
pub const CUSTOMERS_SLOT: &str = "invoice_desk_customers";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt customer slot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not create store directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("customer name is required")]
    MissingName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<String>,
}

/// Form input for a new directory entry; the id is assigned on add.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_number: Option<String>,
}

/// Whole-list persistence for the customer directory.
pub trait CustomerStore: Send {
    fn load(&self) -> Result<Vec<Customer>, StoreError>;
    fn save(&self, customers: &[Customer]) -> Result<(), StoreError>;
}

/// A single-table key/value store in SQLite; each slot holds one JSON document.
pub struct SqliteSlotStore {
    conn: Connection,
}

impl SqliteSlotStore {
    /// Open (or create) the slot database at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        info!("Slot store initialized");
        Ok(Self { conn })
    }

    pub fn read_slot(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn write_slot(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }
}

impl CustomerStore for SqliteSlotStore {
    fn load(&self) -> Result<Vec<Customer>, StoreError> {
        match self.read_slot(CUSTOMERS_SLOT)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, customers: &[Customer]) -> Result<(), StoreError> {
        let json = serde_json::to_string(customers)?;
        self.write_slot(CUSTOMERS_SLOT, &json)?;
        info!(count = customers.len(), "Customer slot rewritten");
        Ok(())
    }
}

/// The in-memory customer list plus the store it is mirrored to.
pub struct CustomerDirectory {
    customers: Vec<Customer>,
    store: Box<dyn CustomerStore>,
    ids: IdGenerator,
}

impl CustomerDirectory {
    /// Load the list once; later changes rewrite it wholesale.
    pub fn open(store: Box<dyn CustomerStore>) -> Result<Self, StoreError> {
        let customers = store.load()?;
        info!(count = customers.len(), "Customer directory loaded");
        Ok(Self {
            customers,
            store,
            ids: IdGenerator::new(),
        })
    }

    pub fn all(&self) -> &[Customer] {
        &self.customers
    }

    pub fn get(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Customer> {
        let wanted = name.trim().to_lowercase();
        self.customers
            .iter()
            .find(|c| c.name.to_lowercase() == wanted)
    }

    pub fn add(&mut self, new: NewCustomer) -> Result<&Customer, StoreError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::MissingName);
        }
        let customers = &self.customers;
        let id = self
            .ids
            .next_free(|candidate| customers.iter().any(|c| c.id == candidate));
        let customer = Customer {
            id,
            name: name.to_string(),
            email: non_blank(new.email),
            address: non_blank(new.address),
            phone: non_blank(new.phone),
            tax_number: non_blank(new.tax_number),
        };

        let mut updated = self.customers.clone();
        updated.push(customer);
        self.store.save(&updated)?;
        self.customers = updated;

        let added = &self.customers[self.customers.len() - 1];
        info!(id = %added.id, name = %added.name, "Customer added");
        Ok(added)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alex() -> NewCustomer {
        NewCustomer {
            name: "Alex Doe".to_string(),
            address: Some("12 Market Road".to_string()),
            tax_number: Some("GST-42".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_store_loads_no_customers() {
        let store = SqliteSlotStore::in_memory().expect("store");
        let dir = CustomerDirectory::open(Box::new(store)).expect("open");
        assert!(dir.all().is_empty());
    }

    #[test]
    fn test_add_requires_name() {
        let store = SqliteSlotStore::in_memory().expect("store");
        let mut dir = CustomerDirectory::open(Box::new(store)).expect("open");
        let err = dir
            .add(NewCustomer {
                name: "   ".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingName));
        assert!(dir.all().is_empty());
    }

    #[test]
    fn test_add_drops_blank_optionals() {
        let store = SqliteSlotStore::in_memory().expect("store");
        let mut dir = CustomerDirectory::open(Box::new(store)).expect("open");
        let c = dir
            .add(NewCustomer {
                name: "Ravi".to_string(),
                email: Some(String::new()),
                phone: Some("+91 1".to_string()),
                ..Default::default()
            })
            .expect("add")
            .clone();
        assert_eq!(c.email, None);
        assert_eq!(c.phone.as_deref(), Some("+91 1"));
        assert_eq!(dir.get(&c.id), Some(&c));
    }

    #[test]
    fn test_find_by_name_is_case_insensitive() {
        let store = SqliteSlotStore::in_memory().expect("store");
        let mut dir = CustomerDirectory::open(Box::new(store)).expect("open");
        dir.add(alex()).expect("add");
        assert!(dir.find_by_name("alex doe").is_some());
        assert!(dir.find_by_name("ALEX DOE ").is_some());
        assert!(dir.find_by_name("Alex").is_none());
    }

    #[test]
    fn test_customers_survive_reopen() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("nested").join("customers.db");

        let first_id = {
            let mut dir =
                CustomerDirectory::open(Box::new(SqliteSlotStore::open(&path).expect("store")))
                    .expect("open");
            let id = dir.add(alex()).expect("add").id.clone();
            dir.add(NewCustomer {
                name: "Priya".to_string(),
                ..Default::default()
            })
            .expect("add");
            id
        };

        let dir = CustomerDirectory::open(Box::new(SqliteSlotStore::open(&path).expect("store")))
            .expect("reopen");
        assert_eq!(dir.all().len(), 2);
        let alex = dir.get(&first_id).expect("alex persisted");
        assert_eq!(alex.address.as_deref(), Some("12 Market Road"));
        assert_eq!(dir.all()[1].name, "Priya");
    }

    #[test]
    fn test_slot_json_shape() {
        let store = SqliteSlotStore::in_memory().expect("store");
        store
            .save(&[Customer {
                id: "c1".to_string(),
                name: "Alex".to_string(),
                email: None,
                address: None,
                phone: None,
                tax_number: Some("T-1".to_string()),
            }])
            .expect("save");
        let raw = store.read_slot(CUSTOMERS_SLOT).expect("read").expect("slot");
        assert_eq!(raw, r#"[{"id":"c1","name":"Alex","taxNumber":"T-1"}]"#);
    }

    #[test]
    fn test_corrupt_slot_is_reported() {
        let store = SqliteSlotStore::in_memory().expect("store");
        store.write_slot(CUSTOMERS_SLOT, "not json").expect("write");
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }
}
