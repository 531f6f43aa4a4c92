//! The record store: a concurrency-safe map from `(scope, domain,
//! type)` keys to records.  This is the only mutable state shared
//! between the query path and the management plane.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dns_wire::protocol::types::{DomainName, RecordData, RecordType};

/// Every record type which can appear in the store, for exclusivity
/// probing.
pub const STORED_TYPES: [RecordType; 7] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::CNAME,
    RecordType::MX,
    RecordType::NS,
    RecordType::TXT,
    RecordType::SRV,
];

/// How a record was introduced: attached to a zone apex, to an
/// explicitly-named child, or to a `*.<zone>` pattern.  The scope is
/// part of the key, which is what gives the resolver its precedence
/// order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordScope {
    Base,
    Subdomain,
    Wildcard,
}

impl RecordScope {
    /// Parse the scope token used in the mappings document and the
    /// management protocol, case-insensitively.
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BASE" => Some(RecordScope::Base),
            "SUBDOMAIN" => Some(RecordScope::Subdomain),
            "WILDCARD" => Some(RecordScope::Wildcard),
            _ => None,
        }
    }
}

impl fmt::Display for RecordScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordScope::Base => write!(f, "BASE"),
            RecordScope::Subdomain => write!(f, "SUBDOMAIN"),
            RecordScope::Wildcard => write!(f, "WILDCARD"),
        }
    }
}

/// The key a record is stored under.  Domain comparison is
/// case-insensitive because `DomainName` lowercases on construction.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordKey {
    pub scope: RecordScope,
    pub name: DomainName,
    pub rtype: RecordType,
}

impl RecordKey {
    pub fn new(scope: RecordScope, name: DomainName, rtype: RecordType) -> Self {
        Self { scope, name, rtype }
    }
}

/// A stored record: one or more values, kept in insertion order.
/// Values are answered in exactly this order, no shuffling.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Record {
    pub values: Vec<RecordData>,
}

/// The store itself.  You probably want to use `SharedStore` instead.
#[derive(Debug, Clone, Default)]
pub struct Store {
    records: HashMap<RecordKey, Record>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record, replacing any previous record under the same
    /// key.
    ///
    /// # Errors
    ///
    /// If the value list is empty, or if the insert would leave a
    /// base-scoped domain with both a CNAME record and a record of
    /// another type.
    pub fn put(&mut self, key: RecordKey, values: Vec<RecordData>) -> Result<(), StoreError> {
        if values.is_empty() {
            return Err(StoreError::EmptyRecord);
        }

        if key.scope == RecordScope::Base {
            let conflicting = if key.rtype == RecordType::CNAME {
                STORED_TYPES.iter().any(|rtype| {
                    *rtype != RecordType::CNAME
                        && self.records.contains_key(&RecordKey::new(
                            RecordScope::Base,
                            key.name.clone(),
                            *rtype,
                        ))
                })
            } else {
                self.records.contains_key(&RecordKey::new(
                    RecordScope::Base,
                    key.name.clone(),
                    RecordType::CNAME,
                ))
            };

            if conflicting {
                return Err(StoreError::CnameConflict(key.name));
            }
        }

        self.records.insert(key, Record { values });
        Ok(())
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// Remove a record.
    ///
    /// # Errors
    ///
    /// If there is no record under the key.
    pub fn remove(&mut self, key: &RecordKey) -> Result<(), StoreError> {
        match self.records.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// All records, sorted by (domain, scope, type) so that listings
    /// are deterministic.
    pub fn snapshot(&self) -> Vec<(RecordKey, Record)> {
        let mut entries: Vec<(RecordKey, Record)> = self
            .records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        entries.sort_by_key(|(key, _)| (key.name.to_dotted_string(), key.scope, key.rtype));
        entries
    }

    /// Swap the entire contents for a new batch, atomically from the
    /// point of view of anyone holding the lock around this store.
    ///
    /// # Errors
    ///
    /// If the batch violates CNAME exclusivity or contains an empty
    /// record, in which case the old contents are retained.
    pub fn replace_all(&mut self, batch: HashMap<RecordKey, Record>) -> Result<(), StoreError> {
        if batch.values().any(|record| record.values.is_empty()) {
            return Err(StoreError::EmptyRecord);
        }

        if let Some(name) = find_cname_conflict(&batch) {
            return Err(StoreError::CnameConflict(name.clone()));
        }

        self.records = batch;
        Ok(())
    }
}

/// Scan a record batch for a base-scoped domain holding both a CNAME
/// and a record of another type.
pub fn find_cname_conflict(records: &HashMap<RecordKey, Record>) -> Option<&DomainName> {
    for key in records.keys() {
        if key.scope == RecordScope::Base && key.rtype == RecordType::CNAME {
            for rtype in STORED_TYPES {
                if rtype != RecordType::CNAME
                    && records.contains_key(&RecordKey::new(
                        RecordScope::Base,
                        key.name.clone(),
                        rtype,
                    ))
                {
                    return Some(&key.name);
                }
            }
        }
    }

    None
}

/// Errors from store mutations.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    /// A record must have at least one value.
    EmptyRecord,

    /// A base-scoped domain cannot have both a CNAME record and a
    /// record of another type.
    CnameConflict(DomainName),

    /// No record under that key.
    NotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::EmptyRecord => write!(f, "a record must have at least one value"),
            StoreError::CnameConflict(name) => {
                write!(f, "{name} has a CNAME record and records of other types")
            }
            StoreError::NotFound => write!(f, "record not found"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

const LOCK_POISON_MESSAGE: &str =
    "[INTERNAL ERROR] record store lock poisoned, cannot recover from this - aborting";

/// A convenience wrapper around a `Store` which lets it be shared
/// between tasks: readers-writer locking, with reads held across the
/// whole resolve-and-encode window of a request so that borrowed
/// values stay valid.
///
/// Invoking `clone` on a `SharedStore` gives a new instance which
/// refers to the same underlying `Store` object.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    store: Arc<RwLock<Store>>,
}

impl SharedStore {
    /// Make a new, empty, shared store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::new())),
        }
    }

    /// Acquire the shared read lock.
    #[allow(clippy::missing_panics_doc)]
    pub fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().expect(LOCK_POISON_MESSAGE)
    }

    /// Acquire the exclusive write lock.
    #[allow(clippy::missing_panics_doc)]
    pub fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().expect(LOCK_POISON_MESSAGE)
    }
}
