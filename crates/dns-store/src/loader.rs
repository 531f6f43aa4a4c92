//! Loading the mappings document.
//!
//! The document is a JSON object of zones, each with base records,
//! an optional wildcard block, and named subdomains:
//!
//! ```json
//! {
//!   "domains": {
//!     "example.com": {
//!       "records": { "A": ["93.184.216.34"] },
//!       "wildcards": { "records": { "A": ["1.2.3.4"] } },
//!       "subdomains": {
//!         "mail": { "records": { "MX": [{ "priority": 10, "value": "smtp.example.com" }] } }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Loading produces a complete key-to-record batch and never touches
//! a live store: callers swap the batch in with
//! `Store::replace_all`, so a failed load cannot leave a store
//! half-populated.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use dns_wire::protocol::types::{DomainName, RecordData, RecordType, ValueError};

use crate::store::{find_cname_conflict, Record, RecordKey, RecordScope};

/// The parsed shape of the mappings document.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingsDocument {
    domains: HashMap<String, DomainEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct DomainEntry {
    #[serde(default)]
    records: HashMap<String, Vec<RawValue>>,

    #[serde(default)]
    wildcards: Option<RecordsEntry>,

    #[serde(default)]
    subdomains: HashMap<String, RecordsEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct RecordsEntry {
    #[serde(default)]
    records: HashMap<String, Vec<RawValue>>,
}

/// A single value in the document.  MX values may be written either
/// as the flat `"10 smtp.example.com"` form or as an object; objects
/// are flattened to the string form before parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Mx { priority: u16, value: String },
}

impl RawValue {
    fn flatten(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Mx { priority, value } => format!("{priority} {value}"),
        }
    }
}

/// Parse the document text into a record batch ready for
/// `Store::replace_all`.
///
/// # Errors
///
/// If the text is not valid JSON for the documented schema, if a
/// record type or value does not parse, if a record has no values,
/// or if a zone breaks CNAME exclusivity.
pub fn parse_document(text: &str) -> Result<HashMap<RecordKey, Record>, Error> {
    let document: MappingsDocument = serde_json::from_str(text).map_err(Error::Json)?;
    build_batch(&document)
}

/// Turn a parsed document into a record batch.  See `parse_document`.
///
/// # Errors
///
/// As `parse_document`, minus the JSON case.
pub fn build_batch(document: &MappingsDocument) -> Result<HashMap<RecordKey, Record>, Error> {
    let mut batch = HashMap::new();

    for (zone_name, entry) in &document.domains {
        let zone = DomainName::from_dotted_string(zone_name)
            .ok_or_else(|| Error::InvalidDomain(zone_name.clone()))?;

        insert_records(&mut batch, RecordScope::Base, &zone, &entry.records)?;

        if let Some(wildcards) = &entry.wildcards {
            let mut labels = Vec::with_capacity(zone.labels.len() + 1);
            labels.push(b"*".to_vec());
            labels.extend_from_slice(&zone.labels);
            let wildcard = DomainName::from_labels(labels)
                .ok_or_else(|| Error::InvalidDomain(format!("*.{zone_name}")))?;

            insert_records(&mut batch, RecordScope::Wildcard, &wildcard, &wildcards.records)?;
        }

        for (sub_name, sub) in &entry.subdomains {
            let full_name = format!("{sub_name}.{zone_name}");
            let full = DomainName::from_dotted_string(&full_name)
                .ok_or(Error::InvalidDomain(full_name))?;

            insert_records(&mut batch, RecordScope::Subdomain, &full, &sub.records)?;
        }
    }

    if let Some(name) = find_cname_conflict(&batch) {
        return Err(Error::CnameConflict(name.to_string()));
    }

    tracing::debug!(records = %batch.len(), "built record batch");
    Ok(batch)
}

fn insert_records(
    batch: &mut HashMap<RecordKey, Record>,
    scope: RecordScope,
    name: &DomainName,
    records: &HashMap<String, Vec<RawValue>>,
) -> Result<(), Error> {
    for (type_name, raw_values) in records {
        let rtype = RecordType::from_mnemonic(type_name).ok_or_else(|| Error::UnknownType {
            domain: name.to_string(),
            mnemonic: type_name.clone(),
        })?;

        if raw_values.is_empty() {
            return Err(Error::NoValues {
                domain: name.to_string(),
                rtype,
            });
        }

        let mut values = Vec::with_capacity(raw_values.len());
        for raw in raw_values {
            let value =
                RecordData::parse(rtype, &raw.flatten()).map_err(|error| Error::InvalidValue {
                    domain: name.to_string(),
                    rtype,
                    error,
                })?;
            values.push(value);
        }

        batch.insert(RecordKey::new(scope, name.clone(), rtype), Record { values });
    }

    Ok(())
}

/// Errors encountered loading the mappings document.  Fatal on the
/// initial load; reported to the control-plane caller on reload.
#[derive(Debug)]
pub enum Error {
    /// The document is not valid JSON of the expected shape.
    Json(serde_json::Error),

    /// A zone or subdomain name does not parse as a domain.
    InvalidDomain(String),

    /// A record type mnemonic this server does not store.
    UnknownType { domain: String, mnemonic: String },

    /// A record with an empty value array.
    NoValues { domain: String, rtype: RecordType },

    /// A value which does not parse as its record type demands.
    InvalidValue {
        domain: String,
        rtype: RecordType,
        error: ValueError,
    },

    /// A zone with both a CNAME and records of other types on the
    /// same base domain.
    CnameConflict(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Json(error) => write!(f, "invalid mappings document: {error}"),
            Error::InvalidDomain(name) => write!(f, "'{name}' is not a valid domain name"),
            Error::UnknownType { domain, mnemonic } => {
                write!(f, "{domain}: unsupported record type '{mnemonic}'")
            }
            Error::NoValues { domain, rtype } => {
                write!(f, "{domain}: {rtype} record has no values")
            }
            Error::InvalidValue {
                domain,
                rtype,
                error,
            } => write!(f, "{domain}: bad {rtype} value: {error}"),
            Error::CnameConflict(domain) => {
                write!(f, "{domain} has a CNAME record and records of other types")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(error) => Some(error),
            Error::InvalidValue { error, .. } => Some(error),
            _ => None,
        }
    }
}
