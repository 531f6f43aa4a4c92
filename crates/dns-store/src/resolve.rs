//! The lookup algorithm: translating a queried (name, type) pair
//! into the record to answer with.

use dns_wire::protocol::types::{DomainName, RecordType};

use crate::store::{Record, RecordKey, RecordScope, Store};

/// Resolve a query against the store, returning the record to answer
/// with, or `None` for NXDOMAIN.
///
/// Precedence, first hit wins:
///
/// 1. an exact base match
/// 2. an explicit subdomain match
/// 3. wildcard ascent: strip leading labels one at a time and look
///    for `*.<suffix>`, so the most specific wildcard wins
/// 4. when the query is not for a CNAME, the same ladder again for a
///    CNAME at the queried name
///
/// A CNAME found by step 4 is returned as-is: this server never
/// chases the chain to the target.
pub fn resolve<'a>(store: &'a Store, name: &DomainName, qtype: RecordType) -> Option<&'a Record> {
    if let Some(record) = resolve_type(store, name, qtype) {
        return Some(record);
    }

    if qtype != RecordType::CNAME {
        if let Some(record) = resolve_type(store, name, RecordType::CNAME) {
            tracing::debug!(%name, %qtype, "answering with CNAME");
            return Some(record);
        }
    }

    None
}

fn resolve_type<'a>(store: &'a Store, name: &DomainName, rtype: RecordType) -> Option<&'a Record> {
    for scope in [RecordScope::Base, RecordScope::Subdomain] {
        if let Some(record) = store.get(&RecordKey::new(scope, name.clone(), rtype)) {
            tracing::debug!(%name, %rtype, %scope, "match");
            return Some(record);
        }
    }

    // wildcard ascent; `*.<name>` itself is deliberately not a
    // candidate, a wildcard only covers proper subdomains
    for i in 1..name.labels.len() {
        let mut labels = Vec::with_capacity(name.labels.len() - i + 1);
        labels.push(b"*".to_vec());
        labels.extend_from_slice(&name.labels[i..]);

        if let Some(candidate) = DomainName::from_labels(labels) {
            if let Some(record) =
                store.get(&RecordKey::new(RecordScope::Wildcard, candidate, rtype))
            {
                tracing::debug!(%name, %rtype, ascent = i, "wildcard match");
                return Some(record);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use dns_wire::protocol::types::test_util::*;
    use dns_wire::protocol::types::RecordData;

    use super::*;

    fn store_with(entries: &[(RecordScope, &str, RecordData)]) -> Store {
        let mut store = Store::new();
        for (scope, name, data) in entries {
            store
                .put(
                    RecordKey::new(*scope, domain(name), data.rtype()),
                    vec![data.clone()],
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn resolves_exact_base_match() {
        let store = store_with(&[(RecordScope::Base, "example.com", a_data("93.184.216.34"))]);

        assert_eq!(
            Some(&Record {
                values: vec![a_data("93.184.216.34")]
            }),
            resolve(&store, &domain("example.com"), RecordType::A)
        );
    }

    #[test]
    fn base_beats_subdomain_beats_wildcard() {
        let store = store_with(&[
            (RecordScope::Base, "www.example.com", a_data("1.1.1.1")),
            (RecordScope::Subdomain, "www.example.com", a_data("2.2.2.2")),
            (RecordScope::Wildcard, "*.example.com", a_data("3.3.3.3")),
        ]);

        assert_eq!(
            Some(&Record {
                values: vec![a_data("1.1.1.1")]
            }),
            resolve(&store, &domain("www.example.com"), RecordType::A)
        );

        let store = store_with(&[
            (RecordScope::Subdomain, "www.example.com", a_data("2.2.2.2")),
            (RecordScope::Wildcard, "*.example.com", a_data("3.3.3.3")),
        ]);

        assert_eq!(
            Some(&Record {
                values: vec![a_data("2.2.2.2")]
            }),
            resolve(&store, &domain("www.example.com"), RecordType::A)
        );
    }

    #[test]
    fn wildcard_matches_subdomains() {
        let store = store_with(&[(RecordScope::Wildcard, "*.example.com", a_data("1.2.3.4"))]);

        assert!(resolve(&store, &domain("www.example.com"), RecordType::A).is_some());
        assert!(resolve(&store, &domain("deep.nested.example.com"), RecordType::A).is_some());
    }

    #[test]
    fn wildcard_does_not_match_its_own_suffix() {
        let store = store_with(&[(RecordScope::Wildcard, "*.example.com", a_data("1.2.3.4"))]);

        assert_eq!(None, resolve(&store, &domain("example.com"), RecordType::A));
    }

    #[test]
    fn most_specific_wildcard_wins() {
        let store = store_with(&[
            (RecordScope::Wildcard, "*.example.com", a_data("1.1.1.1")),
            (RecordScope::Wildcard, "*.sub.example.com", a_data("2.2.2.2")),
        ]);

        assert_eq!(
            Some(&Record {
                values: vec![a_data("2.2.2.2")]
            }),
            resolve(&store, &domain("www.sub.example.com"), RecordType::A)
        );
    }

    #[test]
    fn falls_back_to_cname_for_other_qtypes() {
        let store = store_with(&[(
            RecordScope::Base,
            "example.com",
            cname_data("alias.other"),
        )]);

        assert_eq!(
            Some(&Record {
                values: vec![cname_data("alias.other")]
            }),
            resolve(&store, &domain("example.com"), RecordType::AAAA)
        );
    }

    #[test]
    fn queried_type_beats_cname_fallback_across_scopes() {
        // a wildcard record of the queried type outranks a base CNAME
        let store = store_with(&[
            (RecordScope::Base, "www.example.com", cname_data("alias.other")),
            (RecordScope::Wildcard, "*.example.com", a_data("1.2.3.4")),
        ]);

        assert_eq!(
            Some(&Record {
                values: vec![a_data("1.2.3.4")]
            }),
            resolve(&store, &domain("www.example.com"), RecordType::A)
        );
    }

    #[test]
    fn cname_query_does_not_fall_back_to_itself() {
        let store = Store::new();

        assert_eq!(
            None,
            resolve(&store, &domain("example.com"), RecordType::CNAME)
        );
    }

    #[test]
    fn unmatched_name_is_none() {
        let store = store_with(&[(RecordScope::Base, "example.com", a_data("1.2.3.4"))]);

        assert_eq!(None, resolve(&store, &domain("missing.test"), RecordType::A));
        assert_eq!(None, resolve(&store, &domain("example.com"), RecordType::MX));
    }
}
