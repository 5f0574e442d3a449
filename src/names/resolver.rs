//! Identity resolution: name tokens to addresses and back.
//!
//! A token ending in the configured suffix (`.eth`) is a name. Anything else
//! is a literal and passes through untouched. Lookups that fail or return no
//! candidate fall back to the literal token. Batches are rejected whole when
//! two tokens land on the same address.

use futures_util::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use crate::names::client::{NameError, NameService};
use crate::observability::metrics;

/// Batch resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no addresses given")]
    Empty,

    #[error("duplicate address {address} (from {})", .tokens.join(", "))]
    DuplicateAddress { address: String, tokens: Vec<String> },
}

/// A name token split into directory coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameToken<'a> {
    pub label: &'a str,
    pub domain: &'a str,
}

/// Resolves comma-separated recipient lists against a [`NameService`].
#[derive(Clone)]
pub struct IdentityResolver {
    names: Arc<dyn NameService>,
    suffix: String,
    domain: String,
}

impl IdentityResolver {
    /// `suffix` marks name tokens; `domain` is where claims are made.
    pub fn new(names: Arc<dyn NameService>, suffix: &str, domain: &str) -> Self {
        Self {
            names,
            suffix: suffix.to_string(),
            domain: domain.to_string(),
        }
    }

    pub fn is_name(&self, token: &str) -> bool {
        token.len() > self.suffix.len() && token.ends_with(&self.suffix)
    }

    /// Split `alice.luca.eth` into label `alice` and domain `luca.eth`.
    pub fn parse_name<'a>(&self, token: &'a str) -> Option<NameToken<'a>> {
        if !self.is_name(token) {
            return None;
        }
        let (label, domain) = token.split_once('.')?;
        if label.is_empty() || domain.is_empty() {
            return None;
        }
        Some(NameToken { label, domain })
    }

    /// Resolve a single token, degrading to the token itself.
    pub async fn resolve_one(&self, token: &str) -> String {
        let Some(name) = self.parse_name(token) else {
            metrics::record_resolution("literal");
            return token.to_string();
        };

        match self.names.search(name.domain, name.label).await {
            Ok(records) => match records.into_iter().find(|r| !r.address.is_empty()) {
                Some(record) => {
                    metrics::record_resolution("resolved");
                    tracing::debug!(token = %token, address = %record.address, "Name resolved");
                    record.address
                }
                None => {
                    metrics::record_resolution("fallback");
                    tracing::warn!(token = %token, "Name has no bound address, using input as-is");
                    token.to_string()
                }
            },
            Err(e) => {
                metrics::record_resolution("fallback");
                tracing::warn!(
                    token = %token,
                    error = %e,
                    "Failed to resolve name, using input as-is"
                );
                token.to_string()
            }
        }
    }

    /// Resolve every comma-separated token concurrently, preserving order.
    ///
    /// Fails when the list is empty or when two tokens resolve to the same
    /// address (compared case-insensitively).
    pub async fn resolve_batch(&self, input: &str) -> Result<Vec<String>, ResolveError> {
        let tokens = split_tokens(input);
        if tokens.is_empty() {
            return Err(ResolveError::Empty);
        }

        let resolved = join_all(tokens.iter().map(|t| self.resolve_one(t))).await;
        ensure_unique(&tokens, &resolved)?;
        Ok(resolved)
    }

    /// First name bound to `address`, as `(label, domain)`.
    pub async fn reverse(&self, address: &str) -> Result<Option<(String, String)>, NameError> {
        let records = self.names.names_for(address).await?;
        Ok(records
            .into_iter()
            .find(|r| !r.name.is_empty())
            .map(|r| (r.name, r.domain)))
    }

    /// Claim `label` under the configured domain for `address`.
    pub async fn claim(&self, label: &str, address: &str) -> Result<(), NameError> {
        self.names.claim(&self.domain, label, address).await
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn names(&self) -> &Arc<dyn NameService> {
        &self.names
    }
}

/// Trimmed, non-empty tokens of a comma-separated list.
pub fn split_tokens(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn ensure_unique(tokens: &[String], resolved: &[String]) -> Result<(), ResolveError> {
    for (i, address) in resolved.iter().enumerate() {
        let key = address.to_ascii_lowercase();
        let clashes: Vec<String> = resolved
            .iter()
            .enumerate()
            .filter(|(_, other)| other.to_ascii_lowercase() == key)
            .map(|(j, _)| tokens[j].clone())
            .collect();
        if clashes.len() > 1 {
            tracing::warn!(address = %resolved[i], tokens = ?clashes, "Duplicate address in batch");
            return Err(ResolveError::DuplicateAddress {
                address: address.clone(),
                tokens: clashes,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::client::NameRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";
    const LITERAL: &str = "0xABC0000000000000000000000000000000000abc";

    #[derive(Default)]
    struct FakeNames {
        bindings: HashMap<(String, String), String>,
        failing: bool,
        lookups: AtomicUsize,
    }

    impl FakeNames {
        fn with(mut self, label: &str, address: &str) -> Self {
            self.bindings
                .insert(("luca.eth".to_string(), label.to_string()), address.to_string());
            self
        }
    }

    #[async_trait]
    impl NameService for FakeNames {
        async fn search(&self, domain: &str, name: &str) -> Result<Vec<NameRecord>, NameError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(NameError::Status {
                    status: 500,
                    body: "down".to_string(),
                });
            }
            Ok(self
                .bindings
                .get(&(domain.to_string(), name.to_string()))
                .map(|address| NameRecord {
                    name: name.to_string(),
                    domain: domain.to_string(),
                    address: address.clone(),
                })
                .into_iter()
                .collect())
        }

        async fn names_for(&self, address: &str) -> Result<Vec<NameRecord>, NameError> {
            Ok(self
                .bindings
                .iter()
                .filter(|(_, a)| a.eq_ignore_ascii_case(address))
                .map(|((domain, name), a)| NameRecord {
                    name: name.clone(),
                    domain: domain.clone(),
                    address: a.clone(),
                })
                .collect())
        }

        async fn claim(&self, _domain: &str, _name: &str, _address: &str) -> Result<(), NameError> {
            Ok(())
        }
    }

    fn resolver(names: FakeNames) -> IdentityResolver {
        IdentityResolver::new(Arc::new(names), ".eth", "luca.eth")
    }

    #[test]
    fn test_parse_name() {
        let r = resolver(FakeNames::default());
        let token = r.parse_name("alice.luca.eth").unwrap();
        assert_eq!(token.label, "alice");
        assert_eq!(token.domain, "luca.eth");
        assert!(r.parse_name(".eth").is_none());
        assert!(r.parse_name(LITERAL).is_none());
    }

    #[test]
    fn test_split_tokens_trims_and_drops_empty() {
        assert_eq!(split_tokens(" a , b,, c ,"), vec!["a", "b", "c"]);
        assert!(split_tokens(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let r = resolver(FakeNames::default().with("alice", ALICE).with("bob", BOB));
        let out = r
            .resolve_batch(&format!("alice.luca.eth, {}, bob.luca.eth", LITERAL))
            .await
            .unwrap();
        assert_eq!(out, vec![ALICE, LITERAL, BOB]);
    }

    #[tokio::test]
    async fn test_batch_rejects_shared_address() {
        let r = resolver(FakeNames::default().with("alice", ALICE).with("bob", ALICE));
        let err = r
            .resolve_batch("alice.luca.eth, bob.luca.eth")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::DuplicateAddress {
                address: ALICE.to_string(),
                tokens: vec!["alice.luca.eth".to_string(), "bob.luca.eth".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_duplicates_compare_case_insensitively() {
        let r = resolver(FakeNames::default().with("alice", LITERAL));
        let err = r
            .resolve_batch(&format!("alice.luca.eth, {}", LITERAL.to_lowercase()))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateAddress { .. }));
    }

    #[tokio::test]
    async fn test_literals_pass_through_without_lookup() {
        let names = Arc::new(FakeNames::default());
        let r = IdentityResolver::new(names.clone(), ".eth", "luca.eth");
        assert_eq!(r.resolve_one(LITERAL).await, LITERAL);
        assert_eq!(r.resolve_one("carol.luca.xyz").await, "carol.luca.xyz");
        assert_eq!(names.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_token() {
        let r = resolver(FakeNames {
            failing: true,
            ..FakeNames::default()
        });
        assert_eq!(r.resolve_one("alice.luca.eth").await, "alice.luca.eth");
    }

    #[tokio::test]
    async fn test_unbound_name_falls_back_to_token() {
        let r = resolver(FakeNames::default());
        let out = r.resolve_batch("ghost.luca.eth").await.unwrap();
        assert_eq!(out, vec!["ghost.luca.eth"]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let r = resolver(FakeNames::default());
        assert_eq!(r.resolve_batch(" , ").await.unwrap_err(), ResolveError::Empty);
    }

    #[tokio::test]
    async fn test_reverse_lookup() {
        let r = resolver(FakeNames::default().with("alice", ALICE));
        assert_eq!(
            r.reverse(ALICE).await.unwrap(),
            Some(("alice".to_string(), "luca.eth".to_string()))
        );
        assert_eq!(r.reverse(BOB).await.unwrap(), None);
    }
}
