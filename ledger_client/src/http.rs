//! JSON-over-HTTP ledger client.
//!
//! Every endpoint answers with a `{ "data": ... }` envelope; list endpoints add
//! a `meta` object carrying pagination.

use async_trait::async_trait;
use coffer_types::{Address, PublicKey};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::records::{
    IdentifierKind, Pagination, RawTransaction, SignedTransaction, TokenBalance, TokenMetadata,
    TransactionPage, TransactionQuery, VoteReport, WalletIdentifier, WalletRecord,
};
use crate::{LedgerClient, LedgerError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    meta: Option<Pagination>,
}

/// HTTP client for a ledger node's REST API.
#[derive(Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// Create a client targeting the given base URL (e.g. `https://dwallets.ark.io/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Other(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, LedgerError> {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    LedgerError::Unreachable(e.to_string())
                } else {
                    LedgerError::Other(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LedgerError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{path}: {e}")))
    }

    fn query_pairs(query: &TransactionQuery) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        for identifier in &query.identifiers {
            let key = match identifier.kind {
                IdentifierKind::Address => "address",
                IdentifierKind::PublicKey => "publicKey",
                IdentifierKind::ExtendedPublicKey => "extendedPublicKey",
            };
            pairs.push((key, identifier.value.clone()));
        }
        if let Some(sender) = &query.sender {
            pairs.push(("senderId", sender.to_string()));
        }
        if let Some(recipient) = &query.recipient {
            pairs.push(("recipientId", recipient.to_string()));
        }
        if let Some(from) = query.from {
            pairs.push(("timestamp.from", from.as_secs().to_string()));
        }
        if let Some(to) = query.to {
            pairs.push(("timestamp.to", to.as_secs().to_string()));
        }
        if let Some(page) = query.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = query.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn wallet(&self, identifier: &WalletIdentifier) -> Result<WalletRecord, LedgerError> {
        let mut query = Vec::new();
        if let Some(method) = &identifier.method {
            query.push(("method", method.clone()));
        }
        let envelope = self
            .get::<WalletRecord>(&format!("wallets/{}", identifier.value), &query)
            .await?;
        Ok(envelope.data)
    }

    async fn transactions(&self, query: &TransactionQuery) -> Result<TransactionPage, LedgerError> {
        let envelope = self
            .get::<Vec<RawTransaction>>("transactions", &Self::query_pairs(query))
            .await?;
        Ok(TransactionPage::new(
            envelope.data,
            envelope.meta.unwrap_or_default(),
        ))
    }

    async fn transaction(&self, id: &str) -> Result<RawTransaction, LedgerError> {
        let envelope = self
            .get::<RawTransaction>(&format!("transactions/{id}"), &[])
            .await?;
        Ok(envelope.data)
    }

    async fn votes(&self, address: &Address) -> Result<VoteReport, LedgerError> {
        let envelope = self
            .get::<VoteReport>(&format!("wallets/{address}/votes"), &[])
            .await?;
        Ok(envelope.data)
    }

    async fn tokens(&self, address: &Address) -> Result<Vec<TokenBalance>, LedgerError> {
        let envelope = self
            .get::<Vec<TokenBalance>>(&format!("wallets/{address}/tokens"), &[])
            .await?;
        Ok(envelope.data)
    }

    async fn token_by_contract_address(
        &self,
        contract_address: &Address,
    ) -> Result<TokenMetadata, LedgerError> {
        let envelope = self
            .get::<TokenMetadata>(&format!("tokens/{contract_address}"), &[])
            .await?;
        Ok(envelope.data)
    }

    async fn pending_multi_signatures(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<SignedTransaction>, LedgerError> {
        let envelope = self
            .get::<Vec<SignedTransaction>>(
                &format!("multi-signatures/{public_key}/pending"),
                &[],
            )
            .await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client = HttpLedgerClient::new("http://127.0.0.1:4003/api/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:4003/api");
        assert_eq!(client.url("/wallets/D1"), "http://127.0.0.1:4003/api/wallets/D1");
    }

    #[test]
    fn query_pairs_cover_every_filter() {
        let query = TransactionQuery {
            identifiers: vec![WalletIdentifier::address(&"D1".into())],
            sender: Some("D2".into()),
            recipient: None,
            from: None,
            to: None,
            page: Some(2),
            limit: Some(15),
        };
        let pairs = HttpLedgerClient::query_pairs(&query);
        assert_eq!(
            pairs,
            vec![
                ("address", "D1".to_string()),
                ("senderId", "D2".to_string()),
                ("page", "2".to_string()),
                ("limit", "15".to_string()),
            ]
        );
    }

    #[test]
    fn envelope_parses_list_with_meta() {
        let json = r#"{"data":[],"meta":{"self":1,"next":2,"prev":null,"last":5}}"#;
        let envelope: Envelope<Vec<RawTransaction>> = serde_json::from_str(json).unwrap();
        let meta = envelope.meta.unwrap();
        assert_eq!(meta.next, Some(2));
        assert_eq!(meta.current, Some(1));
    }
}
