//! Refreshes a wallet's ledger-observed state.
//!
//! Every operation replaces its slice of state in one write once all ledger
//! calls for it have returned, so repeated runs never accumulate and a
//! reader never sees a half-applied refresh.

use coffer_ledger_client::{LedgerError, TokenBalance, TokenMetadata, WalletIdentifier, WalletRecord};
use coffer_types::{Address, DecimalValue, PublicKey};
use futures_util::future::join_all;
use std::collections::BTreeMap;

use crate::data::{Restoration, VotingState, WalletBalance, WalletToken};
use crate::error::WalletError;
use crate::wallet::Wallet;

/// What `identity()` did with the wallet's cached record.
#[derive(Debug)]
pub enum IdentitySync {
    /// The ledger answered and the cached record was replaced.
    Refreshed,
    /// The lookup failed; the previously cached identity is untouched.
    /// `reason` tells a wallet unknown to the ledger apart from an
    /// unreachable node (see [`WalletError::is_not_found`]).
    Preserved { reason: WalletError },
}

impl IdentitySync {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed)
    }
}

#[derive(Debug, Default)]
pub struct TokenSyncReport {
    pub synced: Vec<Address>,
    /// One `PartialTokenSyncFailure` per token that was dropped.
    pub skipped: Vec<WalletError>,
}

pub struct WalletSynchroniser<'a> {
    wallet: &'a Wallet,
}

impl<'a> WalletSynchroniser<'a> {
    pub(crate) fn new(wallet: &'a Wallet) -> Self {
        Self { wallet }
    }

    /// Refresh the cached ledger record.
    ///
    /// A failed lookup keeps the last known identity. Either way the wallet
    /// ends up fully restored: "not found" is a final answer, not a reason to
    /// stay partially restored. Only a missing ledger client is an error.
    pub async fn identity(&self) -> Result<IdentitySync, WalletError> {
        let client = self.wallet.ledger_client()?;
        let identifier = self.wallet.ledger_identifier();
        let address = self.wallet.address();
        let decimals = self.wallet.network().decimals;

        let fetched = match client.wallet(&identifier).await {
            Ok(record) => parse_identity(record, decimals),
            Err(source) => Err(WalletError::LedgerLookupFailed {
                address: address.clone(),
                source,
            }),
        };

        let extended = self.wallet.network().uses_extended_public_key;
        let mut state = self.wallet.write();
        let outcome = match fetched {
            Ok((record, balance, nonce)) => {
                if !extended {
                    if let Some(key) = &record.public_key {
                        state.data.public_key = Some(key.clone());
                    }
                    state.data.balance = balance;
                    state.data.nonce = nonce;
                }
                state.identity.record = Some(record);
                IdentitySync::Refreshed
            }
            Err(reason) => {
                tracing::warn!(%address, error = %reason, "identity sync failed, keeping last known state");
                IdentitySync::Preserved { reason }
            }
        };
        if state.restoration != Restoration::Full {
            tracing::info!(%address, "wallet fully restored");
        }
        state.restoration = Restoration::Full;
        Ok(outcome)
    }

    /// Overwrite the voting state. Errors propagate and leave it untouched.
    pub async fn votes(&self) -> Result<(), WalletError> {
        let client = self.wallet.ledger_client()?;
        let address = self.wallet.address();
        let report = client.votes(&address).await?;

        self.wallet.write().votes = VotingState {
            available: report.available,
            votes: report.votes,
            used: report.used,
        };
        Ok(())
    }

    /// Replace the token collection.
    ///
    /// Failing to list balances is an error. A token whose metadata cannot be
    /// resolved is logged and left out; the rest of the batch still lands.
    pub async fn tokens(&self) -> Result<TokenSyncReport, WalletError> {
        let client = self.wallet.ledger_client()?;
        let address = self.wallet.address();
        let balances = client.tokens(&address).await?;

        let resolved = join_all(balances.into_iter().map(|balance| {
            let client = client.clone();
            async move {
                let metadata = client
                    .token_by_contract_address(&balance.contract_address)
                    .await;
                (balance, metadata)
            }
        }))
        .await;

        let mut report = TokenSyncReport::default();
        let mut tokens = Vec::with_capacity(resolved.len());
        for (balance, metadata) in resolved {
            match metadata
                .map_err(|source| WalletError::PartialTokenSyncFailure {
                    contract_address: balance.contract_address.clone(),
                    source,
                })
                .and_then(|metadata| token(&balance, metadata))
            {
                Ok(token) => {
                    tracing::debug!(contract = %token.contract_address, symbol = %token.symbol, "token synced");
                    report.synced.push(token.contract_address.clone());
                    tokens.push(token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping token");
                    report.skipped.push(e);
                }
            }
        }

        self.wallet.write().tokens = tokens;
        Ok(report)
    }

    /// Cache the ledger records of every multi-signature participant.
    ///
    /// Does nothing for a wallet without a registered multi-signature. A
    /// participant the ledger does not know is simply not cached.
    pub async fn multi_signature(&self) -> Result<(), WalletError> {
        let descriptor = match self.wallet.multi_signature().all() {
            Ok(descriptor) => descriptor,
            Err(WalletError::NotRegistered) => return Ok(()),
            Err(e) => return Err(e),
        };
        let client = self.wallet.ledger_client()?;

        let keys = descriptor.public_keys();
        let lookups = join_all(keys.iter().map(|key| {
            let client = client.clone();
            async move {
                let record = client.wallet(&WalletIdentifier::public_key(key)).await;
                (key.clone(), record)
            }
        }))
        .await;

        let mut participants: BTreeMap<PublicKey, WalletRecord> = BTreeMap::new();
        for (key, record) in lookups {
            match record {
                Ok(record) => {
                    participants.insert(key, record);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(public_key = %key, "participant unknown to the ledger");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.wallet.write().identity.participants = participants;
        Ok(())
    }
}

fn parse_identity(
    record: WalletRecord,
    decimals: u32,
) -> Result<(WalletRecord, WalletBalance, DecimalValue), WalletError> {
    let balance = WalletBalance {
        available: DecimalValue::from_raw_str(&record.balance.available, decimals)?,
        fees: DecimalValue::from_raw_str(&record.balance.fees, decimals)?,
    };
    let nonce = DecimalValue::from_raw_str(&record.nonce, 0)?;
    Ok((record, balance, nonce))
}

fn token(
    balance: &TokenBalance,
    metadata: TokenMetadata,
) -> Result<WalletToken, WalletError> {
    let amount = DecimalValue::from_raw_str(&balance.balance, metadata.decimals).map_err(|e| {
        WalletError::PartialTokenSyncFailure {
            contract_address: balance.contract_address.clone(),
            source: LedgerError::InvalidResponse(e.to_string()),
        }
    })?;
    Ok(WalletToken {
        contract_address: balance.contract_address.clone(),
        name: metadata.name,
        symbol: metadata.symbol,
        decimals: metadata.decimals,
        balance: amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use coffer_ledger_client::VoteReport;
    use coffer_nullables::NullLedgerClient;
    use std::sync::Arc;

    fn client() -> Arc<NullLedgerClient> {
        Arc::new(NullLedgerClient::new())
    }

    #[tokio::test]
    async fn identity_refresh_overwrites_key_balance_and_nonce() {
        let ledger = client();
        ledger.set_wallet(ADDRESS, record());
        let wallet = wallet_with(ledger);

        let outcome = wallet.synchroniser().identity().await.unwrap();
        assert!(outcome.is_refreshed());
        assert!(wallet.restoration().full());
        assert!(wallet.has_synced_with_network());
        assert_eq!(wallet.public_key(), Some(PUBLIC_KEY.into()));
        assert_eq!(wallet.balance().available, "1.5".parse::<DecimalValue>().unwrap());
        assert_eq!(wallet.nonce(), DecimalValue::from(7u64));
    }

    #[tokio::test]
    async fn failed_lookup_preserves_previous_identity() {
        let ledger = client();
        let mut first = record();
        first.username = Some("genesis_1".into());
        ledger.set_wallet(ADDRESS, first);
        let wallet = wallet_with(ledger.clone());
        wallet.synchroniser().identity().await.unwrap();

        ledger.fail_wallet(ADDRESS, LedgerError::Unreachable("timeout".into()));
        let outcome = wallet.synchroniser().identity().await.unwrap();

        match outcome {
            IdentitySync::Preserved { reason } => assert!(!reason.is_not_found()),
            other => panic!("expected preserved, got {other:?}"),
        }
        assert_eq!(wallet.username().unwrap().as_deref(), Some("genesis_1"));
        assert!(wallet.restoration().full());
    }

    #[tokio::test]
    async fn unknown_wallet_is_fully_restored_but_not_synchronized() {
        let wallet = wallet_with(client());

        let outcome = wallet.synchroniser().identity().await.unwrap();
        match outcome {
            IdentitySync::Preserved { reason } => assert!(reason.is_not_found()),
            other => panic!("expected preserved, got {other:?}"),
        }
        assert!(wallet.restoration().full());
        assert!(!wallet.restoration().partial());
        assert!(matches!(wallet.is_multi_signature(), Err(WalletError::NotSynchronized)));
    }

    #[tokio::test]
    async fn extended_key_networks_keep_local_balance() {
        let ledger = client();
        let wallet = Wallet::new(
            ADDRESS.into(),
            coffer_types::NetworkProfile::new("btc.livenet", "BTC", 8).with_extended_public_key(),
            crate::data::ImportMethod::Mnemonic {
                derivation: crate::data::Derivation::Bip44,
                encrypted: false,
            },
            crate::wallet::WalletServices::default(),
        );
        wallet.mutator().ledger_client(ledger.clone());
        wallet.mutator().set_public_key("xpub6CUGRU".into());
        ledger.set_wallet("xpub6CUGRU", record());

        let outcome = wallet.synchroniser().identity().await.unwrap();
        assert!(outcome.is_refreshed());
        assert_eq!(wallet.public_key(), Some("xpub6CUGRU".into()));
        assert!(wallet.balance().available.is_zero());
        assert!(wallet.has_synced_with_network());
    }

    #[tokio::test]
    async fn identity_without_client_fails() {
        let wallet = Wallet::new(
            ADDRESS.into(),
            Default::default(),
            crate::data::ImportMethod::Address,
            Default::default(),
        );
        assert!(matches!(
            wallet.synchroniser().identity().await,
            Err(WalletError::NoLedgerClient)
        ));
        assert_eq!(wallet.restoration(), Restoration::Pending);
    }

    #[tokio::test]
    async fn votes_overwrite_and_errors_propagate() {
        let ledger = client();
        ledger.set_votes(
            ADDRESS.into(),
            VoteReport {
                available: 0,
                votes: vec!["genesis_3".into()],
                used: 1,
            },
        );
        let wallet = wallet_with(ledger.clone());
        wallet.synchroniser().votes().await.unwrap();
        assert_eq!(wallet.votes().votes, vec!["genesis_3".to_string()]);
        assert_eq!(wallet.votes().used, 1);

        ledger.fail_votes(ADDRESS.into(), LedgerError::Unreachable("down".into()));
        assert!(wallet.synchroniser().votes().await.is_err());
        assert_eq!(wallet.votes().used, 1);
    }

    #[tokio::test]
    async fn one_bad_token_does_not_abort_the_batch() {
        let ledger = client();
        ledger.set_tokens(
            ADDRESS.into(),
            vec![
                TokenBalance {
                    contract_address: "0xgood".into(),
                    balance: "2500".into(),
                },
                TokenBalance {
                    contract_address: "0xbad".into(),
                    balance: "1".into(),
                },
            ],
        );
        ledger.set_token_metadata(TokenMetadata {
            contract_address: "0xgood".into(),
            name: "Good Token".into(),
            symbol: "GOOD".into(),
            decimals: 2,
        });
        ledger.fail_token_metadata("0xbad".into(), LedgerError::Unreachable("boom".into()));
        let wallet = wallet_with(ledger.clone());

        let report = wallet.synchroniser().tokens().await.unwrap();
        assert_eq!(report.synced, vec![Address::from("0xgood")]);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(
            report.skipped[0],
            WalletError::PartialTokenSyncFailure { .. }
        ));

        let tokens = wallet.tokens();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].balance, DecimalValue::from(25u64));

        // A second run replaces rather than appends.
        wallet.synchroniser().tokens().await.unwrap();
        assert_eq!(wallet.tokens().len(), 1);
    }

    #[tokio::test]
    async fn large_supply_tokens_are_kept() {
        let ledger = client();
        // 10^30 raw units at 18 decimals, well past 2^96.
        let raw = format!("1{}", "0".repeat(30));
        ledger.set_tokens(
            ADDRESS.into(),
            vec![TokenBalance {
                contract_address: "0xwhale".into(),
                balance: raw.clone(),
            }],
        );
        ledger.set_token_metadata(TokenMetadata {
            contract_address: "0xwhale".into(),
            name: "Whale".into(),
            symbol: "WHL".into(),
            decimals: 18,
        });
        let wallet = wallet_with(ledger);

        let report = wallet.synchroniser().tokens().await.unwrap();
        assert!(report.skipped.is_empty());
        let tokens = wallet.tokens();
        assert_eq!(tokens[0].balance, DecimalValue::from(1_000_000_000_000u64));
        assert_eq!(tokens[0].balance.to_raw_string(18).unwrap(), raw);
    }

    #[tokio::test]
    async fn participant_records_are_cached() {
        let ledger = client();
        ledger.set_wallet(ADDRESS, multisig_record(simple(2, &[PUBLIC_KEY, "pk-b", "pk-c"])));
        let mut b = coffer_ledger_client::WalletRecord::new("Dbbb".into());
        b.username = Some("bob".into());
        ledger.set_wallet("pk-b", b);
        let wallet = wallet_with(ledger.clone());
        wallet.synchroniser().identity().await.unwrap();

        wallet.synchroniser().multi_signature().await.unwrap();

        let participants = wallet.multi_signature().participants().unwrap();
        assert_eq!(participants.len(), 3);
        assert_eq!(participants[1].username.as_deref(), Some("bob"));
        assert_eq!(participants[2].address, None);
    }

    #[tokio::test]
    async fn multi_signature_sync_is_a_no_op_without_registration() {
        let ledger = client();
        ledger.set_wallet(ADDRESS, record());
        let wallet = wallet_with(ledger.clone());
        wallet.synchroniser().identity().await.unwrap();
        wallet.synchroniser().multi_signature().await.unwrap();
        assert_eq!(ledger.call_count("wallet:"), 1);
    }
}
