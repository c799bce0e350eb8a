//! Seams between the wallet engine and the outside world.
//!
//! - [`LedgerClient`]: queries against a remote ledger node.
//! - [`ExchangeRateConverter`]: historical fiat/alt-currency conversion.
//! - [`KnownWalletService`]: well-known addresses (exchanges, team wallets).
//!
//! The records these seams exchange live in [`records`]. [`HttpLedgerClient`]
//! is a JSON-over-HTTP [`LedgerClient`]; [`RateTable`] and [`KnownWallets`]
//! are in-memory implementations of the other two seams.

pub mod client;
pub mod error;
pub mod exchange;
pub mod http;
pub mod known_wallets;
pub mod records;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use exchange::{ExchangeRateConverter, RateTable};
pub use http::HttpLedgerClient;
pub use known_wallets::{KnownWallet, KnownWalletKind, KnownWalletService, KnownWallets};
pub use records::{
    IdentifierKind, Pagination, ParticipantSignature, RawBalance, RawRecipient, RawTransaction,
    RecordStatus, SignedTransaction, TokenBalance, TokenMetadata, TransactionKind,
    TransactionMeta, TransactionPage, TransactionQuery, VoteReport, WalletIdentifier,
    WalletRecord,
};
