//! Nullable infrastructure for deterministic testing.
//!
//! The wallet engine reaches the outside world only through the seams in
//! `coffer-ledger-client`. This crate provides test-friendly implementations
//! of those seams that:
//! - Return whatever the test programmed, and nothing else
//! - Can be made to fail on demand
//! - Record the calls they receive for assertions
//! - Never touch the network
//!
//! Usage: hand an `Arc<NullLedgerClient>` to a wallet instead of an
//! `HttpLedgerClient`.

pub mod exchange;
pub mod ledger;

pub use exchange::NullExchangeRates;
pub use ledger::NullLedgerClient;
