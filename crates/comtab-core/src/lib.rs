//! # comtab-core — Canonical Commissioning Model
//!
//! Institution-independent representation of a commissioning table row
//! ([`CanonicalItem`]), the identity key that decides when two rows are the
//! same product ([`IdentityKey`]), and the diff engine that turns an
//! internal-table snapshot plus a bank report into a list of open / close /
//! close+reopen actions ([`diff`]).
//!
//! Everything in this crate is pure: no I/O, no clocks, no network. The
//! institution adapters in `comtab-banks` map spreadsheets into
//! [`CanonicalItem`]s and render [`DiffAction`]s back into output rows.

pub mod diff;
pub mod identity;
pub mod item;
pub mod percent;

pub use diff::{diff, Action, DiffAction};
pub use identity::IdentityKey;
pub use item::CanonicalItem;
pub use percent::parse_percent_br;
