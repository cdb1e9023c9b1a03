//! Row models for the identity storage tables.
//!
//! Composite fields (string lists, key material) are held as opaque serialized bytes; the
//! `entity_api` codec owns their format.

pub mod auth_codes;
pub mod auth_requests;
pub mod clients;
pub mod keys;
pub mod refresh_tokens;

/// A type alias that represents any Entity's primary key. Identifiers are opaque strings
/// generated by the caller before creation.
pub type Id = String;

/// Primary key of the only row ever stored in the `keys` table.
pub const KEYS_ROW_ID: &str = "keys";
