//! The `Entity` trait: identity derivation and encoding for stored records
//!
//! An entity value doubles as a descriptor of "what to find, store, or
//! delete". A lookup descriptor only needs its identifying fields set; the
//! payload matters on writes.

use strata_core::{StrataError, StrataResult};

/// A record type that can live in an entity store
///
/// Implementations must round-trip: `decode(&e.encode()?, key)` yields an
/// entity with the same keys and payload as `e`.
///
/// # Example
///
/// ```
/// use strata_core::{StrataError, StrataResult};
/// use strata_kv::Entity;
///
/// struct Org {
///     id: String,
///     name: String,
/// }
///
/// impl Entity for Org {
///     fn primary_key(&self) -> StrataResult<Vec<u8>> {
///         if self.id.is_empty() {
///             return Err(StrataError::invalid_input("org id is required"));
///         }
///         Ok(self.id.as_bytes().to_vec())
///     }
///
///     fn unique_key(&self) -> StrataResult<Vec<u8>> {
///         if self.name.is_empty() {
///             return Err(StrataError::invalid_input("org name is required"));
///         }
///         Ok(self.name.as_bytes().to_vec())
///     }
///
///     fn encode(&self) -> StrataResult<Vec<u8>> {
///         Ok(format!("{}\n{}", self.id, self.name).into_bytes())
///     }
///
///     fn decode(bytes: &[u8], _key: Option<&[u8]>) -> StrataResult<Self> {
///         let text = std::str::from_utf8(bytes)
///             .map_err(|e| StrataError::serialization(e.to_string()))?;
///         let (id, name) = text
///             .split_once('\n')
///             .ok_or_else(|| StrataError::serialization("missing separator"))?;
///         Ok(Org { id: id.to_string(), name: name.to_string() })
///     }
/// }
///
/// let org = Org { id: "1".into(), name: "acme".into() };
/// let decoded = Org::decode(&org.encode().unwrap(), None).unwrap();
/// assert_eq!(decoded.name, "acme");
/// ```
pub trait Entity: Sized {
    /// Bytes of the primary key
    ///
    /// Fails with `InvalidInput` when the identifying fields are absent.
    fn primary_key(&self) -> StrataResult<Vec<u8>>;

    /// Bytes of the secondary unique key
    ///
    /// Types that never take part in a unique index keep the default, which
    /// always fails with `InvalidInput`.
    fn unique_key(&self) -> StrataResult<Vec<u8>> {
        Err(StrataError::invalid_input("entity has no unique key"))
    }

    /// Encode the payload for storage
    fn encode(&self) -> StrataResult<Vec<u8>>;

    /// Rebuild an entity from stored bytes and, when known, its primary key
    fn decode(bytes: &[u8], key: Option<&[u8]>) -> StrataResult<Self>;
}
