//! Codec for composite column values.
//!
//! Lists of strings and key material are stored as JSON in a single binary column. Only
//! `decode(encode(x)) == x` is guaranteed; the bytes themselves are opaque to callers.
use serde::{de::DeserializeOwned, Serialize};
use storage::{Error, StorageErrorKind};

/// Serializes `value` for storage in the column named by `field` (`"table.column"`).
pub(crate) fn encode<T>(value: &T, field: &str) -> Result<Vec<u8>, Error>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value)
        .map_err(|e| Error::with_source(StorageErrorKind::Encode(field.to_string()), e))
}

/// Malformed bytes are an integrity fault, reported as `Decode` naming the field.
pub(crate) fn decode<T>(bytes: &[u8], field: &str) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes)
        .map_err(|e| Error::with_source(StorageErrorKind::Decode(field.to_string()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use storage::{JsonWebKey, VerificationKey};

    #[test]
    fn string_lists_survive_a_round_trip() {
        let scopes = vec!["openid".to_string(), "email".to_string()];
        let bytes = encode(&scopes, "auth_request.scopes").unwrap();
        let decoded: Vec<String> = decode(&bytes, "auth_request.scopes").unwrap();
        assert_eq!(decoded, scopes);
    }

    #[test]
    fn empty_lists_stay_empty() {
        let bytes = encode(&Vec::<String>::new(), "client.trusted_peers").unwrap();
        let decoded: Vec<String> = decode(&bytes, "client.trusted_peers").unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn key_material_survives_a_round_trip() {
        let keys = vec![VerificationKey {
            public_key: JsonWebKey {
                key_id: "k1".to_string(),
                algorithm: "RS256".to_string(),
                key_use: "sig".to_string(),
                key: vec![0, 1, 2, 254, 255],
            },
            expiry: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        }];
        let bytes = encode(&keys, "keys.verification_keys").unwrap();
        let decoded: Vec<VerificationKey> = decode(&bytes, "keys.verification_keys").unwrap();
        assert_eq!(decoded, keys);

        let none: Option<JsonWebKey> = None;
        let bytes = encode(&none, "keys.signing_key").unwrap();
        assert_eq!(
            decode::<Option<JsonWebKey>>(&bytes, "keys.signing_key").unwrap(),
            None
        );
    }

    #[test]
    fn malformed_bytes_name_the_field() {
        let err = decode::<Vec<String>>(b"{not json", "client.redirect_uris").unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Decode("client.redirect_uris".to_string())
        );
        assert!(!err.is_not_found());
    }
}
