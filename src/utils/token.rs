use sha2::{Digest, Sha256};

/// Hash an opaque bearer token for storage/lookup so the raw secret never
/// touches the database.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex_encode(&digest)
}

/// Short, stable cache key for an access-token cache entry keyed on
/// `(client_id, refresh_token)` per the pool engine's 55-minute cache.
pub fn hash_credential_pair(client_id: &str, refresh_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(b":");
    hasher.update(refresh_token.as_bytes());
    hex_encode(&hasher.finalize())[..16].to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("sk-abc"), hash_token("sk-abc"));
        assert_ne!(hash_token("sk-abc"), hash_token("sk-def"));
    }

    #[test]
    fn hash_credential_pair_is_short() {
        let h = hash_credential_pair("client-1", "refresh-1");
        assert_eq!(h.len(), 16);
    }
}
