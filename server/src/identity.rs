use ntex::web::HttpRequest;
use rand::RngCore;
use sha2::{Digest, Sha256};

const UNKNOWN_ADDR: &str = "unknown";

/// Salted hash of a caller's network address. Linkable across requests,
/// but never stores the raw address.
pub fn hash_address(addr: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(addr.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Picks the caller address from proxy headers first, then the socket peer.
pub fn client_address(req: &HttpRequest) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| header("x-forwarded-for"))
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_ADDR.to_string())
}

pub fn identity_hash(req: &HttpRequest, salt: &str) -> String {
    hash_address(&client_address(req), salt)
}

pub fn random_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntex::web::test::TestRequest;

    #[test]
    fn test_hash_is_salted_and_stable() {
        let a = hash_address("203.0.113.7", "salt-a");
        assert_eq!(a, hash_address("203.0.113.7", "salt-a"));
        assert_ne!(a, hash_address("203.0.113.7", "salt-b"));
        assert_ne!(a, hash_address("203.0.113.8", "salt-a"));
        assert_eq!(a.len(), 64);
        assert!(!a.contains("203.0.113.7"));
    }

    fn address_of(headers: &[(&str, &str)]) -> String {
        let mut req = TestRequest::default();
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        client_address(&req.to_http_request())
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let addr = address_of(&[
            ("x-forwarded-for", "198.51.100.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(addr, "203.0.113.7");
    }

    #[test]
    fn test_first_forwarded_entry_is_used() {
        assert_eq!(address_of(&[("x-forwarded-for", "a, b")]), "a");
        assert_eq!(
            address_of(&[("x-forwarded-for", " 198.51.100.1 ,10.0.0.1")]),
            "198.51.100.1"
        );
    }

    #[test]
    fn test_empty_headers_fall_through() {
        let addr = address_of(&[("cf-connecting-ip", ""), ("x-forwarded-for", "198.51.100.1")]);
        assert_eq!(addr, "198.51.100.1");

        let addr = address_of(&[("cf-connecting-ip", " "), ("x-forwarded-for", ", 10.0.0.1")]);
        assert_eq!(addr, UNKNOWN_ADDR);

        assert_eq!(address_of(&[]), UNKNOWN_ADDR);
    }

    #[test]
    fn test_random_salt() {
        let salt = random_salt();
        assert_eq!(salt.len(), 32);
        assert_ne!(salt, random_salt());
    }
}
