use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// `Authorization` value for WooCommerce consumer key/secret pairs.
pub fn basic_auth_header(key: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{key}:{secret}")))
}

pub fn bearer_header(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_key_and_secret() {
        assert_eq!(basic_auth_header("ck_a", "cs_b"), "Basic Y2tfYTpjc19i");
    }

    #[test]
    fn empty_credentials_still_produce_header() {
        assert_eq!(basic_auth_header("", ""), "Basic Og==");
    }

    #[test]
    fn bearer_prefix() {
        assert_eq!(bearer_header("sk-1"), "Bearer sk-1");
    }
}
