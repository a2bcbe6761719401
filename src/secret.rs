//! Secret markers and the post-processing applied to resolved values.

use crate::coerce::parse_bool;
use sha2::{Digest, Sha256};

/// Key prefix marking a tag whose value must go through the crypto provider
pub const SECRET_MARKER: &str = "secret";

/// Key prefix and output marker used for the reserved `secrets` key
pub const SHASEC_MARKER: &str = "shasec";

/// Reserved key whose value is always wrapped with the `shasec` marker
pub const SECRETS_KEY: &str = "secrets";

/// Caller-supplied transformation of secret values: `(key, raw_token, value) -> value`
pub trait CryptoProvider {
    fn transform(&self, key: &str, raw_token: &str, value: &str) -> String;
}

impl<F> CryptoProvider for F
where
    F: Fn(&str, &str, &str) -> String,
{
    fn transform(&self, key: &str, raw_token: &str, value: &str) -> String {
        self(key, raw_token, value)
    }
}

/// Returns values unchanged; used when no provider is supplied
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProvider;

impl CryptoProvider for IdentityProvider {
    fn transform(&self, _key: &str, _raw_token: &str, value: &str) -> String {
        value.to_string()
    }
}

/// Replaces every character of the value with `*`
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskProvider;

impl CryptoProvider for MaskProvider {
    fn transform(&self, _key: &str, _raw_token: &str, value: &str) -> String {
        "*".repeat(value.chars().count())
    }
}

/// Hex-encoded SHA-256 digest of the value
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Provider;

impl CryptoProvider for Sha256Provider {
    fn transform(&self, _key: &str, _raw_token: &str, value: &str) -> String {
        hex::encode(Sha256::digest(value.as_bytes()))
    }
}

/// Strips a `secret:` or `shasec:` marker from a lower-cased key.
///
/// Returns the remaining key and whether the generic secret marker was present.
pub fn strip_marker(key: &str) -> (&str, bool) {
    if let Some(rest) = strip_prefix_marker(key, SECRET_MARKER) {
        (rest, true)
    } else if let Some(rest) = strip_prefix_marker(key, SHASEC_MARKER) {
        (rest, false)
    } else {
        (key, false)
    }
}

fn strip_prefix_marker<'a>(key: &'a str, marker: &str) -> Option<&'a str> {
    key.strip_prefix(marker)?.strip_prefix(':')
}

/// Applies boolean lowering and the secret markers to a resolved value
#[derive(Debug, Clone, Copy)]
pub struct SecretWrapper {
    pub bool_to_lower: bool,
}

impl Default for SecretWrapper {
    fn default() -> Self {
        Self {
            bool_to_lower: true,
        }
    }
}

impl SecretWrapper {
    pub fn wrap(
        &self,
        key: &str,
        raw_token: &str,
        value: String,
        is_secret: bool,
        provider: &dyn CryptoProvider,
    ) -> String {
        let mut value = if self.bool_to_lower && parse_bool(&value).is_some() {
            value.to_lowercase()
        } else {
            value
        };

        if is_secret {
            value = format!(
                "{SECRET_MARKER}:{}",
                provider.transform(key, raw_token, &value)
            );
        }

        if key.eq_ignore_ascii_case(SECRETS_KEY) {
            value = format!(
                "{SHASEC_MARKER}:{}",
                provider.transform(key, raw_token, &value)
            );
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(_key: &str, _raw: &str, value: &str) -> String {
        value.to_uppercase()
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("secret:password"), ("password", true));
        assert_eq!(strip_marker("shasec:secrets"), ("secrets", false));
        assert_eq!(strip_marker("plain"), ("plain", false));
        assert_eq!(strip_marker("secretive"), ("secretive", false));
        assert_eq!(strip_marker("secret"), ("secret", false));
    }

    #[test]
    fn test_plain_values_pass_through() {
        let wrapper = SecretWrapper::default();
        assert_eq!(
            wrapper.wrap("name", "${name}", "value".to_string(), false, &upper),
            "value"
        );
    }

    #[test]
    fn test_secret_marker_wraps() {
        let wrapper = SecretWrapper::default();
        assert_eq!(
            wrapper.wrap("variable", "${secret:variable}", "value".to_string(), true, &upper),
            "secret:VALUE"
        );
        assert_eq!(
            wrapper.wrap("variable", "${secret:variable}", "value".to_string(), true, &IdentityProvider),
            "secret:value"
        );
    }

    #[test]
    fn test_secrets_key_always_uses_shasec() {
        let wrapper = SecretWrapper::default();
        assert_eq!(
            wrapper.wrap("secrets", "${secrets}", "value".to_string(), false, &upper),
            "shasec:VALUE"
        );
        assert_eq!(
            wrapper.wrap("Secrets", "${shasec:secrets}", "v".to_string(), false, &IdentityProvider),
            "shasec:v"
        );
    }

    #[test]
    fn test_provider_receives_key_and_token() {
        let wrapper = SecretWrapper::default();
        let echo = |key: &str, raw: &str, value: &str| format!("{key}|{raw}|{value}");
        assert_eq!(
            wrapper.wrap("pwd", "${secret:pwd}", "x".to_string(), true, &echo),
            "secret:pwd|${secret:pwd}|x"
        );
    }

    #[test]
    fn test_boolean_lowering() {
        let wrapper = SecretWrapper::default();
        assert_eq!(
            wrapper.wrap("flag", "${flag}", "True".to_string(), false, &IdentityProvider),
            "true"
        );

        let wrapper = SecretWrapper {
            bool_to_lower: false,
        };
        assert_eq!(
            wrapper.wrap("flag", "${flag}", "True".to_string(), false, &IdentityProvider),
            "True"
        );
    }

    #[test]
    fn test_builtin_providers() {
        assert_eq!(MaskProvider.transform("k", "${k}", "abcd"), "****");
        assert_eq!(
            Sha256Provider.transform("k", "${k}", "abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
