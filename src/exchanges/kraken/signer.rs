use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{KrakenError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Ordered request fields. Insertion order is the order they are signed and sent in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    fields: Vec<(String, String)>,
}

impl Payload {
    pub fn new() -> Payload {
        Payload::default()
    }

    /// A payload whose first field is `nonce`.
    pub fn with_nonce(nonce: u64) -> Payload {
        let mut payload = Payload::new();
        payload.push("nonce", nonce.to_string());
        payload
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `key1=value1&key2=value2`, form-urlencoded. This exact string is both
    /// hashed for the signature and sent as the POST body.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Parse a form-urlencoded body back into an ordered payload.
    pub fn from_encoded(body: &str) -> Payload {
        url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Payload {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Computes the `API-Sign` header value for private endpoints.
#[derive(Clone)]
pub struct KrakenSigner {
    api_sec: String,
}

impl std::fmt::Debug for KrakenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenSigner")
            .field("api_sec", &"***")
            .finish()
    }
}

impl KrakenSigner {
    pub fn new(api_sec: impl Into<String>) -> KrakenSigner {
        KrakenSigner {
            api_sec: api_sec.into(),
        }
    }

    /// HMAC-SHA512 of (URI path + SHA256(nonce + POST data)), keyed with the
    /// base64-decoded secret, returned base64-encoded.
    ///
    /// A payload without `nonce` contributes an empty nonce prefix.
    pub fn sign(&self, api_path: &str, payload: &Payload) -> Result<String> {
        let nonce = payload.get("nonce").unwrap_or_default();
        let hash_digest = Sha256::digest(format!("{}{}", nonce, payload.encode()).as_bytes());

        let private_key = BASE64
            .decode(self.api_sec.as_bytes())
            .map_err(|e| KrakenError::InvalidSecret(e.to_string()))?;
        let mut mac = HmacSha512::new_from_slice(&private_key)
            .map_err(|e| KrakenError::InvalidSecret(e.to_string()))?;

        let mut hmac_data = api_path.as_bytes().to_vec();
        hmac_data.extend_from_slice(&hash_digest);
        mac.update(&hmac_data);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}
