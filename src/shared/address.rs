//! Canonical on-chain addresses and public-key normalization.
//!
//! Wallet adapters hand back public keys in several shapes: a base58 address,
//! a base64 string (the mobile wallet adapter wire format), a raw byte array,
//! or a JSON object wrapping one of those. [`normalize_public_key`] turns any
//! of them into a [`CanonicalAddress`] or fails; it never invents one.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_pubkey::Pubkey;
use std::str::FromStr;

use crate::error::AddressError;

/// Length of a Solana public key in bytes.
pub const ADDRESS_LEN: usize = 32;

// ─── CanonicalAddress ────────────────────────────────────────────────────────

/// A 32-byte Solana account address, displayed as base58.
///
/// Serializes transparently as a base58 JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalAddress(Pubkey);

impl CanonicalAddress {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(Pubkey::new_from_array(bytes))
    }

    /// Build from a byte slice, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.is_empty() {
            return Err(AddressError::Empty);
        }
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::WrongLength(bytes.len()))?;
        Ok(Self::from_bytes(arr))
    }

    /// The System Program address (32 zero bytes).
    ///
    /// Only demo sessions use this value; a real connection never does.
    pub fn system_placeholder() -> Self {
        Self(Pubkey::default())
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == Pubkey::default()
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_LEN] {
        self.0.to_bytes()
    }

    pub fn as_pubkey(&self) -> &Pubkey {
        &self.0
    }

    pub fn to_pubkey(&self) -> Pubkey {
        self.0
    }

    /// Encode as standard padded base64, the wallet-adapter account format.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }
}

impl FromStr for CanonicalAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl std::fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Pubkey> for CanonicalAddress {
    fn from(pk: Pubkey) -> Self {
        Self(pk)
    }
}

impl From<CanonicalAddress> for Pubkey {
    fn from(addr: CanonicalAddress) -> Self {
        addr.0
    }
}

impl Serialize for CanonicalAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CanonicalAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CanonicalAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

// ─── PublicKeyRepr ───────────────────────────────────────────────────────────

/// A public key as some wallet produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicKeyRepr {
    /// Base58 address or base64-encoded key bytes.
    Text(String),
    /// Raw key bytes.
    Bytes(Vec<u8>),
    /// An object exposing the key under one of the common field names.
    Wrapped(Box<KeyWrapper>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWrapper {
    #[serde(alias = "publicKey", alias = "public_key", alias = "pubkey")]
    pub address: PublicKeyRepr,
}

impl From<&str> for PublicKeyRepr {
    fn from(s: &str) -> Self {
        PublicKeyRepr::Text(s.to_string())
    }
}

impl From<String> for PublicKeyRepr {
    fn from(s: String) -> Self {
        PublicKeyRepr::Text(s)
    }
}

impl From<Vec<u8>> for PublicKeyRepr {
    fn from(bytes: Vec<u8>) -> Self {
        PublicKeyRepr::Bytes(bytes)
    }
}

// ─── Normalization ───────────────────────────────────────────────────────────

/// Normalize any wallet-provided key representation.
pub fn normalize_public_key(repr: &PublicKeyRepr) -> Result<CanonicalAddress, AddressError> {
    match repr {
        PublicKeyRepr::Text(s) => normalize_str(s),
        PublicKeyRepr::Bytes(bytes) => CanonicalAddress::from_slice(bytes),
        PublicKeyRepr::Wrapped(wrapper) => normalize_public_key(&wrapper.address),
    }
}

/// Normalize a string key: base58 first, then base64 when it looks like base64.
///
/// When both attempts fail the base58 error is returned.
pub fn normalize_str(input: &str) -> Result<CanonicalAddress, AddressError> {
    let input = input.trim();
    let original = match CanonicalAddress::from_str(input) {
        Ok(addr) => return Ok(addr),
        Err(e) => e,
    };

    if !looks_base64(input) {
        return Err(original);
    }

    match decode_base64_key(input) {
        Ok(addr) => Ok(addr),
        Err(e) => {
            tracing::debug!(error = %e, "base64 public key fallback failed");
            Err(original)
        }
    }
}

/// `+`, `/` and `=` never occur in base58.
fn looks_base64(s: &str) -> bool {
    s.contains(|c: char| matches!(c, '+' | '/' | '='))
}

fn decode_base64_key(input: &str) -> Result<CanonicalAddress, AddressError> {
    let bytes = STANDARD_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|e| AddressError::InvalidBase64(e.to_string()))?;
    let encoded = bs58::encode(&bytes).into_string();
    CanonicalAddress::from_str(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

    fn sample_bytes() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            // includes bytes that produce '+' and '/' in base64
            *b = (i as u8).wrapping_mul(37).wrapping_add(0xfb);
        }
        bytes
    }

    #[test]
    fn test_canonical_input_is_unchanged() {
        for s in [TOKEN_PROGRAM, "11111111111111111111111111111111"] {
            let addr = normalize_str(s).unwrap();
            assert_eq!(addr.to_string(), s);
        }
    }

    #[test]
    fn test_base64_round_trips_to_base58() {
        for bytes in [sample_bytes(), [0u8; 32], [0xff; 32]] {
            let wire = STANDARD.encode(bytes);
            let addr = normalize_str(&wire).unwrap();
            assert_eq!(addr.to_string(), bs58::encode(bytes).into_string());
            assert_eq!(addr.to_bytes(), bytes);
        }
    }

    #[test]
    fn test_to_base64_matches_wallet_format() {
        let addr = CanonicalAddress::from_bytes(sample_bytes());
        assert_eq!(normalize_str(&addr.to_base64()).unwrap(), addr);
    }

    #[test]
    fn test_wrong_length_base64_fails() {
        let wire = STANDARD.encode([7u8; 31]);
        assert!(normalize_str(&wire).is_err());

        let wire = STANDARD.encode([7u8; 34]);
        assert!(normalize_str(&wire).is_err());
    }

    #[test]
    fn test_wrong_length_base58_fails() {
        // "1" decodes to a single zero byte.
        assert_eq!(normalize_str("1"), Err(AddressError::WrongLength(1)));
    }

    #[test]
    fn test_surfaces_original_error_when_fallback_fails() {
        let err = normalize_str("not/base58/or=base64!").unwrap_err();
        assert!(matches!(err, AddressError::InvalidBase58(_)));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_str(""), Err(AddressError::Empty));
        assert_eq!(
            normalize_public_key(&PublicKeyRepr::Bytes(vec![])),
            Err(AddressError::Empty)
        );
    }

    #[test]
    fn test_bytes_repr() {
        let repr = PublicKeyRepr::Bytes(sample_bytes().to_vec());
        let addr = normalize_public_key(&repr).unwrap();
        assert_eq!(addr.to_bytes(), sample_bytes());

        let short = PublicKeyRepr::Bytes(vec![1u8; 16]);
        assert_eq!(
            normalize_public_key(&short),
            Err(AddressError::WrongLength(16))
        );
    }

    #[test]
    fn test_repr_deserializes_all_shapes() {
        let text: PublicKeyRepr = serde_json::from_str(&format!("\"{TOKEN_PROGRAM}\"")).unwrap();
        assert_eq!(text, PublicKeyRepr::from(TOKEN_PROGRAM));

        let bytes: PublicKeyRepr = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(bytes, PublicKeyRepr::Bytes(vec![1, 2, 3]));

        let wrapped: PublicKeyRepr =
            serde_json::from_str(&format!("{{\"publicKey\":\"{TOKEN_PROGRAM}\"}}")).unwrap();
        assert_eq!(
            normalize_public_key(&wrapped).unwrap().to_string(),
            TOKEN_PROGRAM
        );
    }

    #[test]
    fn test_placeholder() {
        let placeholder = CanonicalAddress::system_placeholder();
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.to_string(), "11111111111111111111111111111111");
        assert!(!CanonicalAddress::from_str(TOKEN_PROGRAM)
            .unwrap()
            .is_placeholder());
    }

    #[test]
    fn test_serde_is_base58_string() {
        let addr = CanonicalAddress::from_str(TOKEN_PROGRAM).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{TOKEN_PROGRAM}\""));
        let back: CanonicalAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<CanonicalAddress>("\"1\"").is_err());
    }
}
