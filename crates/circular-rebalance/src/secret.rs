use std::fmt;

use bitcoin_hashes::sha256::Hash as Sha256;
use bitcoin_hashes::Hash;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 32-byte payment preimage, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Preimage(pub [u8; 32]);

impl Preimage {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// SHA-256 of the preimage, the hash an HTLC is locked to.
    pub fn payment_hash(&self) -> [u8; 32] {
        Sha256::hash(&self.0).to_byte_array()
    }
}

impl fmt::Display for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Never print the secret itself in debug output.
impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preimage(..)")
    }
}

impl Serialize for Preimage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Preimage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A fresh preimage together with its payment hash.
#[derive(Debug, Clone)]
pub struct PaymentSecret {
    preimage: Preimage,
    payment_hash: [u8; 32],
}

impl PaymentSecret {
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self::from_preimage(Preimage(bytes))
    }

    pub fn from_preimage(preimage: Preimage) -> Self {
        Self {
            payment_hash: preimage.payment_hash(),
            preimage,
        }
    }

    pub fn preimage(&self) -> Preimage {
        self.preimage
    }

    pub fn payment_hash(&self) -> &[u8; 32] {
        &self.payment_hash
    }

    pub fn payment_hash_hex(&self) -> String {
        hex::encode(self.payment_hash)
    }

    /// Returns true if `preimage` unlocks this secret's payment hash.
    pub fn matches(&self, preimage: &Preimage) -> bool {
        preimage.payment_hash() == self.payment_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_payment_hash_is_sha256_of_preimage() {
        // SHA-256 of 32 zero bytes.
        let secret = PaymentSecret::from_preimage(Preimage([0u8; 32]));
        assert_eq!(
            secret.payment_hash_hex(),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
        assert!(secret.matches(&Preimage([0u8; 32])));
        assert!(!secret.matches(&Preimage([1u8; 32])));
    }

    #[test]
    fn test_generate_draws_distinct_secrets() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = PaymentSecret::generate(&mut rng);
        let b = PaymentSecret::generate(&mut rng);
        assert_ne!(a.preimage(), b.preimage());
        assert!(a.matches(&a.preimage()));
    }

    #[test]
    fn test_preimage_hex_serde() {
        let preimage = Preimage([0xab; 32]);
        let json = serde_json::to_string(&preimage).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let decoded: Preimage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, preimage);
        assert_eq!(format!("{:?}", preimage), "Preimage(..)");
        assert!(Preimage::from_hex("abcd").is_err());
    }
}
