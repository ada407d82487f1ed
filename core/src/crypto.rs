//! Cryptographic primitives shared by every layer of the engine.
//!
//! The consensus core (see the `baton-consensus` crate) never reaches into
//! `secp256k1`/`sha3` directly — it only ever sees `Address`, `Hash256` and
//! `TypedSignature<T>` as opaque, comparable, key-recoverable values, per
//! the "treated as typed interfaces" boundary in the engine's specification.

use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, Secp256k1, SecretKey,
};
use serde::{ser::SerializeTuple, Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use thiserror::Error;

const EVM_EC_RECOVERY_OFFSET: u8 = 27;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("verification failed")]
    VerificationFailed,
}

type Error = CryptoError;

pub trait ToHash256 {
    fn to_hash256(&self) -> Hash256;
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct HexSerializedBytes<const N: usize> {
    pub data: [u8; N],
}

impl<const N: usize> HexSerializedBytes<N> {
    pub const fn zero() -> Self {
        Self { data: [0; N] }
    }
}

impl<const N: usize> Serialize for HexSerializedBytes<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(hex::encode(self.data).as_str())
        } else {
            let mut seq = serializer.serialize_tuple(N)?;
            for e in self.data {
                seq.serialize_element(&e)?;
            }
            seq.end()
        }
    }
}

impl<const N: usize> fmt::Debug for HexSerializedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.data).as_str())
    }
}

impl<const N: usize> fmt::Display for HexSerializedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.data).as_str())
    }
}

impl<'de, const N: usize> Deserialize<'de> for HexSerializedBytes<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s: String = Deserialize::deserialize(deserializer)?;
            let bytes = hex::decode(s).map_err(|e| serde::de::Error::custom(e.to_string()))?;
            if bytes.len() != N {
                return Err(serde::de::Error::custom("invalid length"));
            }
            let mut data = [0; N];
            data.copy_from_slice(&bytes);
            Ok(HexSerializedBytes { data })
        } else {
            struct V<const M: usize>;
            impl<'de, const M: usize> serde::de::Visitor<'de> for V<M> {
                type Value = [u8; M];

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("byte")
                }

                fn visit_seq<S: serde::de::SeqAccess<'de>>(
                    self,
                    mut seq: S,
                ) -> Result<Self::Value, S::Error> {
                    let mut data = [0; M];
                    for (i, x) in data.iter_mut().enumerate() {
                        *x = seq
                            .next_element()?
                            .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                    }
                    Ok(data)
                }
            }
            let data = deserializer.deserialize_tuple(N, V::<N>)?;
            Ok(HexSerializedBytes { data })
        }
    }
}

/// A cryptographic hash, used both for blocks and for signed message payloads.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash256 {
    pub hash: HexSerializedBytes<32>,
}

impl Hash256 {
    pub const fn zero() -> Self {
        Hash256 {
            hash: HexSerializedBytes::zero(),
        }
    }

    pub fn hash(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        let result = hasher.finalize();
        Hash256 {
            hash: HexSerializedBytes {
                data: result.as_slice().try_into().unwrap(),
            },
        }
    }

    pub fn from_array(data: [u8; 32]) -> Self {
        Hash256 {
            hash: HexSerializedBytes { data },
        }
    }

    pub fn aggregate(&self, other: &Self) -> Self {
        Self::hash([self.hash.data, other.hash.data].concat())
    }
}

impl std::convert::AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.hash.data
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// An opaque, fixed-width validator identifier, recoverable from an ECDSA
/// signature the same way an Ethereum sender address is: the low 20 bytes
/// of `keccak256(uncompressed_public_key[1..])`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    pub address: HexSerializedBytes<20>,
}

impl Address {
    pub const fn zero() -> Self {
        Address {
            address: HexSerializedBytes::zero(),
        }
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let uncompressed = &public_key.key.data;
        // Skip the leading 0x04 prefix byte, matching the EVM address derivation.
        let hash = Hash256::hash(&uncompressed[1..]);
        let mut data = [0u8; 20];
        data.copy_from_slice(&hash.as_ref()[12..32]);
        Address {
            address: HexSerializedBytes { data },
        }
    }
}

impl std::convert::AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.address.data
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// A raw cryptographic signature with built-in recovery id.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    signature: HexSerializedBytes<65>,
}

impl Signature {
    pub const fn zero() -> Self {
        Signature {
            signature: HexSerializedBytes { data: [0; 65] },
        }
    }

    pub fn sign(data: Hash256, private_key: &PrivateKey) -> Result<Self, Error> {
        let private_key = secp256k1::SecretKey::from_slice(&private_key.key.data)
            .map_err(|_| Error::InvalidFormat("private key: [omitted]".to_owned()))?;
        let message = Message::from_slice(data.as_ref()).unwrap();
        let (recovery_id, rs) = Secp256k1::signing_only()
            .sign_ecdsa_recoverable(&message, &private_key)
            .serialize_compact();
        let v = recovery_id.to_i32() as u8;
        let bytes: [u8; 65] = {
            let mut whole: [u8; 65] = [0; 65];
            let (left, right) = whole.split_at_mut(rs.len());
            left.copy_from_slice(&rs);
            right.copy_from_slice(&[v + EVM_EC_RECOVERY_OFFSET; 1]);
            whole
        };
        Ok(Signature {
            signature: HexSerializedBytes { data: bytes },
        })
    }

    pub fn verify(&self, data: Hash256, public_key: &PublicKey) -> Result<(), Error> {
        let signature = secp256k1::ecdsa::Signature::from_compact(&self.signature.data[0..64])
            .map_err(|_| Error::InvalidFormat(format!("signature: {self}")))?;
        let public_key = secp256k1::PublicKey::from_slice(&public_key.key.data)
            .map_err(|_| Error::InvalidFormat(format!("public_key: {public_key}")))?;
        let message = Message::from_slice(data.as_ref()).unwrap();
        Secp256k1::verification_only()
            .verify_ecdsa(&message, &signature, &public_key)
            .map_err(|_| Error::VerificationFailed)
    }

    /// Recovers the sender's address directly from the signature, without
    /// needing the signer's public key up front — this is how `Vote::sender`
    /// and `Proposal::sender` are obtained at the message-decoding boundary.
    pub fn recover_address(&self, data: Hash256) -> Result<Address, Error> {
        self.recover_public_key(data).map(|pk| Address::from_public_key(&pk))
    }

    fn recover_public_key(&self, data: Hash256) -> Result<PublicKey, Error> {
        let message = Message::from_slice(data.as_ref()).unwrap();
        let recovery_id = RecoveryId::from_i32(
            self.signature.data[64..65][0] as i32 - EVM_EC_RECOVERY_OFFSET as i32,
        )
        .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        if recovery_id.to_i32() != 0 && recovery_id.to_i32() != 1 {
            return Err(Error::VerificationFailed);
        }
        let signature =
            RecoverableSignature::from_compact(&self.signature.data[0..64], recovery_id)
                .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        let secp = Secp256k1::new();
        let public_key = secp
            .recover_ecdsa(&message, &signature)
            .map_err(|e| Error::InvalidFormat(e.to_string()))?
            .serialize_uncompressed();
        Ok(PublicKey {
            key: HexSerializedBytes { data: public_key },
        })
    }

    pub fn from_array(bytes: [u8; 65]) -> Self {
        Signature {
            signature: HexSerializedBytes { data: bytes },
        }
    }
}

impl std::convert::AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.signature.data
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}

/// A signature explicitly tagged with the type of the data it signs.
///
/// The signed payload is always `Hash256::hash(bincode-ish-encoding(T))`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
pub struct TypedSignature<T> {
    signature: Signature,
    #[serde(skip)]
    _mark: std::marker::PhantomData<T>,
}

impl<T: ToHash256> TypedSignature<T> {
    pub fn sign(data: &T, private_key: &PrivateKey) -> Result<Self, Error> {
        Signature::sign(data.to_hash256(), private_key).map(|signature| TypedSignature {
            signature,
            _mark: std::marker::PhantomData,
        })
    }

    pub fn new(signature: Signature) -> Self {
        TypedSignature {
            signature,
            _mark: std::marker::PhantomData,
        }
    }

    /// Recovers the signer's address, verifying nothing else about `data`.
    pub fn recover_address(&self, data: &T) -> Result<Address, Error> {
        self.signature.recover_address(data.to_hash256())
    }

    pub fn get_raw_signature(&self) -> Signature {
        self.signature.clone()
    }
}

/// A public key.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey {
    key: HexSerializedBytes<65>,
}

impl std::convert::AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.key.data
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

impl PublicKey {
    pub fn zero() -> Self {
        Self {
            key: HexSerializedBytes::zero(),
        }
    }

    pub fn from_array(array: [u8; 33]) -> Result<Self, Error> {
        let key = secp256k1::PublicKey::from_slice(array.as_ref())
            .map_err(|_| Error::InvalidFormat(format!("given bytes: {}", hex::encode(array))))?
            .serialize_uncompressed();
        Ok(PublicKey {
            key: HexSerializedBytes { data: key },
        })
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

/// A private key.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey {
    pub key: HexSerializedBytes<32>,
}

impl std::convert::AsRef<[u8]> for PrivateKey {
    fn as_ref(&self) -> &[u8] {
        &self.key.data
    }
}

impl PrivateKey {
    pub fn zero() -> Self {
        Self {
            key: HexSerializedBytes::zero(),
        }
    }

    pub fn from_array(array: [u8; 32]) -> Result<Self, Error> {
        let key = secp256k1::SecretKey::from_slice(&array)
            .map_err(|_| Error::InvalidFormat(format!("given bytes: {}", hex::encode(array))))?
            .secret_bytes();
        Ok(PrivateKey {
            key: HexSerializedBytes { data: key },
        })
    }

    pub fn public_key(&self) -> PublicKey {
        let private_key = SecretKey::from_slice(&self.key.data).expect("invalid private key");
        let secp = Secp256k1::new();
        let public_key = private_key.public_key(&secp);
        PublicKey {
            key: HexSerializedBytes {
                data: public_key.serialize_uncompressed(),
            },
        }
    }

    pub fn address(&self) -> Address {
        self.public_key().address()
    }
}

/// Generates a new keypair using the given seed (test/dev use only).
pub fn generate_keypair(seed: impl AsRef<[u8]>) -> (PublicKey, PrivateKey) {
    let mut seed_: [u8; 32] = [0; 32];
    for (i, x) in Hash256::hash(seed).as_ref()[0..32].iter().enumerate() {
        seed_[i] = *x;
    }
    use secp256k1::rand::SeedableRng;
    let mut rng = secp256k1::rand::rngs::StdRng::from_seed(seed_);
    let secp = Secp256k1::new();
    let (private_key, public_key) = secp.generate_keypair(&mut rng);
    (
        PublicKey {
            key: HexSerializedBytes {
                data: public_key.serialize_uncompressed(),
            },
        },
        PrivateKey::from_array(private_key.secret_bytes()).expect("invalid private key"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let (public_key, private_key) = generate_keypair("hello rustaceans");
        let hash = Hash256::hash("hello world");
        let signature = Signature::sign(hash, &private_key).unwrap();
        signature.verify(hash, &public_key).unwrap();
    }

    #[test]
    fn signature_verify_invalid() {
        let (public_key, private_key) = generate_keypair("hello world");
        let signature = Signature::sign(Hash256::hash("hello world2"), &private_key).unwrap();
        signature
            .verify(Hash256::hash("hello world"), &public_key)
            .unwrap_err();
    }

    #[test]
    fn recover_address_matches_public_key_address() {
        let (public_key, private_key) = generate_keypair("hello world");
        let hash = Hash256::hash("a message");
        let signature = Signature::sign(hash, &private_key).unwrap();
        let recovered = signature.recover_address(hash).unwrap();
        assert_eq!(recovered, public_key.address());
    }

    #[test]
    fn typed_signature_recovers_address() {
        #[derive(Clone)]
        struct Msg(&'static str);
        impl ToHash256 for Msg {
            fn to_hash256(&self) -> Hash256 {
                Hash256::hash(self.0)
            }
        }
        let (public_key, private_key) = generate_keypair("typed");
        let msg = Msg("payload");
        let sig = TypedSignature::sign(&msg, &private_key).unwrap();
        assert_eq!(sig.recover_address(&msg).unwrap(), public_key.address());
    }

    #[test]
    fn hash_json_roundtrip() {
        let hash = Hash256::hash("hello world");
        let encoded = serde_json::to_string(&hash).unwrap();
        let decoded: Hash256 = serde_json::from_str(&encoded).unwrap();
        assert_eq!(hash, decoded);
    }
}
