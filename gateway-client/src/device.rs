//! Device identity for challenge/response authentication.
//!
//! The gateway identifies a device by the SHA-256 of its raw Ed25519 public
//! key. During the handshake the device signs a canonical, pipe-delimited
//! payload that binds the client, role, scopes, a timestamp, the bearer token
//! and (for `v2`) the server nonce, so a captured handshake cannot be replayed
//! against a later challenge.

use std::fmt;
use std::sync::{Arc, OnceLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use relay_common::DeviceProof;
use sha2::{Digest, Sha256};

/// Ed25519 keypair plus its derived device id.
#[derive(Clone)]
pub struct DeviceIdentity {
    signing_key: SigningKey,
    device_id: String,
}

impl DeviceIdentity {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let device_id = derive_device_id(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            device_id,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn public_key_raw(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// base64url (no padding) of the raw public key.
    pub fn public_key_b64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public_key_raw())
    }

    /// Sign the UTF-8 bytes of `payload`, returning base64url (no padding).
    pub fn sign(&self, payload: &str) -> String {
        let signature: Signature = self.signing_key.sign(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    }

    /// Build the `device` block of a `connect` request for `payload`.
    pub fn prove(&self, payload: &DeviceAuthPayload) -> DeviceProof {
        DeviceProof {
            id: self.device_id.clone(),
            public_key: self.public_key_b64url(),
            signature: self.sign(&payload.canonical()),
            signed_at: payload.signed_at_ms,
            nonce: payload.nonce.clone(),
        }
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

/// Device id for a raw public key: lowercase hex SHA-256 (64 chars).
pub fn derive_device_id(public_key: &[u8]) -> String {
    hex::encode(Sha256::digest(public_key))
}

/// Check a base64url signature over `payload` against a base64url public key.
pub fn verify_signature(public_key: &str, payload: &str, signature: &str) -> bool {
    let Ok(key_raw) = URL_SAFE_NO_PAD.decode(public_key) else {
        return false;
    };
    let Ok(sig_raw) = URL_SAFE_NO_PAD.decode(signature) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_raw.as_slice()) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_raw.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    key.verify_strict(payload.as_bytes(), &Signature::from_bytes(&sig_bytes))
        .is_ok()
}

/// Fields bound into a device signature.
#[derive(Debug, Clone)]
pub struct DeviceAuthPayload {
    pub device_id: String,
    pub client_id: String,
    pub client_mode: String,
    pub role: String,
    pub scopes: Vec<String>,
    pub signed_at_ms: i64,
    pub token: Option<String>,
    pub nonce: Option<String>,
}

impl DeviceAuthPayload {
    pub fn version(&self) -> &'static str {
        if self.nonce.is_some() {
            "v2"
        } else {
            "v1"
        }
    }

    /// `version|deviceId|clientId|clientMode|role|scopes|signedAtMs|token[|nonce]`
    pub fn canonical(&self) -> String {
        let mut parts = vec![
            self.version().to_string(),
            self.device_id.clone(),
            self.client_id.clone(),
            self.client_mode.clone(),
            self.role.clone(),
            self.scopes.join(","),
            self.signed_at_ms.to_string(),
            self.token.clone().unwrap_or_default(),
        ];
        if let Some(nonce) = &self.nonce {
            parts.push(nonce.clone());
        }
        parts.join("|")
    }
}

/// Write-once holder for the process's device identity.
///
/// The keypair is generated on first use and then only read. It is never
/// written to disk, so a restart yields a new device.
#[derive(Debug, Default)]
pub struct DeviceKeyring {
    identity: OnceLock<Arc<DeviceIdentity>>,
}

impl DeviceKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// A keyring pre-seeded with `identity`.
    #[cfg(test)]
    fn with_identity(identity: DeviceIdentity) -> Self {
        let keyring = Self::new();
        let _ = keyring.identity.set(Arc::new(identity));
        keyring
    }

    /// The cached identity, generating it on first call.
    pub fn identity(&self) -> Arc<DeviceIdentity> {
        self.identity
            .get_or_init(|| {
                let identity = DeviceIdentity::generate();
                tracing::info!("Generated device identity {}", identity.device_id());
                Arc::new(identity)
            })
            .clone()
    }
}
