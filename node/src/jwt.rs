// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Shared-secret authentication for the authenticated endpoint.
//!
//! Clients sign an HS256 JWT with a 32-byte secret shared with the node and
//! send it as `Authorization: Bearer <token>`. The only required claim is
//! `iat`, which must be within ±60 seconds of the node's clock.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors returned by [`JwtSecret`].
#[derive(Error, Debug)]
pub enum JwtError {
    #[error(transparent)]
    HexDecode(#[from] hex::FromHexError),

    #[error(
        "JWT key is expected to have a length of {0} digits. {1} digits key \
         provided"
    )]
    InvalidLength(usize, usize),

    #[error("unsupported signature algorithm. Only HS256 is supported")]
    UnsupportedSignatureAlgorithm,

    #[error("provided signature is invalid")]
    InvalidSignature,

    #[error(
        "IAT (issued-at) claim is not within ±60 seconds from the current time"
    )]
    InvalidIssuanceTimestamp,

    #[error("Authorization header is missing or invalid")]
    MissingOrInvalidAuthorizationHeader,

    #[error("JWT decoding error: {0}")]
    Decoding(String),

    #[error("JWT encoding error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Length of the hex-encoded 256 bit secret.
const JWT_SECRET_LEN: usize = 64;

/// The `iat` claim cannot be further than this from the current time.
const JWT_MAX_IAT_DIFF: Duration = Duration::from_secs(60);

const JWT_SIGNATURE_ALGO: Algorithm = Algorithm::HS256;

/// A 256-bit secret shared between the node and its authenticated clients.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSecret([u8; 32]);

impl JwtSecret {
    /// Parses a hex string of exactly 64 digits, with or without a leading
    /// `0x`.
    pub fn from_hex<S: AsRef<str>>(hex: S) -> Result<Self, JwtError> {
        let hex = hex.as_ref().trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.len() != JWT_SECRET_LEN {
            return Err(JwtError::InvalidLength(JWT_SECRET_LEN, hex.len()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(JwtSecret(bytes))
    }

    pub fn from_file(path: &Path) -> Result<Self, JwtError> {
        let hex = fs::read_to_string(path)?;
        JwtSecret::from_hex(hex)
    }

    /// Creates a random secret and stores it hex-encoded at `path`.
    pub fn try_create(path: &Path) -> Result<Self, JwtError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let secret = JwtSecret::random();
        fs::write(path, hex::encode(secret.0))?;
        Ok(secret)
    }

    /// Loads the secret stored at `path`, creating it when the file does not
    /// exist. Without a path the secret only lives in memory.
    pub fn load_or_create(path: Option<&Path>) -> Result<Self, JwtError> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => {
                let secret = Self::try_create(path)?;
                info!(
                    event = "generated JWT secret",
                    path = %path.display(),
                );
                Ok(secret)
            }
            None => {
                info!(event = "using ephemeral JWT secret");
                Ok(Self::random())
            }
        }
    }

    pub fn random() -> Self {
        JwtSecret(rand::thread_rng().gen())
    }

    /// Validates a token: HS256 signature made with this secret and an
    /// `iat` claim within ±60 seconds from now.
    pub fn validate(&self, jwt: &str) -> Result<(), JwtError> {
        let mut validation = Validation::new(JWT_SIGNATURE_ALGO);
        validation.set_required_spec_claims(&["iat"]);
        validation.validate_exp = false;

        let key = DecodingKey::from_secret(&self.0);
        match decode::<Claims>(jwt, &key, &validation) {
            Ok(token) if token.claims.is_within_time_window() => Ok(()),
            Ok(_) => Err(JwtError::InvalidIssuanceTimestamp),
            Err(err) => match err.kind() {
                ErrorKind::InvalidSignature => Err(JwtError::InvalidSignature),
                ErrorKind::InvalidAlgorithm => {
                    Err(JwtError::UnsupportedSignatureAlgorithm)
                }
                _ => Err(JwtError::Decoding(format!("{err:?}"))),
            },
        }
    }

    /// Signs `claims` with this secret.
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        let key = EncodingKey::from_secret(&self.0);
        let token =
            jsonwebtoken::encode(&Header::new(JWT_SIGNATURE_ALGO), claims, &key)?;
        Ok(token)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("JwtSecret").field(&"<redacted>").finish()
    }
}

impl FromStr for JwtSecret {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JwtSecret::from_hex(s)
    }
}

/// JWT claims. Only `iat` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at, seconds since the unix epoch.
    pub iat: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    /// Claims issued now.
    pub fn now() -> Self {
        Self {
            iat: unix_now().as_secs(),
            exp: None,
        }
    }

    fn is_within_time_window(&self) -> bool {
        let now = unix_now().as_secs();
        now.abs_diff(self.iat) <= JWT_MAX_IAT_DIFF.as_secs()
    }
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}
