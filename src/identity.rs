//! Bearer-token identity provider.
//!
//! Tokens have the form `base64url(user_id) "." hex(hmac_sha256(secret, user_id))`.
//! Anything that fails to decode or verify resolves to "no caller", which
//! every operation treats as unauthenticated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenSigner {
    keyed: HmacSha256,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> anyhow::Result<Self> {
        let keyed = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| anyhow::anyhow!("invalid token secret: {}", e))?;
        Ok(Self { keyed })
    }

    fn mac(&self, user_id: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(user_id.as_bytes());
        mac
    }

    /// Issue a token for `user_id`.
    pub fn issue(&self, user_id: &str) -> String {
        let signature = self.mac(user_id).finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(user_id.as_bytes()),
            hex::encode(signature)
        )
    }

    /// Return the user id a token was issued for, if the signature checks out.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (encoded_user, signature) = token.trim().split_once('.')?;
        let user_id = String::from_utf8(URL_SAFE_NO_PAD.decode(encoded_user).ok()?).ok()?;
        if user_id.is_empty() {
            return None;
        }
        let signature = hex::decode(signature).ok()?;
        self.mac(&user_id).verify_slice(&signature).ok()?;
        Some(user_id)
    }

    /// Resolve an `Authorization` header value (`Bearer <token>`).
    pub fn caller_from_header(&self, header: Option<&str>) -> Option<String> {
        let value = header?.trim();
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))?;
        self.verify(token)
    }
}
