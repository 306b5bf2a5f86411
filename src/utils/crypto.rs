// Cryptographic utilities for generating state tokens and signing JWTs

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use rsa::RsaPrivateKey;

/// Generate a cryptographically secure CSRF token
///
/// 24 bytes (192 bits) of entropy, base64url-encoded to 32 characters.
#[must_use]
pub fn generate_csrf_token() -> String {
    let mut nonce = [0u8; 24];
    rand::rng().fill_bytes(&mut nonce);
    general_purpose::URL_SAFE_NO_PAD.encode(nonce)
}

/// Decode a JWT payload without verifying it
///
/// # Errors
///
/// Returns an error if:
/// - The JWT format is invalid (not 3 parts separated by dots)
/// - Base64 decoding fails
/// - JSON parsing fails
pub fn decode_jwt_payload(token: &str) -> Result<serde_json::Value, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid JWT format".to_string());
    }

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| "Base64 decode failed")?;

    serde_json::from_slice(&payload_bytes).map_err(|_| "JSON parse failed".to_string())
}

/// Build a compact RS256 JWT from a PEM key
///
/// # Arguments
///
/// * `header` - JWT header as JSON
/// * `payload` - JWT claims as JSON
/// * `private_key_pem` - PEM-encoded PKCS#8 (or PKCS#1) RSA private key
///
/// # Errors
///
/// Returns an error if:
/// - JSON serialization fails
/// - Key parsing fails
pub fn create_jwt(
    header: &serde_json::Value,
    payload: &serde_json::Value,
    private_key_pem: &str,
) -> Result<String> {
    let private_key = parse_rsa_private_key(private_key_pem)?;
    create_jwt_with_key(header, payload, &private_key)
}

/// Build a compact RS256 JWT with an already parsed key
///
/// # Errors
///
/// Returns an error if the header or payload cannot be serialized.
pub fn create_jwt_with_key(
    header: &serde_json::Value,
    payload: &serde_json::Value,
    private_key: &RsaPrivateKey,
) -> Result<String> {
    let header_json = serde_json::to_string(header).context("Failed to serialize JWT header")?;
    let payload_json = serde_json::to_string(payload).context("Failed to serialize JWT payload")?;

    let header_b64 = general_purpose::URL_SAFE_NO_PAD.encode(header_json.as_bytes());
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload_json.as_bytes());

    let message = format!("{header_b64}.{payload_b64}");
    let signature_bytes = sign_jwt_rs256(message.as_bytes(), private_key);
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(&signature_bytes);

    Ok(format!("{message}.{signature_b64}"))
}

/// Parse a PEM RSA private key
///
/// # Errors
///
/// Returns an error if the PEM is neither PKCS#8 nor PKCS#1 RSA.
pub fn parse_rsa_private_key(private_key_pem: &str) -> Result<RsaPrivateKey> {
    use rsa::pkcs1::DecodeRsaPrivateKey;
    use rsa::pkcs8::DecodePrivateKey;

    // Service account files ship PKCS#8, older tooling still emits PKCS#1
    RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_key_pem))
        .map_err(|e| anyhow!("Failed to parse RSA private key: {e}"))
}

/// Sign a message using RSASSA-PKCS1-v1_5 with SHA-256 (RS256)
fn sign_jwt_rs256(message: &[u8], private_key: &RsaPrivateKey) -> Vec<u8> {
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use sha2::Sha256;

    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    signing_key.sign(message).to_vec()
}

/// JWT header for an RS256 token, optionally carrying a key id
#[must_use]
pub fn create_jwt_header(key_id: Option<&str>) -> serde_json::Value {
    let mut header = serde_json::json!({
        "alg": "RS256",
        "typ": "JWT"
    });

    if let Some(kid) = key_id {
        header["kid"] = serde_json::Value::String(kid.to_string());
    }

    header
}

/// Standard JWT payload with common claims
///
/// `additional_claims` is merged over the standard claims when it is a JSON object.
#[must_use]
pub fn create_jwt_payload(
    issuer: &str,
    subject: &str,
    audience: &str,
    expiry_minutes: i64,
    additional_claims: Option<&serde_json::Value>,
) -> serde_json::Value {
    use chrono::{Duration, Utc};

    let now = Utc::now();
    let exp = now + Duration::minutes(expiry_minutes);

    let mut payload = serde_json::json!({
        "iss": issuer,
        "sub": subject,
        "aud": audience,
        "iat": now.timestamp(),
        "exp": exp.timestamp()
    });

    if let Some(serde_json::Value::Object(additional_map)) = additional_claims {
        if let serde_json::Value::Object(ref mut payload_map) = payload {
            for (key, value) in additional_map {
                payload_map.insert(key.clone(), value.clone());
            }
        }
    }

    payload
}
