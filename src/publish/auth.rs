//! Publisher credentials and OAuth 1.0a request signing (HMAC-SHA1).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, Rng};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use thiserror::Error;

use super::PublishError;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters pass through; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Expected 4 OAuth credentials or 2 legacy credentials, got {0}")]
    WrongCount(usize),
}

/// Account credentials for the publish endpoint.
///
/// Secrets are wrapped in [`SecretString`], so `Debug` output never shows them.
#[derive(Debug)]
pub enum Credentials {
    /// Registered app keys plus the posting account's access token
    OAuth {
        consumer_key: SecretString,
        consumer_secret: SecretString,
        access_token: SecretString,
        access_secret: SecretString,
    },
    /// Legacy username/password (HTTP basic auth)
    Basic {
        username: String,
        password: SecretString,
    },
}

impl Credentials {
    /// Builds credentials from the positional CLI arguments after the source URL.
    ///
    /// Four values select OAuth, two select basic auth.
    pub fn from_args(args: &[String]) -> Result<Self, CredentialsError> {
        match args {
            [consumer_key, consumer_secret, access_token, access_secret] => Ok(Self::OAuth {
                consumer_key: SecretString::from(consumer_key.clone()),
                consumer_secret: SecretString::from(consumer_secret.clone()),
                access_token: SecretString::from(access_token.clone()),
                access_secret: SecretString::from(access_secret.clone()),
            }),
            [username, password] => Ok(Self::Basic {
                username: username.clone(),
                password: SecretString::from(password.clone()),
            }),
            _ => Err(CredentialsError::WrongCount(args.len())),
        }
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Builds the signature base string: `METHOD&url&sorted-params`, each part encoded.
pub(crate) fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

/// Signs a base string with `consumer_secret&token_secret`, returning base64.
pub(crate) fn sign(
    base_string: &str,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, PublishError> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| PublishError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn fresh_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Produces the `Authorization: OAuth ...` header value for one request.
///
/// `extra_params` are query or form parameters that take part in the
/// signature; a JSON body does not.
pub(crate) fn oauth_header(
    method: &str,
    url: &str,
    extra_params: &[(&str, &str)],
    credentials: &Credentials,
) -> Result<String, PublishError> {
    let Credentials::OAuth {
        consumer_key,
        consumer_secret,
        access_token,
        access_secret,
    } = credentials
    else {
        return Err(PublishError::Signing(
            "OAuth header requested for non-OAuth credentials".to_string(),
        ));
    };

    oauth_header_at(
        method,
        url,
        extra_params,
        OAuthKeys {
            consumer_key: consumer_key.expose_secret(),
            consumer_secret: consumer_secret.expose_secret(),
            token: access_token.expose_secret(),
            token_secret: access_secret.expose_secret(),
        },
        &fresh_nonce(),
        chrono::Utc::now().timestamp(),
    )
}

struct OAuthKeys<'a> {
    consumer_key: &'a str,
    consumer_secret: &'a str,
    token: &'a str,
    token_secret: &'a str,
}

fn oauth_header_at(
    method: &str,
    url: &str,
    extra_params: &[(&str, &str)],
    keys: OAuthKeys<'_>,
    nonce: &str,
    timestamp: i64,
) -> Result<String, PublishError> {
    let timestamp = timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", keys.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", keys.token),
        ("oauth_version", "1.0"),
    ];

    let mut all_params: Vec<(&str, &str)> = oauth_params.to_vec();
    all_params.extend_from_slice(extra_params);

    let base_string = signature_base_string(method, url, &all_params);
    let signature = sign(&base_string, keys.consumer_secret, keys.token_secret)?;

    let mut header_params: Vec<(&str, &str)> = oauth_params.to_vec();
    header_params.push(("oauth_signature", signature.as_str()));
    header_params.sort();

    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Published worked example for OAuth 1.0a HMAC-SHA1 signing
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";
    const CONSUMER_KEY: &str = "xvz1evFS4wEEPTGEFPHBog";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN: &str = "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb";
    const TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";

    fn example_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("status", STATUS),
            ("include_entities", "true"),
            ("oauth_consumer_key", CONSUMER_KEY),
            ("oauth_nonce", NONCE),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", TOKEN),
            ("oauth_version", "1.0"),
        ]
    }

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("!*'()"), "%21%2A%27%28%29");
        assert_eq!(encode("é"), "%C3%A9");
    }

    #[test]
    fn test_signature_base_string() {
        let base = signature_base_string("post", URL, &example_params());
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&\
             include_entities%3Dtrue%26\
             oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26\
             oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26\
             oauth_signature_method%3DHMAC-SHA1%26\
             oauth_timestamp%3D1318622958%26\
             oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26\
             oauth_version%3D1.0%26\
             status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_signature_matches_worked_example() {
        let base = signature_base_string("POST", URL, &example_params());
        let signature = sign(&base, CONSUMER_SECRET, TOKEN_SECRET).unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_header_contains_encoded_signature() {
        let header = oauth_header_at(
            "POST",
            URL,
            &[("status", STATUS), ("include_entities", "true")],
            OAuthKeys {
                consumer_key: CONSUMER_KEY,
                consumer_secret: CONSUMER_SECRET,
                token: TOKEN,
                token_secret: TOKEN_SECRET,
            },
            NONCE,
            1318622958,
        )
        .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_version=\"1.0\""));
        // Request parameters are signed but not sent in the header
        assert!(!header.contains("status"));
    }

    #[test]
    fn test_nonce_is_fresh() {
        let a = fresh_nonce();
        let b = fresh_nonce();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_credentials_from_args() {
        let oauth = Credentials::from_args(&["ck".into(), "cs".into(), "at".into(), "as".into()]);
        assert!(matches!(oauth, Ok(Credentials::OAuth { .. })));

        let basic = Credentials::from_args(&["user".into(), "pass".into()]);
        match basic {
            Ok(Credentials::Basic { username, .. }) => assert_eq!(username, "user"),
            other => panic!("Expected Basic credentials, got {:?}", other),
        }

        assert!(matches!(
            Credentials::from_args(&["only-one".into()]),
            Err(CredentialsError::WrongCount(1))
        ));
        assert!(matches!(
            Credentials::from_args(&[]),
            Err(CredentialsError::WrongCount(0))
        ));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds =
            Credentials::from_args(&["user".into(), "hunter2-secret".into()]).unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2-secret"));
    }

    #[test]
    fn test_oauth_header_rejects_basic_credentials() {
        let creds = Credentials::from_args(&["user".into(), "pass".into()]).unwrap();
        let result = oauth_header("POST", URL, &[], &creds);
        assert!(matches!(result, Err(PublishError::Signing(_))));
    }
}
