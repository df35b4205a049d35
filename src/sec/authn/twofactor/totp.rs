use profile_lib::sec::authn::totp::{Algo, code_valid};
use rand::RngCore;
use serde_json::{json, Map, Value};
use totp_rs::{Algorithm, TOTP, TotpUrlError};

use crate::user::User;

use super::{TwoFactorProvider, Reply, Submitted};

pub const METHOD: &str = "totp";

pub const SECRET_LEN: usize = 20;

pub fn create_secret() -> Result<Vec<u8>, rand::Error> {
    let mut bytes = [0u8; SECRET_LEN];
    rand::thread_rng().try_fill_bytes(&mut bytes)?;

    Ok(bytes.to_vec())
}

pub fn encode_secret(secret: &[u8]) -> String {
    data_encoding::BASE32_NOPAD.encode(secret)
}

/// decodes a base32 secret as typed by a user, case and padding are ignored
pub fn decode_secret(given: &str) -> Option<Vec<u8>> {
    let normalized = given.trim()
        .trim_end_matches('=')
        .to_ascii_uppercase();

    if normalized.is_empty() {
        return None;
    }

    data_encoding::BASE32_NOPAD.decode(normalized.as_bytes()).ok()
}

fn algorithm(algo: Algo) -> Algorithm {
    match algo {
        Algo::SHA1 => Algorithm::SHA1,
        Algo::SHA256 => Algorithm::SHA256,
        Algo::SHA512 => Algorithm::SHA512,
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub issuer: String,
    pub algo: Algo,
    pub digits: u32,
    pub step: u64,
    /// steps accepted before and after the current one
    pub window: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            issuer: String::from("Administrator"),
            algo: Algo::SHA1,
            digits: profile_lib::sec::authn::totp::DEFAULT_DIGITS,
            step: profile_lib::sec::authn::totp::DEFAULT_STEP,
            window: 1,
        }
    }
}

/// time based one time passwords (RFC 6238)
#[derive(Debug, Clone)]
pub struct Totp {
    settings: Settings,
}

impl Totp {
    pub fn new(settings: Settings) -> Self {
        Totp { settings }
    }

    fn build(&self, secret: &[u8], account: &str) -> Result<TOTP, TotpUrlError> {
        TOTP::new(
            algorithm(self.settings.algo),
            self.settings.digits as usize,
            u8::try_from(self.settings.window).unwrap_or(u8::MAX),
            self.settings.step,
            secret.to_vec(),
            Some(self.settings.issuer.clone()),
            account.to_owned(),
        )
    }

    pub fn code_at(&self, secret: &[u8], timestamp: u64) -> Result<String, TotpUrlError> {
        Ok(self.build(secret, "")?.generate(timestamp))
    }

    pub fn verify_at(&self, secret: &[u8], code: &str, timestamp: u64) -> bool {
        if !code_valid(code, self.settings.digits) {
            return false;
        }

        match self.build(secret, "") {
            Ok(totp) => totp.check(code, timestamp),
            Err(err) => {
                tracing::info!("totp verification skipped, invalid parameters: {err}");

                false
            }
        }
    }

    pub fn provisioning_url(&self, secret: &[u8], account: &str) -> Option<String> {
        match self.build(secret, account) {
            Ok(totp) => Some(totp.get_url()),
            Err(err) => {
                tracing::info!("cannot create totp provisioning url for \"{account}\": {err}");

                None
            }
        }
    }

    fn settings_config(&self, encoded: String) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("code".into(), Value::String(encoded));
        config.insert("algo".into(), Value::String(self.settings.algo.to_string()));
        config.insert("digits".into(), Value::from(self.settings.digits));
        config.insert("step".into(), Value::from(self.settings.step));
        config
    }
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

impl TwoFactorProvider for Totp {
    fn method(&self) -> &str {
        METHOD
    }

    fn title(&self) -> &str {
        "Authenticator App"
    }

    fn show_configuration(&self, user: &User) -> Option<Value> {
        if user.otp.method == METHOD {
            return Some(json!({"active": true}));
        }

        let secret = match create_secret() {
            Ok(s) => s,
            Err(err) => {
                tracing::error!("failed to create totp secret: {err}");

                return None;
            }
        };
        let url = self.provisioning_url(&secret, user.username.get_str());
        let encoded = encode_secret(&secret);

        Some(json!({
            "active": false,
            "key": encoded,
            "url": url,
            "algo": self.settings.algo.as_str(),
            "digits": self.settings.digits,
            "step": self.settings.step,
        }))
    }

    fn apply_configuration(&self, method: &str, submitted: &Submitted) -> Option<Reply> {
        if method != METHOD {
            return None;
        }

        let data = submitted.method_data()?;
        let key = data.get("key")?.as_str()?;
        let code = data.get("securitycode")?.as_str()?.trim();

        let Some(secret) = decode_secret(key) else {
            tracing::info!("totp setup rejected, invalid key");

            return None;
        };

        if !self.verify_at(&secret, code, now()) {
            tracing::info!("totp setup rejected, security code did not verify");

            return None;
        }

        Some(Reply {
            method: METHOD.to_owned(),
            config: self.settings_config(encode_secret(&secret)),
        })
    }
}
