use std::path::PathBuf;
use std::collections::{BTreeMap, HashMap};

use profile_lib::ids;
use profile_lib::sec::authn::totp::Algo;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Listener {
    pub addr: String,
}

#[derive(Debug, Deserialize)]
pub struct Identity {
    pub header: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub id: ids::UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: Option<String>,

    #[serde(default)]
    pub groups: Vec<ids::GroupId>,

    #[serde(default)]
    pub params: BTreeMap<String, String>,

    pub require_reset: Option<bool>,
    pub block: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct Users {
    pub change_login_name: Option<bool>,
    pub multilanguage: Option<bool>,
    pub languages: Option<Vec<String>>,
    pub otep_count: Option<usize>,
    pub accounts: Option<Vec<Account>>,
}

#[derive(Debug, Deserialize)]
pub struct Forms {
    pub profile: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Totp {
    pub enabled: Option<bool>,
    pub issuer: Option<String>,
    pub algo: Option<Algo>,
    pub digits: Option<u32>,
    pub step: Option<u64>,
    pub window: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactor {
    pub totp: Option<Totp>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub listeners: Option<HashMap<String, Listener>>,

    pub identity: Option<Identity>,
    pub users: Option<Users>,
    pub forms: Option<Forms>,
    pub twofactor: Option<TwoFactor>,
}
