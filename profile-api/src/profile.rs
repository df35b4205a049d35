use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use profile_lib::ids;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::form::FormDescriptor;

/// a two factor method that can be picked from the profile form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorMethod {
    pub method: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Value>,
}

/// everything needed to render the profile edit form
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileForm {
    pub form: FormDescriptor,
    pub data: Map<String, Value>,
    pub twofactor: Vec<TwoFactorMethod>,
    pub oteps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: ids::UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub params: BTreeMap<String, String>,
    pub twofactor: String,
    pub require_reset: bool,
    pub register_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reset_time: Option<DateTime<Utc>>,
}

/// result of a successful profile save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedProfile {
    pub user: Profile,
}
