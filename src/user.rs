use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use profile_lib::ids;
use profile_lib::history::HistoryField;
use serde_json::{Map, Value};

use crate::sec::authn::password;

pub mod otp;
pub mod store;

pub use otp::OtpConfig;
pub use store::{UserRepository, StoreError};

pub type Params = BTreeMap<String, String>;

/// params that hold a language code which has to be installed
pub const LANGUAGE_PARAMS: [&str; 2] = ["admin_language", "language"];

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("\"{0}\" has an invalid type")]
    InvalidType(String),

    #[error("\"{field}\" is not an installed language: \"{value}\"")]
    InvalidLanguage {
        field: String,
        value: String,
    },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error(transparent)]
    Password(#[from] password::PasswordError),
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: ids::UserId,
    pub name: HistoryField<String>,
    pub username: HistoryField<String>,
    pub email: HistoryField<String>,
    /// argon2 encoded hash
    pub password: HistoryField<String>,
    pub params: HistoryField<Params>,
    /// `None` leaves the stored memberships as they are
    pub groups: Option<Vec<ids::GroupId>>,
    pub block: bool,
    pub send_email: bool,
    pub require_reset: HistoryField<bool>,
    pub register_date: DateTime<Utc>,
    pub last_visit_date: Option<DateTime<Utc>>,
    pub last_reset_time: Option<DateTime<Utc>>,
    pub otp: OtpConfig,
}

/// values pulled out of a submission before any of them touch the record
struct Bound {
    name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    params: Option<Params>,
}

fn optional_string(field: &str, value: Value) -> Result<Option<String>, BindError> {
    match value {
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        _ => Err(BindError::InvalidType(field.to_owned()))
    }
}

fn bind_params(
    mut current: Params,
    value: Value,
    languages: &[String]
) -> Result<Params, BindError> {
    let Value::Object(given) = value else {
        return Err(BindError::InvalidType(String::from("params")));
    };

    for (key, value) in given {
        match value {
            Value::Null => {
                current.remove(&key);
            },
            Value::String(v) => {
                if LANGUAGE_PARAMS.contains(&key.as_str()) && !v.is_empty() && !languages.contains(&v) {
                    return Err(BindError::InvalidLanguage {
                        field: format!("params.{key}"),
                        value: v
                    });
                }

                current.insert(key, v);
            },
            _ => {
                return Err(BindError::InvalidType(format!("params.{key}")));
            }
        }
    }

    Ok(current)
}

impl User {
    /// moves submitted fields onto the record. nothing is changed if any of
    /// the fields fail to bind
    pub fn bind(&mut self, mut data: Map<String, Value>, languages: &[String]) -> Result<(), BindError> {
        let mut bound = Bound {
            name: None,
            username: None,
            email: None,
            password: None,
            params: None,
        };

        if let Some(value) = data.remove("name") {
            bound.name = optional_string("name", value)?;
        }

        if let Some(value) = data.remove("username") {
            bound.username = optional_string("username", value)?;
        }

        if let Some(value) = data.remove("email") {
            bound.email = optional_string("email", value)?;
        }

        let given_password = match data.remove("password") {
            Some(value) => optional_string("password", value)?,
            None => None
        };
        let given_confirm = match data.remove("password2") {
            Some(value) => optional_string("password2", value)?,
            None => None
        };

        if let Some(given) = given_password.filter(|v| !v.is_empty()) {
            if given_confirm.as_deref() != Some(given.as_str()) {
                return Err(BindError::PasswordMismatch);
            }

            bound.password = Some(given);
        }

        if let Some(value) = data.remove("params") {
            bound.params = Some(bind_params(self.params.get().clone(), value, languages)?);
        }

        for key in data.keys() {
            tracing::debug!("user {} ignoring unknown field \"{key}\"", self.id);
        }

        let hash = match bound.password {
            Some(given) => Some(password::create(given)?),
            None => None
        };

        if let Some(name) = bound.name {
            self.name.set_changed(name);
        }

        if let Some(username) = bound.username {
            self.username.set_changed(username);
        }

        if let Some(email) = bound.email {
            self.email.set_changed(email);
        }

        if let Some(params) = bound.params {
            self.params.set_changed(params);
        }

        if let Some(hash) = hash {
            self.password.set(hash);
            self.require_reset.set_changed(false);
            self.last_reset_time = Some(Utc::now());
        }

        Ok(())
    }

    /// validates the record before it is stored
    pub fn check(&self) -> Result<(), StoreError> {
        if !profile_lib::users::name_valid(self.name.get_str()) {
            return Err(StoreError::InvalidName);
        }

        if !profile_lib::users::username_valid(self.username.get_str()) {
            return Err(StoreError::InvalidUsername);
        }

        if !profile_lib::users::email_valid(self.email.get_str()) {
            return Err(StoreError::InvalidEmail);
        }

        Ok(())
    }

    /// names of the fields changed since the record was loaded
    pub fn changed(&self) -> Vec<&'static str> {
        let mut rtn = Vec::new();

        if self.name.is_updated() {
            rtn.push("name");
        }

        if self.username.is_updated() {
            rtn.push("username");
        }

        if self.email.is_updated() {
            rtn.push("email");
        }

        if self.password.is_updated() {
            rtn.push("password");
        }

        if self.params.is_updated() {
            rtn.push("params");
        }

        if self.require_reset.is_updated() {
            rtn.push("require_reset");
        }

        rtn
    }

    pub fn commit(&mut self) {
        self.name.commit();
        self.username.commit();
        self.email.commit();
        self.password.commit();
        self.params.commit();
        self.require_reset.commit();
    }

    /// the record as data for the profile form. the password is never
    /// included
    pub fn form_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("id".into(), Value::from(self.id));
        data.insert("name".into(), Value::String(self.name.get().clone()));
        data.insert("username".into(), Value::String(self.username.get().clone()));
        data.insert("email".into(), Value::String(self.email.get().clone()));
        data.insert("registerDate".into(), Value::String(self.register_date.to_rfc3339()));
        data.insert(
            "lastvisitDate".into(),
            self.last_visit_date
                .map(|v| Value::String(v.to_rfc3339()))
                .unwrap_or(Value::Null)
        );

        let params = self.params.get()
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>();

        data.insert("params".into(), Value::Object(params));

        let mut twofactor = Map::new();
        twofactor.insert("method".into(), Value::String(self.otp.method.clone()));

        data.insert("twofactor".into(), Value::Object(twofactor));
        data
    }

    pub fn to_profile(&self) -> profile_api::profile::Profile {
        profile_api::profile::Profile {
            id: self.id,
            name: self.name.get().clone(),
            username: self.username.get().clone(),
            email: self.email.get().clone(),
            params: self.params.get().clone(),
            twofactor: self.otp.method.clone(),
            require_reset: *self.require_reset.get(),
            register_date: self.register_date,
            last_visit_date: self.last_visit_date,
            last_reset_time: self.last_reset_time,
        }
    }
}
