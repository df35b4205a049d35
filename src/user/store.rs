use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use profile_lib::ids;
use profile_lib::history::HistoryField;

use crate::sec::authn::otep;

use super::{User, OtpConfig, Params};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user was not found: {0}")]
    NotFound(ids::UserId),

    #[error("please enter your name")]
    InvalidName,

    #[error("please enter a valid username. no space at beginning or end, at least 2 characters and must not contain < > \\ \" ' % ; ( ) &")]
    InvalidUsername,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("username is already in use")]
    UsernameExists,

    #[error("email address is already registered")]
    EmailExists,
}

/// storage for user records and their two factor configuration
pub trait UserRepository {
    fn load(&self, id: &ids::UserId) -> Result<Option<User>, StoreError>;

    /// checks and writes the full record, last writer wins
    fn save(&self, user: &mut User) -> Result<(), StoreError>;

    fn otp_config(&self, id: &ids::UserId) -> Result<OtpConfig, StoreError>;

    /// writes the two factor configuration of a user. a method of `none`
    /// clears any stored configuration and emergency passwords
    fn set_otp_config(&self, id: &ids::UserId, config: &OtpConfig) -> Result<(), StoreError>;

    /// replaces the emergency passwords of a user with a fresh set
    fn generate_oteps(&self, id: &ids::UserId, count: usize) -> Result<Vec<String>, StoreError> {
        let mut config = self.otp_config(id)?;
        config.otep = otep::create_codes(count);

        self.set_otp_config(id, &config)?;

        Ok(config.otep)
    }
}

/// a user as it is held by the store
#[derive(Debug, Clone)]
pub struct Record {
    pub id: ids::UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub params: Params,
    pub groups: Vec<ids::GroupId>,
    pub block: bool,
    pub send_email: bool,
    pub require_reset: bool,
    pub register_date: DateTime<Utc>,
    pub last_visit_date: Option<DateTime<Utc>>,
    pub last_reset_time: Option<DateTime<Utc>>,
    pub otp: OtpConfig,
}

impl From<&Record> for User {
    fn from(record: &Record) -> Self {
        User {
            id: record.id,
            name: HistoryField::new(record.name.clone()),
            username: HistoryField::new(record.username.clone()),
            email: HistoryField::new(record.email.clone()),
            password: HistoryField::new(record.password.clone()),
            params: HistoryField::new(record.params.clone()),
            groups: Some(record.groups.clone()),
            block: record.block,
            send_email: record.send_email,
            require_reset: HistoryField::new(record.require_reset),
            register_date: record.register_date,
            last_visit_date: record.last_visit_date,
            last_reset_time: record.last_reset_time,
            otp: record.otp.clone(),
        }
    }
}

impl Record {
    fn apply(&mut self, user: &User) {
        self.name = user.name.get().clone();
        self.username = user.username.get().clone();
        self.email = user.email.get().clone();
        self.password = user.password.get().clone();
        self.params = user.params.get().clone();
        self.block = user.block;
        self.send_email = user.send_email;
        self.require_reset = *user.require_reset.get();
        self.last_visit_date = user.last_visit_date;
        self.last_reset_time = user.last_reset_time;
        self.otp = user.otp.clone();

        if let Some(groups) = &user.groups {
            self.groups = groups.clone();
        }
    }
}

/// in process user store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<ids::UserId, Record>,
    /// held while a new username or email is checked and written
    claims: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// adds or replaces a record without any checks
    pub fn insert(&self, record: Record) {
        self.records.insert(record.id, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: &ids::UserId) -> Option<Record> {
        self.records.get(id).map(|r| r.value().clone())
    }

    fn write(&self, user: &User) -> Result<(), StoreError> {
        let mut record = self.records.get_mut(&user.id)
            .ok_or(StoreError::NotFound(user.id))?;

        record.apply(user);

        Ok(())
    }

    fn check_unique(&self, user: &User) -> Result<(), StoreError> {
        let username = user.username.get_str().to_lowercase();
        let email = user.email.get_str().to_lowercase();

        for entry in self.records.iter() {
            if entry.id == user.id {
                continue;
            }

            if entry.username.to_lowercase() == username {
                return Err(StoreError::UsernameExists);
            }

            if entry.email.to_lowercase() == email {
                return Err(StoreError::EmailExists);
            }
        }

        Ok(())
    }
}

impl UserRepository for MemoryStore {
    fn load(&self, id: &ids::UserId) -> Result<Option<User>, StoreError> {
        Ok(self.records.get(id).map(|r| User::from(r.value())))
    }

    fn save(&self, user: &mut User) -> Result<(), StoreError> {
        user.check()?;

        if user.username.is_updated() || user.email.is_updated() {
            let _claim = self.claims.lock()
                .unwrap_or_else(PoisonError::into_inner);

            self.check_unique(user)?;
            self.write(user)?;
        } else {
            self.write(user)?;
        }

        tracing::debug!("stored user {} changed: {:?}", user.id, user.changed());

        user.commit();

        Ok(())
    }

    fn otp_config(&self, id: &ids::UserId) -> Result<OtpConfig, StoreError> {
        self.records.get(id)
            .map(|r| r.otp.clone())
            .ok_or(StoreError::NotFound(*id))
    }

    fn set_otp_config(&self, id: &ids::UserId, config: &OtpConfig) -> Result<(), StoreError> {
        let mut record = self.records.get_mut(id)
            .ok_or(StoreError::NotFound(*id))?;

        record.otp = if config.is_enabled() {
            config.clone()
        } else {
            OtpConfig::none()
        };

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use serde_json::{json, Map, Value};

    pub fn record(id: ids::UserId, username: &str) -> Record {
        Record {
            id,
            name: format!("User {id}"),
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password: String::new(),
            params: Params::new(),
            groups: vec![7, 8],
            block: false,
            send_email: true,
            require_reset: false,
            register_date: Utc::now(),
            last_visit_date: None,
            last_reset_time: None,
            otp: OtpConfig::none(),
        }
    }

    pub fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(record(1, "admin"));
        store.insert(record(2, "editor"));
        store
    }

    #[test]
    fn load_missing() {
        assert!(store().load(&99).unwrap().is_none());
    }

    #[test]
    fn save_writes_record() {
        let store = store();
        let mut user = store.load(&1).unwrap().unwrap();

        user.name.set(String::from("Super User"));
        user.groups = None;

        store.save(&mut user).unwrap();

        assert!(!user.name.is_updated());

        let saved = store.record(&1).unwrap();

        assert_eq!(saved.name, "Super User");
        assert_eq!(saved.groups, vec![7, 8], "groups are untouched when none");
    }

    #[test]
    fn save_rejects_duplicates() {
        let store = store();
        let mut user = store.load(&1).unwrap().unwrap();

        user.username.set(String::from("Editor"));
        assert!(matches!(store.save(&mut user), Err(StoreError::UsernameExists)));

        user.username.rollback();
        user.email.set(String::from("editor@example.com"));
        assert!(matches!(store.save(&mut user), Err(StoreError::EmailExists)));

        assert_eq!(store.record(&1).unwrap().email, "admin@example.com");
    }

    #[test]
    fn concurrent_claims_on_one_username() {
        let store = store();
        let barrier = std::sync::Barrier::new(2);

        let results = std::thread::scope(|scope| {
            let handles = [1, 2].map(|id| {
                let store = &store;
                let barrier = &barrier;

                scope.spawn(move || {
                    let mut user = store.load(&id).unwrap().unwrap();
                    user.username.set(String::from("claimed"));

                    barrier.wait();

                    store.save(&mut user)
                })
            });

            handles.map(|h| h.join().unwrap())
        });

        let saved = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results.iter()
            .filter(|r| matches!(r, Err(StoreError::UsernameExists)))
            .count();

        assert_eq!((saved, rejected), (1, 1));
    }

    #[test]
    fn save_missing_record() {
        let store = store();
        let mut user = store.load(&1).unwrap().unwrap();
        user.id = 50;

        assert!(matches!(store.save(&mut user), Err(StoreError::NotFound(50))));
    }

    #[test]
    fn stale_record_overwrites_otp() {
        let store = store();
        let mut stale = store.load(&1).unwrap().unwrap();

        let mut config = Map::new();
        config.insert("code".into(), Value::String("ABC".into()));

        store.set_otp_config(&1, &OtpConfig {
            method: "totp".into(),
            config,
            otep: vec![],
        }).unwrap();

        store.save(&mut stale).unwrap();

        assert_eq!(store.otp_config(&1).unwrap().method, "none");
    }

    #[test]
    fn none_method_clears_config() {
        let store = store();

        store.set_otp_config(&1, &OtpConfig {
            method: "totp".into(),
            config: json!({"code": "ABC"}).as_object().unwrap().clone(),
            otep: vec!["1".into()],
        }).unwrap();

        store.set_otp_config(&1, &OtpConfig {
            method: "none".into(),
            config: json!({"code": "ABC"}).as_object().unwrap().clone(),
            otep: vec!["1".into()],
        }).unwrap();

        assert_eq!(store.otp_config(&1).unwrap(), OtpConfig::none());
    }

    #[test]
    fn generate_oteps_persists() {
        let store = store();
        let codes = store.generate_oteps(&2, 5).unwrap();

        assert_eq!(codes.len(), 5);
        assert_eq!(store.otp_config(&2).unwrap().otep, codes);
    }
}
