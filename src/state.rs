use std::sync::Arc;
use std::time::Duration;

use profile_lib::ids;
use serde_json::{Map, Value};

use crate::error::{self, Context};
use crate::config;
use crate::form::Forms;
use crate::profile::ProfileService;
use crate::sec::authn::password;
use crate::sec::authn::twofactor::{self, Registry};
use crate::user::{self, OtpConfig};
use crate::user::store::{MemoryStore, Record};

/// how long the data of a failed save is kept around for the next form
pub const FORM_DATA_TTL: Duration = Duration::from_secs(60 * 10);

/// submissions that failed to save, keyed by the user that sent them
#[derive(Debug, Clone)]
pub struct FormData {
    cache: moka::sync::Cache<ids::UserId, Map<String, Value>>,
}

impl FormData {
    pub fn new(ttl: Duration) -> Self {
        FormData {
            cache: moka::sync::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build()
        }
    }

    pub fn get(&self, id: &ids::UserId) -> Option<Map<String, Value>> {
        self.cache.get(id)
    }

    /// keeps a submission for the next form. passwords are never kept
    pub fn store(&self, id: ids::UserId, mut data: Map<String, Value>) {
        data.remove("password");
        data.remove("password2");

        self.cache.insert(id, data);
    }

    pub fn clear(&self, id: &ids::UserId) {
        self.cache.invalidate(id);
    }
}

#[derive(Debug)]
pub struct Shared {
    users: MemoryStore,
    forms: Forms,
    providers: Registry,
    settings: config::Users,
    identity: config::Identity,
    form_data: FormData,
}

pub type ArcShared = Arc<Shared>;

impl Shared {
    pub fn from_config(config: &config::Config) -> error::Result<Shared> {
        tracing::debug!("creating Shared state");

        let mut forms = Forms::builtin()?;

        if let Some(path) = &config.settings.forms.profile {
            forms.load_file(path)?;
        }

        let users = MemoryStore::new();

        for account in &config.settings.users.accounts {
            users.insert(seed_record(account)?);
        }

        tracing::info!("seeded {} user accounts", users.len());

        Ok(Shared {
            users,
            forms,
            providers: registry(&config.settings.twofactor),
            settings: config.settings.users.clone(),
            identity: config.settings.identity.clone(),
            form_data: FormData::new(FORM_DATA_TTL),
        })
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn profiles(&self) -> ProfileService<'_, MemoryStore> {
        ProfileService::new(&self.users, &self.forms, &self.providers, &self.settings)
    }
}

impl AsRef<MemoryStore> for Shared {
    fn as_ref(&self) -> &MemoryStore {
        &self.users
    }
}

impl AsRef<config::Identity> for Shared {
    fn as_ref(&self) -> &config::Identity {
        &self.identity
    }
}

fn registry(config: &config::TwoFactor) -> Registry {
    let mut registry = Registry::new();

    if config.totp.enabled {
        registry.register(twofactor::totp::Totp::new(twofactor::totp::Settings {
            issuer: config.totp.issuer.clone(),
            algo: config.totp.algo,
            digits: config.totp.digits,
            step: config.totp.step,
            window: config.totp.window,
        }));
    }

    tracing::debug!("{registry:?}");

    registry
}

fn seed_record(account: &config::Account) -> error::Result<Record> {
    let hash = match &account.password {
        Some(given) => password::create(given)
            .context(format!("failed to hash password for account {}", account.id))?,
        None => String::new(),
    };

    let record = Record {
        id: account.id,
        name: account.name.clone(),
        username: account.username.clone(),
        email: account.email.clone(),
        password: hash,
        params: account.params.clone(),
        groups: account.groups.clone(),
        block: account.block,
        send_email: false,
        require_reset: account.require_reset,
        register_date: chrono::Utc::now(),
        last_visit_date: None,
        last_reset_time: None,
        otp: OtpConfig::none(),
    };

    let check = user::User::from(&record);

    if let Err(err) = check.check() {
        tracing::warn!("account {} is seeded as is: {err}", account.id);
    }

    Ok(record)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_data_drops_passwords() {
        let form_data = FormData::new(FORM_DATA_TTL);
        let submitted = json!({
            "name": "Super User",
            "password": "a long enough password",
            "password2": "a long enough password"
        });

        form_data.store(1, submitted.as_object().unwrap().clone());

        let kept = form_data.get(&1).unwrap();

        assert_eq!(kept.get("name"), Some(&json!("Super User")));
        assert!(kept.get("password").is_none());
        assert!(kept.get("password2").is_none());
        assert!(form_data.get(&2).is_none());

        form_data.clear(&1);

        assert!(form_data.get(&1).is_none());
    }

    #[test]
    fn seeded_accounts() {
        let account = config::Account {
            id: 5,
            name: String::from("Super User"),
            username: String::from("admin"),
            email: String::from("admin@example.com"),
            password: Some(String::from("a long enough password")),
            groups: vec![8],
            params: Default::default(),
            require_reset: true,
            block: false,
        };

        let record = seed_record(&account).unwrap();

        assert_eq!(record.id, 5);
        assert!(record.require_reset);
        assert!(password::verify(&record.password, "a long enough password").unwrap());
        assert_eq!(record.otp, OtpConfig::none());
    }

    #[test]
    fn totp_registry() {
        let mut config = config::TwoFactor::default();

        assert!(registry(&config).contains("totp"));

        config.totp.enabled = false;

        assert!(!registry(&config).contains("totp"));
    }
}
