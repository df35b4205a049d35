use profile_api::form::FormDescriptor;
use profile_api::profile::TwoFactorMethod;
use profile_lib::ids;
use profile_lib::users::username_compliant;
use serde_json::{Map, Value};

use crate::config;
use crate::form::FormLoader;
use crate::sec::authn::twofactor::{Registry, Submitted, METHOD_NONE};
use crate::user::{User, OtpConfig, UserRepository, StoreError, BindError};

/// name of the form definition used for profiles
pub const FORM_NAME: &str = "profile";

/// fields a client is never allowed to set on its own record
pub const STRIPPED_FIELDS: [&str; 4] = ["id", "groups", "sendEmail", "block"];

pub const LOCKED_USERNAME_DESCRIPTION: &str = "The username cannot be changed.";

/// state of a single profile request. created from the authenticated user
/// and shared between preparing the form and saving it
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: ids::UserId,
    pub require_reset: bool,
    /// set once the form has been prepared
    pub username_compliant: Option<bool>,
    /// the user a successful save was applied to
    pub subject_id: Option<ids::UserId>,
}

impl RequestContext {
    pub fn new(user_id: ids::UserId, require_reset: bool) -> Self {
        RequestContext {
            user_id,
            require_reset,
            username_compliant: None,
            subject_id: None,
        }
    }
}

impl From<&User> for RequestContext {
    fn from(user: &User) -> Self {
        RequestContext::new(user.id, *user.require_reset.get())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("the profile form could not be loaded")]
    FormUnavailable,

    #[error("user was not found: {0}")]
    NotFound(ids::UserId),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// a prepared form and the data to fill it with
#[derive(Debug, Clone)]
pub struct Form {
    pub descriptor: FormDescriptor,
    pub data: Map<String, Value>,
}

pub struct ProfileService<'a, S> {
    store: &'a S,
    forms: &'a dyn FormLoader,
    providers: &'a Registry,
    users: &'a config::Users,
}

impl<'a, S> ProfileService<'a, S>
where
    S: UserRepository
{
    pub fn new(
        store: &'a S,
        forms: &'a dyn FormLoader,
        providers: &'a Registry,
        users: &'a config::Users,
    ) -> Self {
        ProfileService {
            store,
            forms,
            providers,
            users,
        }
    }

    pub fn get_item(&self, id: &ids::UserId) -> Result<User, ProfileError> {
        self.store.load(id)?
            .ok_or(ProfileError::NotFound(*id))
    }

    /// the username field is locked when changing it is not allowed and the
    /// current value is already well formed
    pub fn username_locked(&self, compliant: bool) -> bool {
        !self.users.change_login_name && compliant
    }

    /// data to fill the form with. data from a previously failed save is
    /// preferred over the stored record
    pub fn load_form_data(
        &self,
        user: &User,
        prior: Option<Map<String, Value>>
    ) -> Map<String, Value> {
        match prior {
            Some(data) if !data.is_empty() => data,
            _ => user.form_data(),
        }
    }

    pub fn prepare_form(
        &self,
        ctx: &mut RequestContext,
        prior: Option<Map<String, Value>>
    ) -> Result<Form, ProfileError> {
        let mut descriptor = self.forms.load(FORM_NAME)
            .ok_or(ProfileError::FormUnavailable)?;
        let user = self.get_item(&ctx.user_id)?;
        let data = self.load_form_data(&user, prior);

        let compliant = username_compliant(user.username.get_str());

        if self.username_locked(compliant) {
            if let Some(field) = descriptor.field_mut("username", None) {
                field.required = false;
                field.readonly = true;
                field.description = LOCKED_USERNAME_DESCRIPTION.to_owned();
            }
        }

        if self.users.multilanguage {
            if let Some(field) = descriptor.field_mut("language", Some("params")) {
                field.kind = String::from("frontend_language");
            }
        }

        if ctx.require_reset {
            for name in ["password", "password2"] {
                if let Some(field) = descriptor.field_mut(name, None) {
                    field.required = true;
                }
            }
        }

        ctx.username_compliant = Some(compliant);

        Ok(Form {
            descriptor,
            data,
        })
    }

    /// two factor methods available to the user along with the setup data of
    /// each provider
    pub fn two_factor_methods(&self, user: &User) -> Vec<TwoFactorMethod> {
        let mut rtn = vec![TwoFactorMethod {
            method: METHOD_NONE.to_owned(),
            title: String::from("Disable Two Factor Authentication"),
            setup: None,
        }];

        for provider in self.providers.methods() {
            rtn.push(TwoFactorMethod {
                method: provider.method().to_owned(),
                title: provider.title().to_owned(),
                setup: provider.show_configuration(user),
            });
        }

        rtn
    }

    pub fn save(
        &self,
        ctx: &mut RequestContext,
        mut data: Map<String, Value>
    ) -> Result<User, ProfileError> {
        let user_id = ctx.user_id;

        for key in STRIPPED_FIELDS {
            if data.remove(key).is_some() {
                tracing::debug!("user {user_id} submitted protected field \"{key}\"");
            }
        }

        let mut user = self.get_item(&user_id)?;

        let compliant = match ctx.username_compliant {
            Some(flag) => flag,
            None => username_compliant(user.username.get_str()),
        };

        if self.username_locked(compliant) && data.remove("username").is_some() {
            tracing::debug!("user {user_id} username is locked, ignoring submitted value");
        }

        if let Some(twofactor) = data.remove("twofactor") {
            self.reconcile_two_factor(&user_id, twofactor)?;

            user = self.get_item(&user_id)?;
        }

        user.bind(data, &self.users.languages)?;

        user.groups = None;

        self.store.save(&mut user)?;

        tracing::info!("user {user_id} profile saved");

        ctx.subject_id = Some(user.id);

        Ok(user)
    }

    /// applies the submitted two factor method and persists the result
    /// before the rest of the record is bound
    fn reconcile_two_factor(&self, user_id: &ids::UserId, value: Value) -> Result<(), ProfileError> {
        let submitted = Submitted::from_value(value)
            .ok_or_else(|| BindError::InvalidType(String::from("twofactor")))?;

        if submitted.is_none() {
            self.store.set_otp_config(user_id, &OtpConfig::none())?;

            tracing::info!("user {user_id} disabled two factor authentication");

            return Ok(());
        }

        let mut config = self.store.otp_config(user_id)?;

        match self.providers.apply(&submitted.method, &submitted) {
            Some(reply) => {
                tracing::info!("user {user_id} two factor method set to \"{}\"", reply.method);

                config.method = reply.method;
                config.config = reply.config;
            },
            None if !self.providers.contains(&submitted.method) => {
                tracing::warn!(
                    "user {user_id} requested unknown two factor method \"{}\"",
                    submitted.method
                );
            },
            None => {
                tracing::warn!(
                    "user {user_id} no provider accepted two factor method \"{}\", keeping \"{}\"",
                    submitted.method,
                    config.method
                );
            }
        }

        self.store.set_otp_config(user_id, &config)?;

        if config.is_enabled() && config.otep.is_empty() {
            let codes = self.store.generate_oteps(user_id, self.users.otep_count)?;

            tracing::debug!("user {user_id} issued {} emergency passwords", codes.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::form::Forms;
    use crate::sec::authn::twofactor::test::Fixed;
    use crate::user::store::{MemoryStore, Record};
    use crate::user::store::test::{record, store};

    struct Harness {
        store: MemoryStore,
        forms: Forms,
        providers: Registry,
        users: config::Users,
    }

    impl Harness {
        fn new() -> Self {
            let mut providers = Registry::new();
            providers.register(Fixed::accepting("fixed", "first"))
                .register(Fixed::accepting("fixed", "second"));

            Harness {
                store: store(),
                forms: Forms::builtin().unwrap(),
                providers,
                users: config::Users {
                    languages: vec![String::from("en-GB"), String::from("de-DE")],
                    otep_count: 4,
                    ..config::Users::default()
                },
            }
        }

        fn service(&self) -> ProfileService<'_, MemoryStore> {
            ProfileService::new(&self.store, &self.forms, &self.providers, &self.users)
        }

        fn insert(&self, record: Record) {
            self.store.insert(record);
        }
    }

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    fn totp_config() -> OtpConfig {
        OtpConfig {
            method: String::from("fixed"),
            config: data(json!({"tag": "existing"})),
            otep: vec![String::from("1111222233334444")],
        }
    }

    #[test]
    fn prepare_locks_compliant_username() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(1, false);

        let form = harness.service().prepare_form(&mut ctx, None).unwrap();
        let username = form.descriptor.field("username", None).unwrap();

        assert!(username.readonly);
        assert!(!username.required);
        assert_eq!(username.description, LOCKED_USERNAME_DESCRIPTION);
        assert_eq!(ctx.username_compliant, Some(true));
        assert_eq!(form.data.get("username"), Some(&json!("admin")));
    }

    #[test]
    fn prepare_leaves_noncompliant_username_editable() {
        let harness = Harness::new();
        harness.insert(Record {
            email: String::from("bad@example.com"),
            ..record(3, "bad(name)")
        });

        let mut ctx = RequestContext::new(3, false);
        let form = harness.service().prepare_form(&mut ctx, None).unwrap();
        let username = form.descriptor.field("username", None).unwrap();

        assert!(!username.readonly);
        assert!(username.required);
        assert_eq!(ctx.username_compliant, Some(false));
    }

    #[test]
    fn prepare_with_name_changes_allowed() {
        let mut harness = Harness::new();
        harness.users.change_login_name = true;

        let mut ctx = RequestContext::new(1, false);
        let form = harness.service().prepare_form(&mut ctx, None).unwrap();

        assert!(!form.descriptor.field("username", None).unwrap().readonly);
        assert_eq!(ctx.username_compliant, Some(true));
    }

    #[test]
    fn prepare_multilanguage() {
        let mut harness = Harness::new();

        let mut ctx = RequestContext::new(1, false);
        let form = harness.service().prepare_form(&mut ctx, None).unwrap();

        assert_eq!(form.descriptor.field("language", Some("params")).unwrap().kind, "language");

        harness.users.multilanguage = true;

        let form = harness.service().prepare_form(&mut ctx, None).unwrap();

        assert_eq!(form.descriptor.field("language", Some("params")).unwrap().kind, "frontend_language");
        assert_eq!(form.descriptor.field("admin_language", Some("params")).unwrap().kind, "administrator_language");
    }

    #[test]
    fn prepare_forced_reset() {
        let harness = Harness::new();

        let mut ctx = RequestContext::new(1, true);
        let form = harness.service().prepare_form(&mut ctx, None).unwrap();

        assert!(form.descriptor.field("password", None).unwrap().required);
        assert!(form.descriptor.field("password2", None).unwrap().required);

        let mut ctx = RequestContext::new(1, false);
        let form = harness.service().prepare_form(&mut ctx, None).unwrap();

        assert!(!form.descriptor.field("password", None).unwrap().required);
    }

    #[test]
    fn prepare_prefers_prior_data() {
        let harness = Harness::new();
        let prior = data(json!({"name": "Unsaved Name", "username": "admin"}));

        let mut ctx = RequestContext::new(1, false);
        let form = harness.service().prepare_form(&mut ctx, Some(prior.clone())).unwrap();

        assert_eq!(form.data, prior);

        let form = harness.service().prepare_form(&mut ctx, Some(Map::new())).unwrap();

        assert_eq!(form.data.get("name"), Some(&json!("User 1")));
    }

    #[test]
    fn prepare_without_form() {
        let harness = Harness::new();
        let empty = Forms::new();
        let service = ProfileService::new(&harness.store, &empty, &harness.providers, &harness.users);

        let mut ctx = RequestContext::new(1, false);

        assert!(matches!(service.prepare_form(&mut ctx, None), Err(ProfileError::FormUnavailable)));
        assert_eq!(ctx.username_compliant, None);
    }

    #[test]
    fn prepare_unknown_user() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(42, false);

        assert!(matches!(harness.service().prepare_form(&mut ctx, None), Err(ProfileError::NotFound(42))));
    }

    #[test]
    fn save_strips_protected_fields() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(2, false);

        let user = harness.service().save(&mut ctx, data(json!({
            "id": 1,
            "groups": [1, 2, 3],
            "sendEmail": false,
            "block": true,
            "name": "Editor In Chief"
        }))).unwrap();

        assert_eq!(user.id, 2);

        let stored = harness.store.record(&2).unwrap();

        assert_eq!(stored.name, "Editor In Chief");
        assert_eq!(stored.groups, vec![7, 8]);
        assert!(stored.send_email);
        assert!(!stored.block);
        assert_eq!(harness.store.record(&1).unwrap().name, "User 1");
    }

    #[test]
    fn save_ignores_locked_username() {
        let harness = Harness::new();
        let service = harness.service();
        let mut ctx = RequestContext::new(1, false);

        service.prepare_form(&mut ctx, None).unwrap();
        service.save(&mut ctx, data(json!({"username": "root"}))).unwrap();

        assert_eq!(harness.store.record(&1).unwrap().username, "admin");
    }

    #[test]
    fn save_computes_compliance_when_not_prepared() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(1, false);

        harness.service().save(&mut ctx, data(json!({"username": "root"}))).unwrap();

        assert_eq!(harness.store.record(&1).unwrap().username, "admin");
    }

    #[test]
    fn save_allows_fixing_noncompliant_username() {
        let harness = Harness::new();
        harness.insert(Record {
            email: String::from("padded@example.com"),
            ..record(3, " padded")
        });

        let service = harness.service();
        let mut ctx = RequestContext::new(3, false);

        service.prepare_form(&mut ctx, None).unwrap();
        service.save(&mut ctx, data(json!({"username": "padded"}))).unwrap();

        assert_eq!(harness.store.record(&3).unwrap().username, "padded");
    }

    #[test]
    fn save_username_when_changes_allowed() {
        let mut harness = Harness::new();
        harness.users.change_login_name = true;

        let mut ctx = RequestContext::new(1, false);
        harness.service().save(&mut ctx, data(json!({"username": "root"}))).unwrap();

        assert_eq!(harness.store.record(&1).unwrap().username, "root");
    }

    #[test]
    fn save_locked_username_and_disable_two_factor() {
        let harness = Harness::new();
        harness.insert(Record {
            otp: totp_config(),
            ..record(3, "bob")
        });

        let service = harness.service();
        let mut ctx = RequestContext::new(3, false);

        service.prepare_form(&mut ctx, None).unwrap();

        let user = service.save(&mut ctx, data(json!({
            "username": "bob!",
            "twofactor": {"method": "none"}
        }))).unwrap();

        assert_eq!(user.username.get_str(), "bob");

        let stored = harness.store.record(&3).unwrap();

        assert_eq!(stored.username, "bob");
        assert_eq!(stored.otp, OtpConfig::none());
        assert!(stored.otp.otep.is_empty());
        assert_eq!(ctx.subject_id, Some(3));
    }

    #[test]
    fn switching_method_issues_emergency_passwords() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(1, false);

        let user = harness.service().save(&mut ctx, data(json!({
            "twofactor": {"method": "fixed"}
        }))).unwrap();

        assert_eq!(user.otp.method, "fixed");
        assert_eq!(user.otp.config.get("tag"), Some(&json!("first")));
        assert_eq!(user.otp.otep.len(), 4);

        let stored = harness.store.otp_config(&1).unwrap();

        assert_eq!(stored, user.otp);
    }

    #[test]
    fn existing_emergency_passwords_are_kept() {
        let harness = Harness::new();
        harness.insert(Record {
            otp: totp_config(),
            ..record(3, "carol")
        });

        let mut ctx = RequestContext::new(3, false);

        harness.service().save(&mut ctx, data(json!({
            "twofactor": {"method": "fixed"}
        }))).unwrap();

        let stored = harness.store.otp_config(&3).unwrap();

        assert_eq!(stored.config.get("tag"), Some(&json!("first")));
        assert_eq!(stored.otep, vec![String::from("1111222233334444")]);
    }

    #[test]
    fn unaccepted_method_keeps_configuration() {
        let harness = Harness::new();
        harness.insert(Record {
            otp: totp_config(),
            ..record(3, "carol")
        });

        let mut ctx = RequestContext::new(3, false);

        harness.service().save(&mut ctx, data(json!({
            "twofactor": {"method": "missing"}
        }))).unwrap();

        assert_eq!(harness.store.otp_config(&3).unwrap(), totp_config());

        let mut ctx = RequestContext::new(1, false);

        harness.service().save(&mut ctx, data(json!({
            "twofactor": {"method": "missing"}
        }))).unwrap();

        let stored = harness.store.otp_config(&1).unwrap();

        assert_eq!(stored, OtpConfig::none());
    }

    #[test]
    fn bind_failure_keeps_two_factor_change() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(1, false);

        let result = harness.service().save(&mut ctx, data(json!({
            "name": "Not Saved",
            "params": {"language": "xx-XX"},
            "twofactor": {"method": "fixed"}
        })));

        assert!(matches!(result, Err(ProfileError::Bind(BindError::InvalidLanguage { .. }))));
        assert_eq!(ctx.subject_id, None);

        let stored = harness.store.record(&1).unwrap();

        assert_eq!(stored.name, "User 1");
        assert_eq!(stored.otp.method, "fixed");
        assert!(!stored.otp.otep.is_empty());
    }

    #[test]
    fn invalid_two_factor_submission() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(1, false);

        let result = harness.service().save(&mut ctx, data(json!({
            "twofactor": "fixed"
        })));

        assert!(matches!(result, Err(ProfileError::Bind(BindError::InvalidType(field))) if field == "twofactor"));
        assert_eq!(harness.store.otp_config(&1).unwrap(), OtpConfig::none());
    }

    #[test]
    fn persistence_failure() {
        let harness = Harness::new();
        let mut ctx = RequestContext::new(1, false);

        let result = harness.service().save(&mut ctx, data(json!({
            "email": "EDITOR@example.com"
        })));

        assert!(matches!(result, Err(ProfileError::Persistence(StoreError::EmailExists))));
        assert_eq!(harness.store.record(&1).unwrap().email, "admin@example.com");
        assert_eq!(ctx.subject_id, None);
    }

    #[test]
    fn save_password_clears_reset() {
        let harness = Harness::new();
        harness.insert(Record {
            require_reset: true,
            ..record(3, "dave")
        });

        let service = harness.service();
        let mut ctx = RequestContext::new(3, true);

        service.prepare_form(&mut ctx, None).unwrap();
        service.save(&mut ctx, data(json!({
            "password": "a long enough password",
            "password2": "a long enough password"
        }))).unwrap();

        let stored = harness.store.record(&3).unwrap();

        assert!(!stored.require_reset);
        assert!(stored.last_reset_time.is_some());
        assert!(crate::sec::authn::password::verify(&stored.password, "a long enough password").unwrap());
    }

    #[test]
    fn method_list() {
        let harness = Harness::new();
        let user = harness.service().get_item(&1).unwrap();

        let methods = harness.service().two_factor_methods(&user);
        let names: Vec<&str> = methods.iter()
            .map(|m| m.method.as_str())
            .collect();

        assert_eq!(names, vec!["none", "fixed"]);
    }
}
