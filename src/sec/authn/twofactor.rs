use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::user::User;

pub mod totp;

/// method name that disables two factor authentication
pub const METHOD_NONE: &str = "none";

/// configuration a provider hands back when it accepts a method
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub method: String,
    pub config: Map<String, Value>,
}

/// the `twofactor` object of a profile submission. anything besides the
/// method is provider specific and usually keyed by the method name
#[derive(Debug, Clone, Deserialize)]
pub struct Submitted {
    pub method: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Submitted {
    pub fn from_value(value: Value) -> Option<Self> {
        let submitted: Submitted = serde_json::from_value(value).ok()?;

        if submitted.method.trim().is_empty() {
            None
        } else {
            Some(submitted)
        }
    }

    pub fn is_none(&self) -> bool {
        self.method == METHOD_NONE
    }

    /// data submitted for the chosen method, `twofactor.<method>`
    pub fn method_data(&self) -> Option<&Map<String, Value>> {
        self.fields.get(&self.method)?.as_object()
    }
}

pub trait TwoFactorProvider: Send + Sync {
    /// name used to select the provider
    fn method(&self) -> &str;

    fn title(&self) -> &str;

    /// setup data shown next to the profile form
    fn show_configuration(&self, user: &User) -> Option<Value>;

    /// validates the submitted setup. returning `None` leaves the current
    /// configuration of the user untouched
    fn apply_configuration(&self, method: &str, submitted: &Submitted) -> Option<Reply>;
}

/// available two factor providers keyed by method name
#[derive(Default)]
pub struct Registry {
    providers: HashMap<String, Vec<Box<dyn TwoFactorProvider>>>,
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// adds a provider. a method may be registered more than once, providers
    /// are asked in the order they were registered
    pub fn register<P>(&mut self, provider: P) -> &mut Self
    where
        P: TwoFactorProvider + 'static
    {
        let method = provider.method().to_owned();

        if let Some(list) = self.providers.get_mut(&method) {
            list.push(Box::new(provider));
        } else {
            self.order.push(method.clone());
            self.providers.insert(method, vec![Box::new(provider)]);
        }

        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.providers.contains_key(method)
    }

    /// first provider of every registered method, in registration order
    pub fn methods(&self) -> impl Iterator<Item = &dyn TwoFactorProvider> + '_ {
        self.order.iter()
            .filter_map(|method| self.providers.get(method)?.first())
            .map(|provider| provider.as_ref())
    }

    /// asks the providers registered for the method to apply the submitted
    /// setup. the first reply that names the requested method and carries a
    /// configuration wins
    pub fn apply(&self, method: &str, submitted: &Submitted) -> Option<Reply> {
        let list = self.providers.get(method)?;

        for provider in list {
            let Some(reply) = provider.apply_configuration(method, submitted) else {
                continue;
            };

            if reply.method != method || reply.config.is_empty() {
                tracing::debug!(
                    "ignoring two factor reply for \"{}\" from provider \"{}\"",
                    reply.method,
                    provider.title()
                );

                continue;
            }

            return Some(reply);
        }

        None
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("methods", &self.order)
            .finish()
    }
}
