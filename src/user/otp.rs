use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::sec::authn::twofactor::METHOD_NONE;

/// stored two factor configuration of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpConfig {
    pub method: String,

    #[serde(default)]
    pub config: Map<String, Value>,

    /// one time emergency passwords that have not been used yet
    #[serde(default)]
    pub otep: Vec<String>,
}

impl OtpConfig {
    pub fn none() -> Self {
        OtpConfig {
            method: METHOD_NONE.to_owned(),
            config: Map::new(),
            otep: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.method != METHOD_NONE
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        OtpConfig::none()
    }
}
