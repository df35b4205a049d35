use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::{ApiError, Detail};
use crate::error::GeneralKind;

/// extra checks applied to a field value when a form is validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Email,
    Password,
    /// value must match the named field in the same group
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Rule>,
}

impl Field {
    pub fn is(&self, name: &str, group: Option<&str>) -> bool {
        self.name == name && self.group.as_deref() == group
    }

    /// dot separated key used when reporting invalid fields
    pub fn key(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// ordered set of fields describing a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub name: String,
    pub fields: Vec<Field>,
}

impl FormDescriptor {
    pub fn field(&self, name: &str, group: Option<&str>) -> Option<&Field> {
        self.fields.iter().find(|f| f.is(name, group))
    }

    pub fn field_mut(&mut self, name: &str, group: Option<&str>) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.is(name, group))
    }

    /// checks submitted data against the fields of the form. every failing
    /// field is reported in the returned error
    pub fn validate(&self, data: &Map<String, Value>) -> Result<(), ApiError> {
        let mut invalid = Vec::new();

        for field in &self.fields {
            if field.readonly {
                continue;
            }

            let value = lookup(data, &field.name, field.group.as_deref());
            let as_str = match value {
                Some(Value::String(s)) => Some(s.as_str()),
                Some(Value::Null) | None => None,
                Some(_) => {
                    invalid.push(field.key());
                    continue;
                }
            };
            let filled = as_str.map(|s| !s.is_empty()).unwrap_or(false);

            if field.required && !filled {
                invalid.push(field.key());
                continue;
            }

            let Some(given) = as_str.filter(|s| !s.is_empty()) else {
                if let Some(Rule::Equals(other)) = &field.validate {
                    if lookup_str(data, other, field.group.as_deref()).map(|s| !s.is_empty()).unwrap_or(false) {
                        invalid.push(field.key());
                    }
                }

                continue;
            };

            let passed = match &field.validate {
                Some(Rule::Email) => profile_lib::users::email_valid(given),
                Some(Rule::Password) => profile_lib::sec::authn::password_valid(given),
                Some(Rule::Equals(other)) => {
                    lookup_str(data, other, field.group.as_deref()) == Some(given)
                },
                None => true,
            };

            if !passed {
                invalid.push(field.key());
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(ApiError::from((
                GeneralKind::ValidationFailed,
                Detail::mult_keys(invalid)
            )).with_message("submitted form data is invalid"))
        }
    }
}

fn lookup<'a>(data: &'a Map<String, Value>, name: &str, group: Option<&str>) -> Option<&'a Value> {
    match group {
        Some(group) => data.get(group)?.as_object()?.get(name),
        None => data.get(name),
    }
}

fn lookup_str<'a>(data: &'a Map<String, Value>, name: &str, group: Option<&str>) -> Option<&'a str> {
    lookup(data, name, group)?.as_str()
}
