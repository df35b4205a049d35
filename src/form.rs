use std::collections::HashMap;
use std::path::Path;

use profile_api::form::FormDescriptor;

use crate::error::{self, Context};

/// definition used when no profile form is configured
const PROFILE_FORM: &str = include_str!("../forms/profile.yaml");

pub trait FormLoader {
    /// a fresh copy of the named form, `None` if it is not known
    fn load(&self, name: &str) -> Option<FormDescriptor>;
}

#[derive(Debug, Default)]
pub struct Forms {
    known: HashMap<String, FormDescriptor>,
}

impl Forms {
    pub fn new() -> Self {
        Forms::default()
    }

    /// forms that ship with the server
    pub fn builtin() -> error::Result<Self> {
        let mut forms = Forms::new();
        forms.insert(parse_form(PROFILE_FORM).context("invalid built-in profile form")?);

        Ok(forms)
    }

    pub fn insert(&mut self, form: FormDescriptor) {
        self.known.insert(form.name.clone(), form);
    }

    /// replaces a form with the definition found in the given file
    pub fn load_file(&mut self, path: &Path) -> error::Result<()> {
        let contents = std::fs::read_to_string(path)
            .context(format!("failed to read form file: \"{}\"", path.display()))?;

        let form = parse_form(&contents)
            .context(format!("failed to parse form file: \"{}\"", path.display()))?;

        tracing::debug!("loaded form \"{}\" from \"{}\"", form.name, path.display());

        self.insert(form);

        Ok(())
    }
}

fn parse_form(contents: &str) -> Result<FormDescriptor, serde_yaml::Error> {
    serde_yaml::from_str(contents)
}

impl FormLoader for Forms {
    fn load(&self, name: &str) -> Option<FormDescriptor> {
        self.known.get(name).cloned()
    }
}
