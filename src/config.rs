use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::net::{SocketAddr, IpAddr};
use std::fmt::{Display, Formatter};

use clap::Parser;
use profile_lib::ids;
use profile_lib::sec::authn::totp::{self as totp_lib, Algo};

use crate::error::{self, Context};
use crate::sec::authn::otep;

mod shape;

#[derive(Debug, Parser)]
#[command(author, version ,about, long_about = None)]
pub struct CliArgs {
    /// a config file to load, may be given multiple times
    #[arg(long)]
    config: Vec<PathBuf>
}

#[derive(Debug)]
pub struct Config {
    pub settings: Settings,
}

pub fn get_config() -> error::Result<Config> {
    Config::from_args(CliArgs::parse())
}

impl Config {
    pub fn from_args(args: CliArgs) -> error::Result<Self> {
        let cwd = std::env::current_dir()
            .context("failed to retrieve cwd for Settings")?;
        let mut settings = Settings::default();

        for config_path in args.config {
            let full = if config_path.is_absolute() {
                config_path
            } else {
                cwd.join(config_path)
            };

            tracing::debug!("loading config file \"{}\"", full.display());

            let loaded = Self::load_file(&full)?;
            let src = SrcFile::new(&full)?;
            let dot = DotPath::new(&"settings");

            settings.merge(&src, dot, loaded)?;
        }

        if settings.listeners.is_empty() {
            settings.listeners.insert("local".into(), Listener::default());
        }

        tracing::debug!("{settings:#?}");

        Ok(Config {
            settings
        })
    }

    fn load_file(path: &PathBuf) -> error::Result<shape::Settings> {
        let ext = path.extension().context(format!(
            "failed to retrieve the file extension for config file: \"{}\"", path.display()
        ))?;

        let ext = ext.to_ascii_lowercase();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .context(format!("failed to open config file: \"{}\"", path.display()))?;
        let reader = std::io::BufReader::new(file);

        if ext.eq("yaml") || ext.eq("yml") {
            serde_yaml::from_reader(reader).context(format!(
                "failed to parse yaml config file: \"{}\"", path.display()
            ))
        } else if ext.eq("json") {
            serde_json::from_reader(reader).context(format!(
                "failed to parse json config file: \"{}\"", path.display()
            ))
        } else {
            Err(error::Error::new().context(format!(
                "unknown type of config file: \"{}\"", path.display()
            )))
        }
    }
}

struct SrcFile<'a> {
    parent: &'a Path,
    src: &'a Path,
}

impl<'a> SrcFile<'a> {
    fn new(src: &'a Path) -> error::Result<Self> {
        let parent = src.parent().context(format!(
            "failed to retrieve parent path from source file \"{}\"", src.display()
        ))?;

        Ok(SrcFile {
            parent,
            src
        })
    }
}

impl<'a> Display for SrcFile<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.src.display())
    }
}

struct Quote<'a>(&'a dyn Display);

impl<'a> Display for Quote<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

struct DotPath<'a>(Vec<&'a dyn Display>);

impl<'a> DotPath<'a> {
    fn new(name: &'a (dyn Display)) -> Self {
        DotPath(vec![name])
    }

    fn push(&self, name: &'a (dyn Display)) -> Self {
        let mut path = self.0.clone();
        path.push(name);

        DotPath(path)
    }
}

impl<'a> Display for DotPath<'a> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for name in &self.0 {
            if first {
                write!(fmt, "{name}")?;
                first = false;
            } else {
                write!(fmt, ".{name}")?;
            }
        }

        Ok(())
    }
}

fn invalid(dot: &DotPath<'_>, src: &SrcFile<'_>, msg: &str) -> error::Error {
    error::Error::new().context(format!("{dot} {msg}. file: {src}"))
}

#[derive(Debug, Default)]
pub struct Settings {
    pub listeners: HashMap<String, Listener>,
    pub identity: Identity,
    pub users: Users,
    pub forms: Forms,
    pub twofactor: TwoFactor,
}

impl Settings {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, settings: shape::Settings) -> error::Result<()> {
        if let Some(listeners) = settings.listeners {
            let listeners_dot = dot.push(&"listeners");

            for (key, listener) in listeners {
                if let Some(found) = self.listeners.get_mut(&key) {
                    found.merge(src, listeners_dot.push(&Quote(&key)), listener)?;
                } else {
                    let mut default = Listener::default();
                    default.merge(src, listeners_dot.push(&Quote(&key)), listener)?;

                    self.listeners.insert(key, default);
                }
            }
        }

        if let Some(identity) = settings.identity {
            self.identity.merge(src, dot.push(&"identity"), identity)?;
        }

        if let Some(users) = settings.users {
            self.users.merge(src, dot.push(&"users"), users)?;
        }

        if let Some(forms) = settings.forms {
            self.forms.merge(src, dot.push(&"forms"), forms)?;
        }

        if let Some(twofactor) = settings.twofactor {
            if let Some(totp) = twofactor.totp {
                self.twofactor.totp.merge(src, dot.push(&"twofactor").push(&"totp"), totp)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Listener {
    pub addr: SocketAddr,
}

impl Listener {
    fn merge(&mut self, src: &SrcFile<'_>, dot_path: DotPath<'_>, listener: shape::Listener) -> error::Result<()> {
        self.addr = match SocketAddr::from_str(&listener.addr) {
            Ok(valid) => valid,
            Err(_) => match IpAddr::from_str(&listener.addr) {
                Ok(valid) => SocketAddr::from((valid, 8080)),
                Err(_) => {
                    return Err(error::Error::new().context(format!(
                        "{dot_path}.addr invalid: \"{}\" file: {src}", listener.addr
                    )));
                }
            }
        };

        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Identity {
    /// header holding the id of the authenticated user, set by the proxy in
    /// front of the server
    pub header: String,
}

impl Identity {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, identity: shape::Identity) -> error::Result<()> {
        if let Some(header) = identity.header {
            let header = header.trim().to_ascii_lowercase();

            if axum::http::HeaderName::from_str(&header).is_err() {
                return Err(invalid(&dot.push(&"header"), src, "is not a valid header name"));
            }

            self.header = header;
        }

        Ok(())
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity {
            header: String::from("x-user-id"),
        }
    }
}

/// user account seeded into the store on startup
#[derive(Debug, Clone)]
pub struct Account {
    pub id: ids::UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub groups: Vec<ids::GroupId>,
    pub params: BTreeMap<String, String>,
    pub require_reset: bool,
    pub block: bool,
}

#[derive(Debug, Clone)]
pub struct Users {
    /// users may change their own username
    pub change_login_name: bool,
    pub multilanguage: bool,
    /// installed language codes
    pub languages: Vec<String>,
    pub otep_count: usize,
    pub accounts: Vec<Account>,
}

impl Users {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, users: shape::Users) -> error::Result<()> {
        if let Some(change_login_name) = users.change_login_name {
            self.change_login_name = change_login_name;
        }

        if let Some(multilanguage) = users.multilanguage {
            self.multilanguage = multilanguage;
        }

        if let Some(languages) = users.languages {
            let languages_dot = dot.push(&"languages");

            if languages.is_empty() {
                return Err(invalid(&languages_dot, src, "must contain at least one language"));
            }

            let mut rtn = Vec::with_capacity(languages.len());

            for code in languages {
                let trimmed = code.trim();

                if trimmed.is_empty() {
                    return Err(invalid(&languages_dot, src, "contains an empty language code"));
                }

                if !rtn.iter().any(|known: &String| known == trimmed) {
                    rtn.push(trimmed.to_owned());
                }
            }

            self.languages = rtn;
        }

        if let Some(otep_count) = users.otep_count {
            if otep_count == 0 || otep_count > 100 {
                return Err(invalid(&dot.push(&"otep_count"), src, "must be between 1 and 100"));
            }

            self.otep_count = otep_count;
        }

        if let Some(accounts) = users.accounts {
            let accounts_dot = dot.push(&"accounts");
            let mut seen = self.accounts.iter()
                .map(|a| a.id)
                .collect::<HashSet<ids::UserId>>();

            for account in accounts {
                let id_str = account.id.to_string();
                let account_dot = accounts_dot.push(&id_str);

                if account.id <= 0 {
                    return Err(invalid(&account_dot, src, "id must be a positive integer"));
                }

                if !seen.insert(account.id) {
                    return Err(invalid(&account_dot, src, "id is used by another account"));
                }

                if account.username.is_empty() {
                    return Err(invalid(&account_dot.push(&"username"), src, "cannot be empty"));
                }

                if !profile_lib::users::email_valid(&account.email) {
                    return Err(invalid(&account_dot.push(&"email"), src, "is not a valid email"));
                }

                self.accounts.push(Account {
                    id: account.id,
                    name: account.name,
                    username: account.username,
                    email: account.email,
                    password: account.password,
                    groups: account.groups,
                    params: account.params,
                    require_reset: account.require_reset.unwrap_or(false),
                    block: account.block.unwrap_or(false),
                });
            }
        }

        Ok(())
    }
}

impl Default for Users {
    fn default() -> Self {
        Users {
            change_login_name: false,
            multilanguage: false,
            languages: vec![String::from("en-GB")],
            otep_count: otep::DEFAULT_COUNT,
            accounts: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Forms {
    /// replaces the built-in profile form
    pub profile: Option<PathBuf>,
}

impl Forms {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, forms: shape::Forms) -> error::Result<()> {
        if let Some(profile) = forms.profile {
            self.profile = Some(check_file(profile, src, dot.push(&"profile"))?);
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TwoFactor {
    pub totp: Totp,
}

#[derive(Debug)]
pub struct Totp {
    pub enabled: bool,
    pub issuer: String,
    pub algo: Algo,
    pub digits: u32,
    pub step: u64,
    pub window: u64,
}

impl Totp {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, totp: shape::Totp) -> error::Result<()> {
        if let Some(enabled) = totp.enabled {
            self.enabled = enabled;
        }

        if let Some(issuer) = totp.issuer {
            if issuer.trim().is_empty() || issuer.contains(':') {
                return Err(invalid(&dot.push(&"issuer"), src, "cannot be empty or contain \":\""));
            }

            self.issuer = issuer;
        }

        if let Some(algo) = totp.algo {
            self.algo = algo;
        }

        if let Some(digits) = totp.digits {
            if !totp_lib::digits_valid(&digits) {
                return Err(invalid(&dot.push(&"digits"), src, "must be between 6 and 8"));
            }

            self.digits = digits;
        }

        if let Some(step) = totp.step {
            if !totp_lib::step_valid(&step) {
                return Err(invalid(&dot.push(&"step"), src, "must be between 1 and 120"));
            }

            self.step = step;
        }

        if let Some(window) = totp.window {
            if window > 10 {
                return Err(invalid(&dot.push(&"window"), src, "cannot be greater than 10"));
            }

            self.window = window;
        }

        Ok(())
    }
}

impl Default for Totp {
    fn default() -> Self {
        Totp {
            enabled: true,
            issuer: String::from("Administrator"),
            algo: Algo::default(),
            digits: totp_lib::DEFAULT_DIGITS,
            step: totp_lib::DEFAULT_STEP,
            window: 1,
        }
    }
}

fn check_file(given: PathBuf, src: &SrcFile<'_>, dot: DotPath<'_>) -> error::Result<PathBuf> {
    let full = if given.is_absolute() {
        given
    } else {
        src.parent.join(given)
    };

    tracing::debug!("{dot} {src} checking {}", full.display());

    let meta = match full.metadata() {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(error::Error::new().context(format!(
                "{dot} {src} was not found"
            )));
        },
        Err(err) => {
            return Err(error::Error::new()
                .context(format!("{dot} failed to retrieve metadata for: {src}"))
                .source(err));
        }
    };

    if !meta.is_file() {
        return Err(error::Error::new().context(format!(
            "{dot} is not a file in: {src}"
        )));
    }

    Ok(full)
}
