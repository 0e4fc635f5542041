//! Identity tools backed by the loaded configuration.
//!
//! These are the tools the server exposes over MCP. They only read the
//! configuration and the local filesystem; nothing here spawns `git`, `ssh`
//! or `gpg`.

mod repo;

pub use repo::{inspect, RepoInfo};

use std::fmt::Write as _;
use std::path::PathBuf;

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{expand_home, Config, Identity, Provider};
use crate::error::AppErrorCode;
use crate::mcp::tools::{ToolDescriptor, ToolOutcome, ToolRegistry};

/// Failures reported by the identity tools.
#[derive(Debug, Error)]
pub enum JugglerError {
    /// The requested tool does not exist.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// No identity with this name is configured.
    #[error("'{0}' is not a configured identity")]
    IdentityNotFound(String),

    /// The identity's SSH key file does not exist.
    #[error("identity file not found: {}", .path.display())]
    SshKeyMissing {
        /// Expanded key path.
        path: PathBuf,
    },

    /// The identity's GPG key id is malformed.
    #[error("'{key_id}' is not a valid GPG key id")]
    InvalidGpgKey {
        /// The configured key id.
        key_id: String,
    },

    /// The path is not inside a git repository.
    #[error("not a git repository: {}", .path.display())]
    NotARepository {
        /// The path that was inspected.
        path: PathBuf,
    },

    /// The repository has no remote to detect an identity from.
    #[error("repository has no remote: {}", .path.display())]
    NoRemote {
        /// Repository root.
        path: PathBuf,
    },

    /// Reading repository state failed.
    #[error("{0}")]
    Git(String),

    /// No configured identity matches the remote host.
    #[error("no identity configured for host '{0}'")]
    NoIdentityForHost(String),

    /// Tool arguments were missing or malformed.
    #[error("{0}")]
    InvalidArguments(String),

    /// A provider filter named no known provider.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// A config section name was not recognised.
    #[error("unknown section '{0}' (expected all, identities or settings)")]
    UnknownSection(String),

    /// Configuration could not be rendered.
    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_json::Error),

    /// One or more validation checks failed.
    #[error("{source}")]
    Validation {
        /// The full check report.
        report: String,
        /// The first failing check.
        source: Box<JugglerError>,
    },
}

impl JugglerError {
    /// Returns the application code for this failure, if it has one.
    #[must_use]
    pub fn code(&self) -> Option<AppErrorCode> {
        match self {
            Self::UnknownTool(_) => None,
            Self::IdentityNotFound(_) | Self::NoIdentityForHost(_) => {
                Some(AppErrorCode::IdentityNotFound)
            }
            Self::NotARepository { .. } | Self::NoRemote { .. } | Self::Git(_) => {
                Some(AppErrorCode::GitOperationFailed)
            }
            Self::SshKeyMissing { .. } => Some(AppErrorCode::SshValidationFailed),
            Self::InvalidGpgKey { .. } => Some(AppErrorCode::GpgError),
            Self::InvalidArguments(_)
            | Self::UnknownProvider(_)
            | Self::UnknownSection(_)
            | Self::Render(_) => Some(AppErrorCode::ConfigError),
            Self::Validation { source, .. } => source.code(),
        }
    }

    /// Renders the failure as tool output text.
    #[must_use]
    pub fn render(&self) -> String {
        let line = self.code().map_or_else(
            || self.to_string(),
            |code| format!("Error {}: {code}: {self}", code.code()),
        );
        match self {
            Self::Validation { report, .. } => format!("{report}\n{line}"),
            _ => line,
        }
    }
}

/// The identity tool set.
pub struct IdentityTools {
    config: Config,
}

impl IdentityTools {
    /// Creates the tool set over a loaded configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    fn call(&self, name: &str, args_json: &str) -> Result<String, JugglerError> {
        let args = parse_arguments(args_json)?;
        match name {
            "juggler_list_identities" => self.list_identities(&args),
            "juggler_config_show" => self.config_show(&args),
            "juggler_validate" => self.validate(&args),
            "juggler_detect_identity" => self.detect_identity(&args),
            "juggler_status" => self.status(&args),
            _ => Err(JugglerError::UnknownTool(name.to_string())),
        }
    }

    /// Returns the first identity whose SSH alias, then real hostname,
    /// equals `host`.
    fn identity_for_host(&self, host: &str) -> Option<(&String, &Identity)> {
        let identities = &self.config.identities;
        identities
            .iter()
            .find(|(_, identity)| identity.host == host)
            .or_else(|| {
                identities
                    .iter()
                    .find(|(_, identity)| identity.hostname.as_deref() == Some(host))
            })
    }

    fn detect(&self, info: &RepoInfo) -> Result<(&String, &Identity), JugglerError> {
        let host = info.host.as_deref().ok_or_else(|| JugglerError::NoRemote {
            path: info.root.clone(),
        })?;
        self.identity_for_host(host)
            .ok_or_else(|| JugglerError::NoIdentityForHost(host.to_string()))
    }

    fn detect_identity(&self, args: &Map<String, Value>) -> Result<String, JugglerError> {
        let path = repo_path(args)?;
        let info = inspect(&path)?;
        let (name, identity) = self.detect(&info)?;

        let mut out = format!("Detected identity: {name}\n");
        let _ = writeln!(out, "  Repository: {}", info.root.display());
        if let (Some(remote), Some(url)) = (&info.remote_name, &info.remote_url) {
            let _ = writeln!(out, "  Remote:     {remote} {url}");
        }
        let _ = writeln!(out, "  Provider:   {}", identity.provider);
        let _ = writeln!(out, "  User:       {}", identity.user);
        let _ = write!(out, "  Email:      {}", identity.email);
        Ok(out)
    }

    fn status(&self, args: &Map<String, Value>) -> Result<String, JugglerError> {
        let path = repo_path(args)?;
        let verbose = optional_bool(args, "verbose")?.unwrap_or(false);

        let info = match inspect(&path) {
            Ok(info) => info,
            Err(JugglerError::NotARepository { path }) => {
                return Ok(format!(
                    "Not in a git repository: {}\nIdentities configured: {}",
                    path.display(),
                    self.config.identities.len()
                ));
            }
            Err(e) => return Err(e),
        };

        let mut out = format!("Repository: {}\n", info.root.display());
        match (&info.remote_name, &info.remote_url) {
            (Some(remote), Some(url)) => {
                let _ = writeln!(out, "Remote:     {remote} {url}");
            }
            _ => {
                let _ = writeln!(out, "Remote:     none");
            }
        }

        let detected = self.detect(&info).ok();
        match detected {
            Some((name, identity)) => {
                let _ = writeln!(
                    out,
                    "Identity:   {name} ({} <{}>)",
                    identity.user, identity.email
                );
            }
            None => {
                let _ = writeln!(out, "Identity:   no identity matches this remote");
            }
        }

        let git_user = match (&info.user_name, &info.user_email) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name.clone(),
            (None, Some(email)) => format!("<{email}>"),
            (None, None) => "not set".to_string(),
        };
        let _ = writeln!(out, "Git user:   {git_user}");

        if let Some((name, identity)) = detected {
            if info.user_email.as_deref() != Some(identity.email.as_str()) {
                let _ = writeln!(
                    out,
                    "Warning:    user.email does not match identity '{name}'"
                );
            }

            if verbose {
                let _ = writeln!(out, "Provider:   {}", identity.provider);
                match identity.gpg {
                    Some(ref gpg) => {
                        let signing = if gpg.sign_commits { " (signing)" } else { "" };
                        let _ = writeln!(out, "GPG:        {}{signing}", gpg.key_id);
                    }
                    None => {
                        let _ = writeln!(out, "GPG:        not configured");
                    }
                }
            }
        }

        if verbose {
            let settings = &self.config.settings;
            let _ = writeln!(
                out,
                "Settings:   autoDetect={} gpgSign={} useKeychain={}",
                settings.auto_detect, settings.gpg_sign, settings.use_keychain
            );
        }

        Ok(out.trim_end().to_string())
    }

    fn list_identities(&self, args: &Map<String, Value>) -> Result<String, JugglerError> {
        let filter = match optional_str(args, "provider")? {
            Some(name) => Some(
                Provider::parse(name).ok_or_else(|| JugglerError::UnknownProvider(name.to_string()))?,
            ),
            None => None,
        };

        let matching: Vec<(&String, &Identity)> = self
            .config
            .identities
            .iter()
            .filter(|(_, identity)| filter.map_or(true, |p| identity.provider == p))
            .collect();

        if matching.is_empty() {
            return Ok(filter.map_or_else(
                || "No identities configured.".to_string(),
                |p| format!("No identities configured for provider {p}."),
            ));
        }

        let mut out = format!("Identities ({}):\n", matching.len());
        for (name, identity) in matching {
            let _ = writeln!(out, "\n{name}");
            let _ = writeln!(out, "  Provider: {}", identity.provider);
            match identity.hostname {
                Some(ref hostname) => {
                    let _ = writeln!(out, "  Host:     {} ({hostname})", identity.host);
                }
                None => {
                    let _ = writeln!(out, "  Host:     {}", identity.host);
                }
            }
            let _ = writeln!(out, "  User:     {}", identity.user);
            let _ = writeln!(out, "  Email:    {}", identity.email);
            if let Some(ref gpg) = identity.gpg {
                let signing = if gpg.sign_commits { " (signing)" } else { "" };
                let _ = writeln!(out, "  GPG:      {}{signing}", gpg.key_id);
            }
        }

        Ok(out.trim_end().to_string())
    }

    fn config_show(&self, args: &Map<String, Value>) -> Result<String, JugglerError> {
        let section = optional_str(args, "section")?.unwrap_or("all");

        match section {
            "all" if self.config.is_empty() => Ok("No configuration loaded".to_string()),
            "all" => Ok(serde_json::to_string_pretty(&self.config)?),
            "identities" => Ok(serde_json::to_string_pretty(&self.config.identities)?),
            "settings" => Ok(serde_json::to_string_pretty(&self.config.settings)?),
            other => Err(JugglerError::UnknownSection(other.to_string())),
        }
    }

    fn validate(&self, args: &Map<String, Value>) -> Result<String, JugglerError> {
        let name = optional_str(args, "identity")?.ok_or_else(|| {
            JugglerError::InvalidArguments("missing required argument: identity".to_string())
        })?;

        let identity = self
            .config
            .identities
            .get(name)
            .ok_or_else(|| JugglerError::IdentityNotFound(name.to_string()))?;

        let mut report = Report::new(name);
        let mut failure = None;

        match identity.identity_file {
            Some(ref file) => {
                let path = expand_home(file);
                if path.is_file() {
                    report.pass(&format!("SSH key: {}", path.display()));
                } else {
                    let e = JugglerError::SshKeyMissing { path };
                    report.fail(&format!("SSH key: {e}"));
                    failure.get_or_insert(e);
                }
            }
            None => report.skip("SSH key: no identityFile configured"),
        }

        match identity.gpg {
            Some(ref gpg) if is_gpg_key_id(&gpg.key_id) => {
                report.pass(&format!("GPG key id: {}", gpg.key_id));
            }
            Some(ref gpg) => {
                let e = JugglerError::InvalidGpgKey {
                    key_id: gpg.key_id.clone(),
                };
                report.fail(&format!("GPG key id: {e}"));
                failure.get_or_insert(e);
            }
            None => report.skip("GPG: no signing key configured"),
        }

        debug!(identity = name, failed = failure.is_some(), "Validated identity");

        match failure {
            None => Ok(report.finish()),
            Some(source) => Err(JugglerError::Validation {
                report: report.finish(),
                source: Box::new(source),
            }),
        }
    }
}

impl ToolRegistry for IdentityTools {
    fn tool_definitions(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "juggler_list_identities",
                "List the configured git identities with their provider, SSH host alias, \
                 user, email and GPG key. Optionally filter by provider.",
                json!({
                    "type": "object",
                    "properties": {
                        "provider": {
                            "type": "string",
                            "enum": Provider::NAMES,
                            "description": "Only list identities for this provider"
                        }
                    }
                })
                .to_string(),
            ),
            ToolDescriptor::new(
                "juggler_config_show",
                "Show the loaded RemoteJuggler configuration as JSON, \
                 either in full or a single section.",
                json!({
                    "type": "object",
                    "properties": {
                        "section": {
                            "type": "string",
                            "enum": ["all", "identities", "settings"],
                            "description": "Section to show (default: all)"
                        }
                    }
                })
                .to_string(),
            ),
            ToolDescriptor::new(
                "juggler_validate",
                "Check an identity's local setup: that its SSH key file exists and its GPG \
                 key id is well formed. Reports PASS, FAIL or SKIP for each check.",
                json!({
                    "type": "object",
                    "properties": {
                        "identity": {
                            "type": "string",
                            "description": "Name of the identity to validate"
                        }
                    },
                    "required": ["identity"]
                })
                .to_string(),
            ),
            ToolDescriptor::new(
                "juggler_detect_identity",
                "Detect which configured identity a repository uses by matching its \
                 remote host against identity SSH aliases and hostnames.",
                json!({
                    "type": "object",
                    "properties": {
                        "repoPath": {
                            "type": "string",
                            "description": "Path inside the repository (default: current directory)"
                        }
                    }
                })
                .to_string(),
            ),
            ToolDescriptor::new(
                "juggler_status",
                "Show the repository's remote, the identity it maps to and the git \
                 user configured for it.",
                json!({
                    "type": "object",
                    "properties": {
                        "repoPath": {
                            "type": "string",
                            "description": "Path inside the repository (default: current directory)"
                        },
                        "verbose": {
                            "type": "boolean",
                            "description": "Include provider, GPG and settings details"
                        }
                    }
                })
                .to_string(),
            ),
        ]
    }

    fn execute_tool(&self, name: &str, args_json: &str) -> ToolOutcome {
        match self.call(name, args_json) {
            Ok(text) => ToolOutcome::success(text),
            Err(e) => {
                warn!(tool = name, code = ?e.code(), error = %e, "Identity tool failed");
                ToolOutcome::failure(e.render())
            }
        }
    }
}

/// PASS/FAIL/SKIP lines for `juggler_validate`.
struct Report {
    text: String,
    passed: usize,
    failed: usize,
    skipped: usize,
}

impl Report {
    fn new(identity: &str) -> Self {
        Self {
            text: format!("Validating identity '{identity}'\n"),
            passed: 0,
            failed: 0,
            skipped: 0,
        }
    }

    fn pass(&mut self, line: &str) {
        self.passed += 1;
        let _ = writeln!(self.text, "  [PASS] {line}");
    }

    fn fail(&mut self, line: &str) {
        self.failed += 1;
        let _ = writeln!(self.text, "  [FAIL] {line}");
    }

    fn skip(&mut self, line: &str) {
        self.skipped += 1;
        let _ = writeln!(self.text, "  [SKIP] {line}");
    }

    fn finish(mut self) -> String {
        let _ = write!(
            self.text,
            "Result: {} passed, {} failed, {} skipped",
            self.passed, self.failed, self.skipped
        );
        self.text
    }
}

fn parse_arguments(args_json: &str) -> Result<Map<String, Value>, JugglerError> {
    match serde_json::from_str(args_json) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(JugglerError::InvalidArguments(
            "arguments must be a JSON object".to_string(),
        )),
    }
}

fn optional_str<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, JugglerError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(JugglerError::InvalidArguments(format!(
            "argument '{key}' must be a string"
        ))),
    }
}

fn optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, JugglerError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(JugglerError::InvalidArguments(format!(
            "argument '{key}' must be a boolean"
        ))),
    }
}

/// Resolves `repoPath`, defaulting to the working directory.
fn repo_path(args: &Map<String, Value>) -> Result<PathBuf, JugglerError> {
    match optional_str(args, "repoPath")? {
        Some(path) => Ok(expand_home(path)),
        None => std::env::current_dir()
            .map_err(|e| JugglerError::Git(format!("cannot resolve working directory: {e}"))),
    }
}

/// Accepts 8 to 40 hex digits, with an optional `0x` prefix.
fn is_gpg_key_id(key_id: &str) -> bool {
    let hex = key_id
        .strip_prefix("0x")
        .or_else(|| key_id.strip_prefix("0X"))
        .unwrap_or(key_id);
    (8..=40).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit())
}
