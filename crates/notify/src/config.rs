use std::str::FromStr;

use reviewmail_core::address::Address;
use reviewmail_core::error::CoreError;

/// Default sender when `NOTIFY_FROM_ADDRESS` is not set.
const DEFAULT_FROM_ADDRESS: &str = "Code Review <noreply@reviewmail.local>";

/// Default instance name, used in `List-Id` and message ids.
const DEFAULT_INSTANCE_NAME: &str = "reviewmail";

/// How the `From` header is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FromStrategy {
    /// Always the server address; the actor is named on the first body line.
    Server,
    /// The actor's name with the server's email, e.g.
    /// `Jane Doe (Code Review) <noreply@...>`.
    #[default]
    Mixer,
}

impl FromStr for FromStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SERVER" => Ok(FromStrategy::Server),
            "MIXER" => Ok(FromStrategy::Mixer),
            other => Err(CoreError::Validation(format!(
                "Invalid from strategy '{other}'. Must be one of: SERVER, MIXER"
            ))),
        }
    }
}

/// Message assembly settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    /// Server sender address.
    pub from_address: Address,
    pub from_strategy: FromStrategy,
    /// Send an HTML alternative part to recipients who accept it.
    pub html: bool,
    pub instance_name: String,
    /// Base URL of the review web UI; change links are omitted without it.
    pub web_url: Option<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            from_address: parse_address(DEFAULT_FROM_ADDRESS)
                .unwrap_or_else(|_| Address::email_only("noreply@reviewmail.local")),
            from_strategy: FromStrategy::default(),
            html: true,
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            web_url: None,
        }
    }
}

fn parse_address(raw: &str) -> Result<Address, CoreError> {
    raw.parse()
}

impl NotifySettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                | Default                                  |
    /// |------------------------|------------------------------------------|
    /// | `NOTIFY_FROM_ADDRESS`  | `Code Review <noreply@reviewmail.local>` |
    /// | `NOTIFY_FROM_STRATEGY` | `MIXER`                                  |
    /// | `NOTIFY_HTML`          | `true`                                   |
    /// | `NOTIFY_INSTANCE_NAME` | `reviewmail`                             |
    /// | `NOTIFY_WEB_URL`       | unset                                    |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        let from_address = match std::env::var("NOTIFY_FROM_ADDRESS") {
            Ok(raw) => parse_address(&raw)?,
            Err(_) => defaults.from_address,
        };

        let from_strategy = match std::env::var("NOTIFY_FROM_STRATEGY") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.from_strategy,
        };

        let html = match std::env::var("NOTIFY_HTML") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                CoreError::Validation(format!("NOTIFY_HTML must be true or false, got '{raw}'"))
            })?,
            Err(_) => defaults.html,
        };

        let instance_name =
            std::env::var("NOTIFY_INSTANCE_NAME").unwrap_or(defaults.instance_name);

        let web_url = std::env::var("NOTIFY_WEB_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            from_address,
            from_strategy,
            html,
            instance_name,
            web_url,
        })
    }

    /// Host part used in `Message-ID` and thread headers.
    pub fn mail_host(&self) -> String {
        self.web_url
            .as_deref()
            .and_then(|url| url.split("://").nth(1))
            .and_then(|rest| rest.split(['/', ':']).next())
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .or_else(|| self.from_address.domain())
            .unwrap_or_else(|| self.instance_name.clone())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
