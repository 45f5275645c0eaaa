//! Environment-driven configuration.
//!
//! Deserialization follows the approach of the [`envy`] crate: the variables are fed to serde as a
//! map, so `rename_all` and `#[serde(default)]` on the settings struct work as usual.
//!
//! [`envy`]: https://github.com/softprops/envy

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::Deserialize;
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::constants::{
    DEFAULT_API_SERVICE_NAME, DEFAULT_ASSETS_DIR, DEFAULT_DEBUG_TRACE_LIMIT,
    DEFAULT_FILE_LOOKUP_DELAY_MS, DEFAULT_REPO_BRANCH, DEFAULT_REPO_NAME, DEFAULT_REPO_OWNER,
    DEFAULT_SERVER_PORT, GITHUB_API_URL, MAX_COMMITS_PER_PAGE,
};
use crate::scoring::roster::Attribution;

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);

/// Loads (once) and returns the process-wide settings.
pub async fn env() -> EnvResult<&'static Env> {
    ENV_VARS.get_or_try_init(|| async { Env::new() }).await
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Env {
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
    #[serde(default = "default_repo_branch")]
    pub repo_branch: String,

    /// Optional personal access token; unauthenticated requests get a much smaller rate-limit
    /// bucket.
    pub github_token: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    #[serde(default)]
    pub attribution: Attribution,
    #[serde(default = "default_commits_per_page")]
    pub commits_per_page: u8,
    #[serde(default = "default_file_lookup_delay_ms")]
    pub file_lookup_delay_ms: u64,
    #[serde(default = "default_debug_trace_limit")]
    pub debug_trace_limit: u32,

    /// Extra `alias=canonical` pairs merged over the built-in alias table
    #[serde(default)]
    pub participant_aliases: Vec<String>,

    #[serde(default = "default_server_port")]
    pub server_api_port: u16,
    pub leaderboard_url: Option<String>,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    pub otel_exporter_otlp_endpoint: Option<String>,
    #[serde(default = "default_api_service_name")]
    pub api_service_name: String,
}

impl Env {
    pub fn new() -> EnvResult<Self> {
        from_env::<Env>()?.validate()
    }

    /// Builds settings from an explicit set of key/value pairs rather than the process
    /// environment.
    pub fn from_pairs<Iter>(pairs: Iter) -> EnvResult<Self>
    where
        Iter: IntoIterator<Item = (String, String)>,
    {
        from_iter::<_, Env>(pairs)?.validate()
    }

    fn validate(self) -> EnvResult<Self> {
        if self.commits_per_page == 0 || self.commits_per_page > MAX_COMMITS_PER_PAGE {
            return Err(EnvErr::InvalidValue {
                var: "COMMITS_PER_PAGE",
                reason: format!("must be within 1..={MAX_COMMITS_PER_PAGE}"),
            });
        }

        if self.repo_owner.is_empty() || self.repo_name.is_empty() {
            return Err(EnvErr::InvalidValue {
                var: "REPO_OWNER/REPO_NAME",
                reason: String::from("must not be empty"),
            });
        }

        Ok(self)
    }

    /// The configured token, treating an empty value as absent
    pub fn token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Where the board page fetches its JSON from
    pub fn leaderboard_url(&self) -> String {
        match &self.leaderboard_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("http://127.0.0.1:{}/api/leaderboard", self.server_api_port),
        }
    }
}

fn default_repo_owner() -> String {
    DEFAULT_REPO_OWNER.to_string()
}

fn default_repo_name() -> String {
    DEFAULT_REPO_NAME.to_string()
}

fn default_repo_branch() -> String {
    DEFAULT_REPO_BRANCH.to_string()
}

fn default_github_api_url() -> String {
    GITHUB_API_URL.to_string()
}

fn default_commits_per_page() -> u8 {
    MAX_COMMITS_PER_PAGE
}

fn default_file_lookup_delay_ms() -> u64 {
    DEFAULT_FILE_LOOKUP_DELAY_MS
}

fn default_debug_trace_limit() -> u32 {
    DEFAULT_DEBUG_TRACE_LIMIT
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_assets_dir() -> String {
    DEFAULT_ASSETS_DIR.to_string()
}

fn default_api_service_name() -> String {
    DEFAULT_API_SERVICE_NAME.to_string()
}

// ---
//  Deserializer implementation
// ---

/// A single variable, deserialized into whatever shape its `Env` field asks for. Values are
/// trimmed, and a blank value reads as `None` for optional fields.
struct Setting {
    key: String,
    raw: String,
}

impl Setting {
    fn value(&self) -> &str {
        self.raw.trim()
    }

    fn parse<T>(&self) -> Result<T, EnvDeserializeError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.value().parse::<T>().map_err(|e| {
            EnvDeserializeError::Custom(format!("{}: {e} (got '{}')", self.key, self.raw))
        })
    }
}

impl<'de> IntoDeserializer<'de, EnvDeserializeError> for Setting {
    type Deserializer = Self;
    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

macro_rules! parse_as {
    ($($method:ident => $visit:ident,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                visitor.$visit(self.parse()?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Setting {
    type Error = EnvDeserializeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_string(self.value().to_owned())
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        if self.value().is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    /// Comma-separated lists; blank items are dropped
    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let items: Vec<String> = self
            .value()
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect();

        visitor.visit_seq(SeqDeserializer::<_, EnvDeserializeError>::new(items.into_iter()))
    }

    /// Unit variants only, matched case-insensitively
    fn deserialize_enum<V>(
        self,
        _: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_enum(self.value().to_lowercase().into_deserializer())
    }

    fn deserialize_newtype_struct<V>(
        self,
        _: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    parse_as! {
        deserialize_bool => visit_bool,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
    }

    serde::forward_to_deserialize_any! {
        i8 i16 i32 i64 f32 f64 char str string bytes byte_buf unit
        unit_struct map struct tuple tuple_struct identifier ignored_any
    }
}

pub fn from_env<T>() -> Result<T, EnvDeserializeError>
where
    T: DeserializeOwned,
{
    from_iter(dotenvy::vars())
}

pub fn from_iter<Iter, T>(iter: Iter) -> Result<T, EnvDeserializeError>
where
    T: DeserializeOwned,
    Iter: IntoIterator<Item = (String, String)>,
{
    let settings = iter
        .into_iter()
        .map(|(key, raw)| (key.clone(), Setting { key, raw }));

    T::deserialize(MapDeserializer::new(settings))
}

impl de::Error for EnvDeserializeError {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        EnvDeserializeError::Custom(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        EnvDeserializeError::MissingValue(field.into())
    }
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error(transparent)]
    DeserializationError(#[from] EnvDeserializeError),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum EnvDeserializeError {
    #[error("env deserialization error: {0}")]
    Custom(String),

    #[error("{0}")]
    MissingValue(String),
}
