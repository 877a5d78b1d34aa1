use crate::{error::Error, http_client::HttpClient, schema::SchemaSource};
use std::{path::PathBuf, sync::Arc, time::Duration};

pub const DEFAULT_BASE_URI: &str = "https://reqres.in";
pub const DEFAULT_BASE_PATH: &str = "/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Where the exchanges of a scenario are answered from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HarnessMode {
    /// Calls go to the real API.
    Live,
    /// Calls are answered from a markdown recording of earlier exchanges.
    Playback,
}

/// Environment keys read by [`HarnessConfiguration::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    Mode,
    BaseUri,
    BasePath,
    TimeoutMs,
    ApiKey,
    ReportDir,
    PlaybackDir,
}

impl HarnessEnv {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mode => "API_CONTRACT_MODE",
            Self::BaseUri => "API_CONTRACT_BASE_URI",
            Self::BasePath => "API_CONTRACT_BASE_PATH",
            Self::TimeoutMs => "API_CONTRACT_TIMEOUT_MS",
            Self::ApiKey => "API_CONTRACT_API_KEY",
            Self::ReportDir => "API_CONTRACT_REPORT_DIR",
            Self::PlaybackDir => "API_CONTRACT_PLAYBACK_DIR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfiguration {
    mode: HarnessMode,
    base_uri: String,
    base_path: String,
    timeout: Duration,
    api_key: Option<String>,
    report_dir: Option<PathBuf>,
    playback_dir: Option<PathBuf>,
    masked_headers: Vec<String>,
    schema_source: SchemaSource,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl HarnessConfiguration {
    pub fn new(mode: HarnessMode) -> Self {
        Self {
            mode,
            base_uri: DEFAULT_BASE_URI.into(),
            base_path: DEFAULT_BASE_PATH.into(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            report_dir: None,
            playback_dir: None,
            masked_headers: vec!["authorization".into(), "x-api-key".into()],
            schema_source: SchemaSource::Bundled,
            http_client: None,
        }
    }

    /// Reads the configuration from `API_CONTRACT_*` environment variables.
    ///
    /// Unset variables keep their defaults. A variable that is set but empty,
    /// not valid UTF-8, or not parseable is an error.
    pub fn load() -> Result<Self, Error> {
        let mode = match read_env_nonempty(HarnessEnv::Mode)? {
            Some(value) => parse_mode(&value)?,
            None => HarnessMode::Playback,
        };
        let mut configuration = Self::new(mode);

        if let Some(base_uri) = read_env_nonempty(HarnessEnv::BaseUri)? {
            configuration.set_base_uri(base_uri);
        }
        if let Some(base_path) = read_env_nonempty(HarnessEnv::BasePath)? {
            configuration.set_base_path(base_path);
        }
        if let Some(timeout) = read_env_nonempty(HarnessEnv::TimeoutMs)? {
            configuration.set_timeout(parse_timeout_ms(&timeout)?);
        }
        configuration.api_key = read_env_nonempty(HarnessEnv::ApiKey)?;
        configuration.report_dir = read_env_nonempty(HarnessEnv::ReportDir)?.map(PathBuf::from);
        configuration.playback_dir =
            read_env_nonempty(HarnessEnv::PlaybackDir)?.map(PathBuf::from);

        Ok(configuration)
    }

    pub fn mode(&self) -> HarnessMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: HarnessMode) {
        self.mode = mode;
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn set_base_uri<S: Into<String>>(&mut self, base_uri: S) {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn set_base_path<S: Into<String>>(&mut self, base_path: S) {
        let base_path = base_path.into();
        let trimmed = base_path.trim_matches('/');
        self.base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn set_api_key<S: Into<String>>(&mut self, api_key: S) {
        self.api_key = Some(api_key.into());
    }

    pub fn report_dir(&self) -> Option<&PathBuf> {
        self.report_dir.as_ref()
    }

    pub fn set_report_dir<P: Into<PathBuf>>(&mut self, report_dir: P) {
        self.report_dir = Some(report_dir.into());
    }

    pub fn playback_dir(&self) -> Option<&PathBuf> {
        self.playback_dir.as_ref()
    }

    pub fn set_playback_dir<P: Into<PathBuf>>(&mut self, playback_dir: P) {
        self.playback_dir = Some(playback_dir.into());
    }

    pub fn masked_headers(&self) -> &[String] {
        &self.masked_headers
    }

    pub fn mask_headers<S: Into<String>, I: IntoIterator<Item = S>>(&mut self, headers: I) {
        self.masked_headers
            .extend(headers.into_iter().map(|h| h.into().to_lowercase()));
    }

    pub fn schema_source(&self) -> &SchemaSource {
        &self.schema_source
    }

    pub fn set_schema_source(&mut self, schema_source: SchemaSource) {
        self.schema_source = schema_source;
    }

    /// A client set here takes precedence over the one implied by the mode.
    pub fn http_client(&self) -> Option<Arc<dyn HttpClient + Send + Sync>> {
        self.http_client.clone()
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }
}

impl Default for HarnessConfiguration {
    fn default() -> Self {
        Self::new(HarnessMode::Playback)
    }
}

fn read_env_nonempty(key: HarnessEnv) -> Result<Option<String>, Error> {
    let name = key.as_str();
    let value = match std::env::var_os(name) {
        Some(raw) => raw
            .into_string()
            .map_err(|_| Error::Configuration(format!("{} must be valid UTF-8", name)))?,
        None => return Ok(None),
    };

    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{} must not be empty", name)));
    }

    Ok(Some(value.trim().to_string()))
}

fn parse_mode(value: &str) -> Result<HarnessMode, Error> {
    match value.to_ascii_lowercase().as_str() {
        "live" => Ok(HarnessMode::Live),
        "playback" => Ok(HarnessMode::Playback),
        _ => Err(Error::Configuration(format!(
            "{} must be `live` or `playback`, got `{}`",
            HarnessEnv::Mode.as_str(),
            value
        ))),
    }
}

fn parse_timeout_ms(value: &str) -> Result<Duration, Error> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::Configuration(format!(
            "{} must be a positive integer, got `{}`",
            HarnessEnv::TimeoutMs.as_str(),
            value
        ))),
        Ok(ms) => Ok(Duration::from_millis(ms)),
    }
}
