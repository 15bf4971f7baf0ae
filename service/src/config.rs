use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

/// Default HubSpot CRM contacts API base URL used when `HUBSPOT_BASE_URL` is not set.
pub const DEFAULT_HUBSPOT_BASE_URL: &str = "https://api.hubapi.com/crm/v3/objects/contacts";

/// Header Intercom uses to deliver the `sha1=<hex>` body signature.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-hub-signature";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Reasons a parsed `Config` is not fit to start the server with.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    EmptyIntercomClientSecret,
    EmptyHubspotAccessToken,
    SignatureVerificationDisabledInProduction,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::EmptyIntercomClientSecret => {
                write!(f, "INTERCOM_CLIENT_SECRET must not be empty")
            }
            ConfigError::EmptyHubspotAccessToken => {
                write!(f, "HUBSPOT_ACCESS_TOKEN must not be empty")
            }
            ConfigError::SignatureVerificationDisabledInProduction => write!(
                f,
                "SKIP_SIGNATURE_VERIFICATION cannot be enabled in the production environment"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The Intercom app client secret used to sign webhook deliveries.
    #[arg(long, env, hide_env_values = true)]
    intercom_client_secret: String,

    /// The HubSpot private app access token used as the bearer token on CRM calls.
    #[arg(long, env, hide_env_values = true)]
    hubspot_access_token: String,

    /// The base URL of the HubSpot CRM contacts API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_HUBSPOT_BASE_URL)]
    hubspot_base_url: String,

    /// Timeout in seconds for each outbound HubSpot request
    #[arg(long, env, default_value_t = 30)]
    pub crm_timeout_secs: u64,

    /// Name of the request header carrying the webhook body signature
    #[arg(long, env, default_value = DEFAULT_SIGNATURE_HEADER)]
    signature_header: String,

    /// Accept webhooks without checking their signature. Development only: refused
    /// in production and logged loudly everywhere else.
    #[arg(long, env, default_value_t = false)]
    pub skip_signature_verification: bool,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Parse from an explicit argument list instead of the process arguments. The first
    /// item is the binary name. Environment variables still fill unset flags.
    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Config::try_parse_from(args)
    }

    /// Checks invariants clap cannot express on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intercom_client_secret.trim().is_empty() {
            return Err(ConfigError::EmptyIntercomClientSecret);
        }
        if self.hubspot_access_token.trim().is_empty() {
            return Err(ConfigError::EmptyHubspotAccessToken);
        }
        if self.skip_signature_verification && self.is_production() {
            return Err(ConfigError::SignatureVerificationDisabledInProduction);
        }
        Ok(())
    }

    pub fn intercom_client_secret(&self) -> &str {
        &self.intercom_client_secret
    }

    pub fn hubspot_access_token(&self) -> &str {
        &self.hubspot_access_token
    }

    /// Returns the HubSpot contacts API base URL without a trailing slash.
    pub fn hubspot_base_url(&self) -> &str {
        self.hubspot_base_url.trim_end_matches('/')
    }

    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
