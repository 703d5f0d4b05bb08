use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sniff: SniffConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Locator declarations; order only matters within one priority
    #[serde(default)]
    pub locators: Vec<LocatorConfig>,
    /// Resolver chain, consulted in this order
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<ResolverKind>,
    /// Routing table; empty means the built-in table
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    /// Per-handler options, keyed by handler name
    #[serde(default)]
    pub handlers: HashMap<String, HandlerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            sniff: SniffConfig::default(),
            execution: ExecutionConfig::default(),
            locators: Vec::new(),
            resolvers: default_resolvers(),
            filters: Vec::new(),
            handlers: HashMap::new(),
        }
    }
}

/// Retrieval settings shared by handlers and resolvers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("intentbox/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize::mib(64)
}

/// Content sniffing settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SniffConfig {
    /// How many leading bytes resolvers read
    #[serde(default = "default_sniff_bytes")]
    pub max_bytes: ByteSize,
    /// Attempts made while the sniffer reports itself unavailable
    #[serde(default = "default_sniff_retries")]
    pub retries: u32,
    #[serde(default = "default_sniff_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_sniff_bytes(),
            retries: default_sniff_retries(),
            backoff_ms: default_sniff_backoff_ms(),
        }
    }
}

fn default_sniff_bytes() -> ByteSize {
    ByteSize::kib(4)
}

fn default_sniff_retries() -> u32 {
    3
}

fn default_sniff_backoff_ms() -> u64 {
    25
}

/// Handler execution settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Upper bound on resolving plus running the handler for one intent
    pub handler_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Rewrites a URI prefix into a retrievable base URL
    Prefix,
    /// Turns absolute filesystem paths into `file://` URLs
    FilePath,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocatorConfig {
    pub name: String,
    pub kind: LocatorKind,
    #[serde(default)]
    pub priority: i32,
    pub prefix: Option<String>,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    Http,
    File,
    Extension,
}

fn default_resolvers() -> Vec<ResolverKind> {
    vec![ResolverKind::Http, ResolverKind::File, ResolverKind::Extension]
}

/// One row of the routing table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub content_types: Vec<String>,
    pub uri_pattern: Option<String>,
    /// Name of the handler this filter selects
    pub handler: String,
}

/// Handler-specific options (arbitrary JSON)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub options: serde_json::Value,
}
