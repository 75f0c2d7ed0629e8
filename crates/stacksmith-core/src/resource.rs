//! Resource declarations.
//!
//! A [`ResourceSpec`] is an immutable description of one cloud resource. The
//! provider-side behavior of each kind is opaque; only the configuration that
//! is handed to the deployer is modeled here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::id::LogicalId;
use crate::value::Value;
use crate::{Error, Result};

/// Resource kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Function,
    Database,
    Rule,
    Secret,
    Vpc,
}

impl ResourceKind {
    /// Deploy-time attributes a resource of this kind exposes.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Function => &["Arn", "FunctionName", "FunctionUrl"],
            ResourceKind::Database => &["Endpoint.Address", "Endpoint.Port", "Arn"],
            ResourceKind::Rule => &["Arn"],
            ResourceKind::Secret => &["Arn", "Name"],
            ResourceKind::Vpc => &["VpcId"],
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Function => write!(f, "function"),
            ResourceKind::Database => write!(f, "database"),
            ResourceKind::Rule => write!(f, "rule"),
            ResourceKind::Secret => write!(f, "secret"),
            ResourceKind::Vpc => write!(f, "vpc"),
        }
    }
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    id: LogicalId,
    props: ResourceProps,
}

/// Kind-specific configuration of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceProps {
    Function(Function),
    Database(DatabaseInstance),
    Rule(Rule),
    Secret(Secret),
    Vpc(Vpc),
}

impl ResourceSpec {
    /// Create a validated resource declaration.
    pub fn new(id: LogicalId, props: impl Into<ResourceProps>) -> Result<Self> {
        let spec = Self {
            id,
            props: props.into(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        match &self.props {
            ResourceProps::Function(_) => ResourceKind::Function,
            ResourceProps::Database(_) => ResourceKind::Database,
            ResourceProps::Rule(_) => ResourceKind::Rule,
            ResourceProps::Secret(_) => ResourceKind::Secret,
            ResourceProps::Vpc(_) => ResourceKind::Vpc,
        }
    }

    pub fn props(&self) -> &ResourceProps {
        &self.props
    }

    /// Whether this resource exposes `attribute` at deploy time.
    ///
    /// `FunctionUrl` only exists for functions that declare a URL.
    pub fn exposes(&self, attribute: &str) -> bool {
        if !self.kind().attributes().contains(&attribute) {
            return false;
        }
        match &self.props {
            ResourceProps::Function(f) if attribute == "FunctionUrl" => f.url.is_some(),
            _ => true,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.props {
            ResourceProps::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_database(&self) -> Option<&DatabaseInstance> {
        match &self.props {
            ResourceProps::Database(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match &self.props {
            ResourceProps::Rule(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_secret(&self) -> Option<&Secret> {
        match &self.props {
            ResourceProps::Secret(s) => Some(s),
            _ => None,
        }
    }

    /// Resources in the same stack this one points at, with the kind each
    /// of them must have.
    pub fn local_references(&self) -> Vec<(&LogicalId, ResourceKind)> {
        match &self.props {
            ResourceProps::Database(db) => vec![
                (&db.vpc, ResourceKind::Vpc),
                (&db.credentials, ResourceKind::Secret),
            ],
            ResourceProps::Rule(rule) => rule
                .targets
                .iter()
                .map(|t| (t, ResourceKind::Function))
                .collect(),
            ResourceProps::Function(_) | ResourceProps::Secret(_) | ResourceProps::Vpc(_) => {
                Vec::new()
            }
        }
    }

    /// Check the option values of this declaration.
    pub fn validate(&self) -> Result<()> {
        let ctx = |e: Error| match e {
            Error::Configuration(msg) => {
                Error::Configuration(format!("{} '{}': {}", self.kind(), self.id, msg))
            }
            other => other,
        };
        match &self.props {
            ResourceProps::Function(f) => f.validate().map_err(ctx),
            ResourceProps::Database(d) => d.validate().map_err(ctx),
            ResourceProps::Rule(r) => r.validate().map_err(ctx),
            ResourceProps::Secret(s) => s.validate().map_err(ctx),
            ResourceProps::Vpc(v) => v.validate().map_err(ctx),
        }
    }

    /// Replace environment bindings of a function with their resolved values.
    pub(crate) fn with_environment(&self, environment: BTreeMap<String, Value>) -> Self {
        match &self.props {
            ResourceProps::Function(f) => Self {
                id: self.id.clone(),
                props: ResourceProps::Function(Function {
                    environment,
                    ..f.clone()
                }),
            },
            _ => self.clone(),
        }
    }
}

/// CPU architecture of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    Arm64,
    #[default]
    X86_64,
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86_64 => write!(f, "x86_64"),
        }
    }
}

impl std::str::FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "arm64" | "arm_64" => Ok(Architecture::Arm64),
            "x86_64" | "x86-64" | "amd64" => Ok(Architecture::X86_64),
            _ => Err(Error::config(format!("unknown architecture '{}'", s))),
        }
    }
}

/// Container image the function runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCode {
    /// Directory holding the Dockerfile.
    pub directory: String,
    /// Entry point override (e.g. `["predict.handler"]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
}

impl ImageCode {
    pub fn from_asset(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            cmd: None,
        }
    }

    pub fn with_cmd(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cmd = Some(cmd.into_iter().map(Into::into).collect());
        self
    }
}

/// A container-image serverless function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub code: ImageCode,
    pub architecture: Architecture,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    #[serde(default)]
    pub environment: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<FunctionUrl>,
}

impl Function {
    pub const DEFAULT_MEMORY_MB: u32 = 128;
    pub const DEFAULT_TIMEOUT_SECS: u32 = 3;

    pub fn new(code: ImageCode) -> Self {
        Self {
            code,
            architecture: Architecture::default(),
            memory_mb: Self::DEFAULT_MEMORY_MB,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            environment: BTreeMap::new(),
            url: None,
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: u32) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_url(mut self, url: FunctionUrl) -> Self {
        self.url = Some(url);
        self
    }

    /// True when the function has an unauthenticated invocation URL.
    pub fn is_public(&self) -> bool {
        self.url
            .as_ref()
            .is_some_and(|u| u.auth_type == FunctionUrlAuthType::None)
    }

    fn validate(&self) -> Result<()> {
        if self.code.directory.trim().is_empty() {
            return Err(Error::config("image directory must not be empty"));
        }
        if self.memory_mb == 0 {
            return Err(Error::config("memory size must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout must be greater than 0"));
        }
        for key in self.environment.keys() {
            if !is_env_name(key) {
                return Err(Error::config(format!(
                    "invalid environment variable name '{}'",
                    key
                )));
            }
        }
        if let Some(url) = &self.url {
            url.validate()?;
        }
        Ok(())
    }
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Authentication required by a function URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionUrlAuthType {
    /// Public, unauthenticated.
    None,
    AwsIam,
}

impl std::str::FromStr for FunctionUrlAuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "NONE" => Ok(FunctionUrlAuthType::None),
            "aws_iam" | "AWS_IAM" | "iam" => Ok(FunctionUrlAuthType::AwsIam),
            _ => Err(Error::config(format!("unknown function url auth type '{}'", s))),
        }
    }
}

/// HTTP method allowed by a CORS policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    #[serde(rename = "*")]
    Any,
}

impl std::str::FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "*" | "ALL" => Ok(HttpMethod::Any),
            _ => Err(Error::config(format!("unknown HTTP method '{}'", s))),
        }
    }
}

/// CORS policy of a function URL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorsPolicy {
    pub allowed_methods: Vec<HttpMethod>,
    pub allowed_headers: Vec<String>,
    pub allowed_origins: Vec<String>,
}

/// HTTP invocation endpoint of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionUrl {
    pub auth_type: FunctionUrlAuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsPolicy>,
}

impl FunctionUrl {
    /// A public, unauthenticated endpoint without CORS.
    pub fn public() -> Self {
        Self {
            auth_type: FunctionUrlAuthType::None,
            cors: None,
        }
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = Some(cors);
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(cors) = &self.cors {
            if cors.allowed_origins.is_empty() {
                return Err(Error::config("CORS policy needs at least one allowed origin"));
            }
            if cors.allowed_methods.is_empty() {
                return Err(Error::config("CORS policy needs at least one allowed method"));
            }
        }
        Ok(())
    }
}

/// When a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Fixed interval, in whole minutes.
    Rate { minutes: u64 },
    /// Six-field provider cron expression.
    Cron { expression: String },
}

impl Schedule {
    /// Fixed-rate schedule. Must be a positive whole number of minutes.
    pub fn rate(period: Duration) -> Result<Self> {
        let secs = period.as_secs();
        if secs == 0 || secs % 60 != 0 || period.subsec_nanos() != 0 {
            return Err(Error::config(format!(
                "schedule rate must be a positive whole number of minutes, got {:?}",
                period
            )));
        }
        Ok(Schedule::Rate { minutes: secs / 60 })
    }

    pub fn days(days: u64) -> Result<Self> {
        let secs = days
            .checked_mul(24 * 60 * 60)
            .ok_or_else(|| Error::config(format!("schedule of {} days is too long", days)))?;
        Self::rate(Duration::from_secs(secs))
    }

    pub fn cron(expression: impl Into<String>) -> Result<Self> {
        let schedule = Schedule::Cron {
            expression: expression.into(),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Interval between firings of a rate schedule.
    ///
    /// `None` for cron schedules and for rates that are zero or overflow.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Schedule::Rate { minutes } if *minutes > 0 => {
                minutes.checked_mul(60).map(Duration::from_secs)
            }
            Schedule::Rate { .. } | Schedule::Cron { .. } => None,
        }
    }

    /// Number of firings a rate schedule produces within `window`.
    pub fn firings_within(&self, window: Duration) -> Option<u64> {
        self.period().map(|p| window.as_secs() / p.as_secs())
    }

    /// Provider schedule expression, e.g. `rate(7 days)`.
    pub fn expression(&self) -> String {
        match self {
            Schedule::Rate { minutes } => {
                let (n, unit) = if minutes % (24 * 60) == 0 {
                    (minutes / (24 * 60), "day")
                } else if minutes % 60 == 0 {
                    (minutes / 60, "hour")
                } else {
                    (*minutes, "minute")
                };
                let plural = if n == 1 { "" } else { "s" };
                format!("rate({} {}{})", n, unit, plural)
            }
            Schedule::Cron { expression } => format!("cron({})", expression),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Schedule::Rate { minutes } if *minutes == 0 => {
                Err(Error::config("schedule rate must be greater than 0"))
            }
            Schedule::Rate { minutes } if minutes.checked_mul(60).is_none() => Err(
                Error::config(format!("schedule rate of {} minutes is too long", minutes)),
            ),
            Schedule::Rate { .. } => Ok(()),
            Schedule::Cron { expression } => {
                let fields = expression.split_whitespace().count();
                if fields != 6 {
                    return Err(Error::config(format!(
                        "cron expression '{}' must have 6 fields, found {}",
                        expression, fields
                    )));
                }
                Ok(())
            }
        }
    }
}

/// A scheduled event rule that invokes functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub schedule: Schedule,
    pub targets: Vec<LogicalId>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Rule {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            targets: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_target(mut self, function: LogicalId) -> Self {
        self.targets.push(function);
        self
    }

    fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        if self.targets.is_empty() {
            return Err(Error::config("rule needs at least one target"));
        }
        Ok(())
    }
}

/// Database engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Mysql,
}

impl EngineKind {
    pub fn supported_versions(&self) -> &'static [&'static str] {
        match self {
            EngineKind::Mysql => &["8.0.28", "8.0.32", "8.0.33", "8.0.35", "8.0.36"],
        }
    }
}

impl std::str::FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mysql" => Ok(EngineKind::Mysql),
            _ => Err(Error::config(format!("unsupported database engine '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEngine {
    pub kind: EngineKind,
    pub version: String,
}

impl DatabaseEngine {
    pub fn mysql(version: impl Into<String>) -> Self {
        Self {
            kind: EngineKind::Mysql,
            version: version.into(),
        }
    }
}

/// Subnet class a resource is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    Public,
    Private,
    Isolated,
}

impl std::str::FromStr for SubnetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(SubnetType::Public),
            "private" | "private_with_egress" => Ok(SubnetType::Private),
            "isolated" | "private_isolated" => Ok(SubnetType::Isolated),
            _ => Err(Error::config(format!("unknown subnet type '{}'", s))),
        }
    }
}

/// What happens to the resource when its stack is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
    Snapshot,
}

impl std::str::FromStr for RemovalPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "destroy" => Ok(RemovalPolicy::Destroy),
            "retain" => Ok(RemovalPolicy::Retain),
            "snapshot" => Ok(RemovalPolicy::Snapshot),
            _ => Err(Error::config(format!("unknown removal policy '{}'", s))),
        }
    }
}

const INSTANCE_SIZES: &[&str] = &[
    "nano", "micro", "small", "medium", "large", "xlarge", "2xlarge", "4xlarge", "8xlarge",
];

/// Instance sizing class, e.g. `t3.micro`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub class: String,
    pub size: String,
}

impl InstanceType {
    pub fn of(class: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            size: size.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        let class_ok = self
            .class
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
            && self.class.chars().all(|c| c.is_ascii_alphanumeric());
        if !class_ok {
            return Err(Error::config(format!("invalid instance class '{}'", self.class)));
        }
        if !INSTANCE_SIZES.contains(&self.size.as_str()) {
            return Err(Error::config(format!("invalid instance size '{}'", self.size)));
        }
        Ok(())
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}

/// A managed relational database instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub engine: DatabaseEngine,
    pub vpc: LogicalId,
    pub subnet_type: SubnetType,
    pub instance_type: InstanceType,
    pub allocated_storage_gb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_allocated_storage_gb: Option<u32>,
    /// Secret holding the generated master credentials.
    pub credentials: LogicalId,
    pub database_name: String,
    pub deletion_protection: bool,
    pub removal_policy: RemovalPolicy,
}

impl DatabaseInstance {
    fn validate(&self) -> Result<()> {
        let supported = self.engine.kind.supported_versions();
        if !supported.contains(&self.engine.version.as_str()) {
            return Err(Error::config(format!(
                "unsupported engine version '{}' (supported: {})",
                self.engine.version,
                supported.join(", ")
            )));
        }
        self.instance_type.validate()?;
        if self.allocated_storage_gb == 0 {
            return Err(Error::config("allocated storage must be greater than 0"));
        }
        if let Some(max) = self.max_allocated_storage_gb {
            if max < self.allocated_storage_gb {
                return Err(Error::config(format!(
                    "max allocated storage ({} GB) is below allocated storage ({} GB)",
                    max, self.allocated_storage_gb
                )));
            }
        }
        let mut chars = self.database_name.chars();
        let name_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            && self.database_name.len() <= 64;
        if !name_ok {
            return Err(Error::config(format!(
                "invalid database name '{}'",
                self.database_name
            )));
        }
        Ok(())
    }
}

/// Generated credentials stored in the secret manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub username: String,
    /// Key under which the generated value is stored.
    pub generate_key: String,
    pub exclude_punctuation: bool,
    pub include_space: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_characters: Option<String>,
}

impl Secret {
    /// Credentials for `username` with a generated `password`.
    pub fn generated_credentials(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            generate_key: "password".to_string(),
            exclude_punctuation: true,
            include_space: false,
            exclude_characters: None,
        }
    }

    /// JSON template the provider fills with the generated value.
    pub fn template(&self) -> serde_json::Value {
        serde_json::json!({ "username": self.username })
    }

    fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::config("secret username must not be empty"));
        }
        if self.generate_key.is_empty() || self.generate_key == "username" {
            return Err(Error::config(format!(
                "invalid generated key '{}'",
                self.generate_key
            )));
        }
        Ok(())
    }
}

/// Network the database is placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    pub max_azs: u32,
}

impl Vpc {
    fn validate(&self) -> Result<()> {
        if self.max_azs == 0 {
            return Err(Error::config("max_azs must be greater than 0"));
        }
        Ok(())
    }
}

impl From<Function> for ResourceProps {
    fn from(v: Function) -> Self {
        ResourceProps::Function(v)
    }
}

impl From<DatabaseInstance> for ResourceProps {
    fn from(v: DatabaseInstance) -> Self {
        ResourceProps::Database(v)
    }
}

impl From<Rule> for ResourceProps {
    fn from(v: Rule) -> Self {
        ResourceProps::Rule(v)
    }
}

impl From<Secret> for ResourceProps {
    fn from(v: Secret) -> Self {
        ResourceProps::Secret(v)
    }
}

impl From<Vpc> for ResourceProps {
    fn from(v: Vpc) -> Self {
        ResourceProps::Vpc(v)
    }
}
