//! Layered runtime configuration (`SPEC_FULL.md` §3 `EngineConfig`, §10.3).
//!
//! [`EngineConfig`] mirrors the recognised keys of `did_change_configuration` (§6) plus
//! process bootstrap flags. It is held behind a [`ConfigHandle`], the same
//! owned-snapshot-with-atomic-swap shape §9 prescribes for the classpath and framework
//! metadata singletons: readers clone the current `Arc<EngineConfig>` without ever
//! blocking a concurrent `did_change_configuration` update.

use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

/// Which parser implementation the facade should drive, per the `parserEngine` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserEngine {
    /// The default embedded Groovy parser.
    #[default]
    Embedded,
    /// An external parser process, for workspaces that need a specific toolchain build.
    External,
}

impl ParserEngine {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "embedded" => Some(Self::Embedded),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

/// The resolved, validated form of the client's configuration (`SPEC_FULL.md` §6).
///
/// Unknown keys in an incoming `did_change_configuration` payload are ignored rather
/// than rejected, matching the spec's explicit "unknown keys are ignored" contract.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Whether the CodeNarc-equivalent lint provider is enabled.
    pub code_narc_enabled: bool,
    /// The Groovy language version to target, if the client specified one.
    pub groovy_language_version: Option<String>,
    /// Path to a `JAVA_HOME` the classpath resolver should use.
    pub java_home: Option<PathBuf>,
    /// Which Gradle build strategy the classpath resolver should use.
    pub gradle_build_strategy: String,
    /// Path to a Jenkins plugins manifest, for framework metadata contributors.
    pub jenkins_plugins_file: Option<PathBuf>,
    /// The `tracing` level filter to install (`SPEC_FULL.md` §10.1).
    pub log_level: String,
    /// Which parser implementation to drive.
    pub parser_engine: ParserEngine,
    /// Whether the diagnostics pipeline should skip providers when compiler errors
    /// already exist (§4.9's "policy flag"; resolved default `false` per DESIGN.md).
    pub skip_providers_on_compiler_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            code_narc_enabled: true,
            groovy_language_version: None,
            java_home: None,
            gradle_build_strategy: "auto".to_string(),
            jenkins_plugins_file: None,
            log_level: "info".to_string(),
            parser_engine: ParserEngine::default(),
            skip_providers_on_compiler_error: false,
        }
    }
}

impl EngineConfig {
    /// Folds a partial `did_change_configuration` payload over this configuration,
    /// recognising the keys named in `SPEC_FULL.md` §6 and ignoring everything else.
    pub fn merge(&mut self, settings: &serde_json::Value) {
        if let Some(v) = settings.get("codeNarcEnabled").and_then(|v| v.as_bool()) {
            self.code_narc_enabled = v;
        }
        if let Some(v) = settings.get("groovyLanguageVersion").and_then(|v| v.as_str()) {
            self.groovy_language_version = if v.is_empty() { None } else { Some(v.to_string()) };
        }
        if let Some(v) = settings.get("javaHome").and_then(|v| v.as_str()) {
            self.java_home = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = settings.get("gradleBuildStrategy").and_then(|v| v.as_str()) {
            self.gradle_build_strategy = v.to_string();
        }
        if let Some(v) = settings.get("jenkinsPluginsFile").and_then(|v| v.as_str()) {
            self.jenkins_plugins_file = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = settings.get("logLevel").and_then(|v| v.as_str()) {
            self.log_level = v.to_string();
        }
        if let Some(v) = settings.get("parserEngine").and_then(|v| v.as_str()) {
            if let Some(engine) = ParserEngine::parse(v) {
                self.parser_engine = engine;
            } else {
                tracing::warn!(value = v, "ignoring unrecognised parserEngine value");
            }
        }
        if let Some(v) = settings.get("skipProvidersOnCompilerError").and_then(|v| v.as_bool()) {
            self.skip_providers_on_compiler_error = v;
        }
    }
}

/// A shared, atomically-swapped configuration snapshot.
///
/// Readers call [`ConfigHandle::snapshot`] to get a cheap `Arc` clone of the current
/// configuration without blocking a concurrent writer; `did_change_configuration`
/// handling calls [`ConfigHandle::update`] to fold in new settings and publish a fresh
/// snapshot.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<EngineConfig>>>,
}

impl ConfigHandle {
    /// Creates a handle seeded with the default configuration.
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(EngineConfig::default()))) }
    }

    /// Returns the current configuration snapshot.
    pub fn snapshot(&self) -> Arc<EngineConfig> {
        self.inner.read().clone()
    }

    /// Folds `settings` over the current configuration and publishes the result.
    pub fn update(&self, settings: &serde_json::Value) -> Arc<EngineConfig> {
        let mut guard = self.inner.write();
        let mut next = (**guard).clone();
        next.merge(settings);
        let next = Arc::new(next);
        *guard = next.clone();
        tracing::info!(?next, "configuration updated");
        next
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new()
    }
}
