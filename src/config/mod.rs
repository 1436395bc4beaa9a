/// Test configuration: per-environment YAML merged with command-line overrides
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Namespace used when neither the command line nor the environment file sets one
pub const DEFAULT_NAMESPACE: &str = "sas-viya";

/// Session-wide test configuration, read-only once loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Namespace the checks query
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// kubectl context to use instead of the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Route kubectl through the bastion host
    #[serde(default)]
    pub use_bastion: bool,

    /// Bastion host used when `use_bastion` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion: Option<BastionConfig>,

    /// Components expected to be deployed
    #[serde(default)]
    pub sas_components: SasComponents,
}

/// SSH jump host for clusters not reachable from the test runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BastionConfig {
    /// Hostname or IP of the bastion
    pub host: String,

    /// Login user (defaults to the local ssh configuration)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// kubectl binary on the bastion
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
}

/// Expected application components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SasComponents {
    /// Name fragments of microservice deployments that must exist
    #[serde(default)]
    pub microservices: Vec<String>,

    /// Backing databases
    #[serde(default)]
    pub databases: Databases,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Databases {
    #[serde(default)]
    pub postgres: DatabaseConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Values supplied on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub context: Option<String>,
    pub use_bastion: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            context: None,
            use_bastion: false,
            bastion: None,
            sas_components: SasComponents::default(),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

impl TestConfig {
    /// Path of the environment file inside a config directory
    pub fn environment_path(config_dir: &Path, environment: &str) -> PathBuf {
        config_dir
            .join("environments")
            .join(format!("{}.yaml", environment))
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: TestConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load the environment file and apply command-line overrides
    pub fn load(config_dir: &Path, environment: &str, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config = Self::from_file(Self::environment_path(config_dir, environment))?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Like [`TestConfig::load`], but a missing environment file means defaults
    pub fn load_or_default(
        config_dir: &Path,
        environment: &str,
        overrides: Overrides,
    ) -> anyhow::Result<Self> {
        let path = Self::environment_path(config_dir, environment);
        if path.exists() {
            return Self::load(config_dir, environment, overrides);
        }

        let mut config = Self::default();
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file values
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(namespace) = overrides.namespace {
            self.namespace = namespace;
        }
        if overrides.context.is_some() {
            self.context = overrides.context;
        }
        self.use_bastion |= overrides.use_bastion;
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.trim().is_empty() {
            anyhow::bail!("namespace cannot be empty");
        }

        if self.use_bastion {
            match &self.bastion {
                Some(bastion) if !bastion.host.trim().is_empty() => {}
                _ => anyhow::bail!("use_bastion is set but no bastion.host is configured"),
            }
        }

        if let Some(fragment) = self
            .sas_components
            .microservices
            .iter()
            .find(|name| name.trim().is_empty())
        {
            anyhow::bail!("empty microservice name in sas_components: {:?}", fragment);
        }

        Ok(())
    }

    /// Generate an example environment file
    pub fn example() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            context: None,
            use_bastion: false,
            bastion: None,
            sas_components: SasComponents {
                microservices: vec![
                    "sas-logon-app".to_string(),
                    "sas-identities".to_string(),
                    "sas-authorization".to_string(),
                    "sas-folders".to_string(),
                    "sas-files".to_string(),
                ],
                databases: Databases {
                    postgres: DatabaseConfig { enabled: true },
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = TestConfig::example();
        assert!(config.validate().is_ok());

        config.namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bastion_requires_host() {
        let mut config = TestConfig::example();
        config.use_bastion = true;
        assert!(config.validate().is_err());

        config.bastion = Some(BastionConfig {
            host: "jump.example.com".to_string(),
            user: None,
            kubectl: default_kubectl(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sparse_file_uses_defaults() {
        let config: TestConfig = serde_yaml::from_str("sas_components: {}\n").unwrap();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert!(config.sas_components.microservices.is_empty());
        assert!(!config.sas_components.databases.postgres.enabled);
        assert!(config.context.is_none());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config: TestConfig =
            serde_yaml::from_str("namespace: from-file\ncontext: file-ctx\n").unwrap();

        config.apply(Overrides {
            namespace: Some("from-cli".to_string()),
            context: None,
            use_bastion: true,
        });

        assert_eq!(config.namespace, "from-cli");
        assert_eq!(config.context.as_deref(), Some("file-ctx"));
        assert!(config.use_bastion);
    }

    #[test]
    fn test_load_environment_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = TestConfig::environment_path(dir.path(), "staging");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            [
                "namespace: viya-staging",
                "sas_components:",
                "  microservices: [sas-logon-app, sas-files]",
                "  databases:",
                "    postgres:",
                "      enabled: true",
            ]
            .join("\n"),
        )
        .unwrap();

        let config = TestConfig::load(dir.path(), "staging", Overrides::default()).unwrap();
        assert_eq!(config.namespace, "viya-staging");
        assert_eq!(config.sas_components.microservices, ["sas-logon-app", "sas-files"]);
        assert!(config.sas_components.databases.postgres.enabled);
    }

    #[test]
    fn test_load_missing_environment() {
        let dir = tempfile::tempdir().unwrap();
        let err = TestConfig::load(dir.path(), "nope", Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TestConfig::load_or_default(
            dir.path(),
            "dev",
            Overrides {
                namespace: None,
                context: Some("lab".to_string()),
                use_bastion: false,
            },
        )
        .unwrap();

        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.context.as_deref(), Some("lab"));
    }

    #[test]
    fn test_example_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&TestConfig::example()).unwrap();
        let parsed: TestConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.sas_components.microservices.len(), 5);
        assert!(parsed.validate().is_ok());
    }
}
