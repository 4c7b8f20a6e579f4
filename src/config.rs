use crate::authorizer::{ActionName, PermissionTable};
use crate::types::PermissionCode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level configuration for the workflow core.
///
/// Every section has defaults so an empty file is a valid configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CoreConfig {
    /// Action → permission-code overrides applied on top of the built-in
    /// table.
    #[serde(default)]
    pub permissions: PermissionsConfig,
    /// Reassignment resolver thresholds.
    #[serde(default)]
    pub reassignment: ReassignmentConfig,
    /// Structured audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub overrides: BTreeMap<ActionName, PermissionCode>,
}

impl PermissionsConfig {
    /// The effective table: built-in entries with configured overrides on
    /// top. Built once at config load and read-only afterwards.
    pub fn build_table(&self) -> PermissionTable {
        if self.overrides.is_empty() {
            return PermissionTable::default();
        }
        let defaults = PermissionTable::default();
        let merged = ActionName::FIXED
            .into_iter()
            .chain([
                ActionName::Advance,
                ActionName::Cancel,
                ActionName::Return,
                ActionName::Close,
            ])
            .filter_map(|action| {
                self.overrides
                    .get(&action)
                    .copied()
                    .or_else(|| defaults.permission_for(action))
                    .map(|code| (action, code))
            });
        PermissionTable::from_entries(merged)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReassignmentConfig {
    /// Fallback validation window when a theme does not configure one.
    #[serde(default = "default_validation_place_days")]
    pub default_validation_place_days: i64,
}

fn default_validation_place_days() -> i64 {
    5
}

impl Default for ReassignmentConfig {
    fn default() -> Self {
        Self {
            default_validation_place_days: default_validation_place_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Stream ID written into every audit entry.
    #[serde(default = "default_stream_id")]
    pub stream_id: String,
}

fn default_stream_id() -> String {
    "casework".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            stream_id: default_stream_id(),
        }
    }
}

impl CoreConfig {
    /// Loads and validates a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&contents)
    }

    /// Parses and validates a YAML configuration string.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(contents).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.reassignment.default_validation_place_days >= 0,
            "default_validation_place_days must not be negative"
        );
        anyhow::ensure!(
            !self.audit.stream_id.is_empty(),
            "audit stream_id must not be empty"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CoreConfig::from_yaml("{}").expect("empty config parses");
        assert_eq!(config.reassignment.default_validation_place_days, 5);
        assert_eq!(config.audit.stream_id, "casework");
        let table = config.permissions.build_table();
        assert_eq!(
            table.permission_for(ActionName::Reassign),
            Some(PermissionCode::RecordReassign)
        );
    }

    #[test]
    fn overrides_replace_single_entries() {
        let yaml = r#"
permissions:
  overrides:
    upload_file: record_file_upload_closed
reassignment:
  default_validation_place_days: 12
"#;
        let config = CoreConfig::from_yaml(yaml).expect("config parses");
        let table = config.permissions.build_table();
        assert_eq!(
            table.permission_for(ActionName::UploadFile),
            Some(PermissionCode::RecordFileUploadClosed)
        );
        // Untouched entries keep their defaults.
        assert_eq!(
            table.permission_for(ActionName::Cancel),
            Some(PermissionCode::RecordCancel)
        );
        assert_eq!(config.reassignment.default_validation_place_days, 12);
    }

    #[test]
    fn negative_window_fails_validation() {
        let yaml = "reassignment:\n  default_validation_place_days: -1\n";
        assert!(CoreConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn empty_stream_id_fails_validation() {
        let yaml = "audit:\n  stream_id: \"\"\n";
        assert!(CoreConfig::from_yaml(yaml).is_err());
    }
}
