use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::backend::ServiceCommandConfig;
use crate::generation::GenerationMode;

pub const DEFAULT_CONFIG_TOML: &str = r#"
[generator]
selected = "standard"

[generator.standard]
program = "dbdesign-service"
args_prefix = ["pipeline", "standard"]
probe_args = ["probe"]

[generator.assisted]
program = "dbdesign-service"
args_prefix = ["pipeline", "assisted"]
probe_args = ["probe"]

[chat]
program = "dbdesign-service"
args_prefix = ["chat"]
probe_args = ["probe"]

[generation]
timeout_secs = 300
default_db_type = "PostgreSQL"

[export]
dir = "exports"
"#;

/// Runtime configuration: subprocess commands per service family plus
/// generation and export settings. Built by merging an optional user
/// `studio.toml` over the embedded defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub default_mode: GenerationMode,
    standard_command: ServiceCommandSettings,
    assisted_command: ServiceCommandSettings,
    chat_command: ServiceCommandSettings,
    pub generation_timeout_secs: u64,
    pub default_db_type: String,
    pub export_dir: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::from_toml_str("").unwrap_or_else(|_| Self::emergency_fallback())
    }
}

impl StudioConfig {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err),
        };
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> io::Result<Self> {
        let base = parse_config(DEFAULT_CONFIG_TOML)?;
        let override_cfg = parse_config(text)?;
        Ok(Self::from_merged_config(base.merged_with(override_cfg)))
    }

    pub fn generator_command(&self, mode: GenerationMode) -> ServiceCommandConfig {
        match mode {
            GenerationMode::Standard => self.standard_command.to_runtime(),
            GenerationMode::Assisted => self.assisted_command.to_runtime(),
        }
    }

    pub fn chat_command(&self) -> ServiceCommandConfig {
        self.chat_command.to_runtime()
    }

    fn from_merged_config(merged: StudioConfigFile) -> Self {
        let default_mode = merged
            .generator
            .selected
            .as_deref()
            .and_then(GenerationMode::parse)
            .unwrap_or(GenerationMode::Standard);
        Self {
            default_mode,
            standard_command: ServiceCommandSettings::from_file(merged.generator.standard),
            assisted_command: ServiceCommandSettings::from_file(merged.generator.assisted),
            chat_command: ServiceCommandSettings::from_file(merged.chat),
            generation_timeout_secs: merged.generation.timeout_secs.unwrap_or(300).max(1),
            default_db_type: merged
                .generation
                .default_db_type
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "PostgreSQL".to_string()),
            export_dir: merged
                .export
                .dir
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "exports".to_string()),
        }
    }

    fn emergency_fallback() -> Self {
        Self {
            default_mode: GenerationMode::Standard,
            standard_command: ServiceCommandSettings::fallback(&["pipeline", "standard"]),
            assisted_command: ServiceCommandSettings::fallback(&["pipeline", "assisted"]),
            chat_command: ServiceCommandSettings::fallback(&["chat"]),
            generation_timeout_secs: 300,
            default_db_type: "PostgreSQL".to_string(),
            export_dir: "exports".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ServiceCommandSettings {
    program: String,
    args_prefix: Vec<String>,
    probe_args: Vec<String>,
}

impl ServiceCommandSettings {
    fn from_file(file: ServiceCommandConfigFile) -> Self {
        let program = file
            .program
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("dbdesign-service")
            .to_string();
        Self {
            program,
            args_prefix: clean_args(file.args_prefix.unwrap_or_default()),
            probe_args: clean_args(file.probe_args.unwrap_or_else(|| vec!["probe".to_string()])),
        }
    }

    fn fallback(args_prefix: &[&str]) -> Self {
        Self {
            program: "dbdesign-service".to_string(),
            args_prefix: args_prefix.iter().map(ToString::to_string).collect(),
            probe_args: vec!["probe".to_string()],
        }
    }

    fn to_runtime(&self) -> ServiceCommandConfig {
        ServiceCommandConfig {
            program: self.program.clone(),
            args_prefix: self.args_prefix.clone(),
            probe_args: self.probe_args.clone(),
        }
    }
}

fn clean_args(args: Vec<String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct StudioConfigFile {
    generator: GeneratorConfigFile,
    chat: ServiceCommandConfigFile,
    generation: GenerationConfigFile,
    export: ExportConfigFile,
}

impl StudioConfigFile {
    fn merged_with(self, override_cfg: Self) -> Self {
        Self {
            generator: self.generator.merged_with(override_cfg.generator),
            chat: self.chat.merged_with(override_cfg.chat),
            generation: self.generation.merged_with(override_cfg.generation),
            export: self.export.merged_with(override_cfg.export),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct GeneratorConfigFile {
    selected: Option<String>,
    standard: ServiceCommandConfigFile,
    assisted: ServiceCommandConfigFile,
}

impl GeneratorConfigFile {
    fn merged_with(self, override_cfg: Self) -> Self {
        Self {
            selected: override_cfg.selected.or(self.selected),
            standard: self.standard.merged_with(override_cfg.standard),
            assisted: self.assisted.merged_with(override_cfg.assisted),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ServiceCommandConfigFile {
    program: Option<String>,
    args_prefix: Option<Vec<String>>,
    probe_args: Option<Vec<String>>,
}

impl ServiceCommandConfigFile {
    fn merged_with(self, override_cfg: Self) -> Self {
        Self {
            program: override_cfg.program.or(self.program),
            args_prefix: override_cfg.args_prefix.or(self.args_prefix),
            probe_args: override_cfg.probe_args.or(self.probe_args),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct GenerationConfigFile {
    timeout_secs: Option<u64>,
    default_db_type: Option<String>,
}

impl GenerationConfigFile {
    fn merged_with(self, override_cfg: Self) -> Self {
        Self {
            timeout_secs: override_cfg.timeout_secs.or(self.timeout_secs),
            default_db_type: override_cfg.default_db_type.or(self.default_db_type),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ExportConfigFile {
    dir: Option<String>,
}

impl ExportConfigFile {
    fn merged_with(self, override_cfg: Self) -> Self {
        Self {
            dir: override_cfg.dir.or(self.dir),
        }
    }
}

fn parse_config(text: &str) -> io::Result<StudioConfigFile> {
    toml::from_str::<StudioConfigFile>(text)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
#[path = "../tests/unit/config_tests.rs"]
mod tests;
