use std::{
    fmt::{Display, Formatter},
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

pub const GAME_TOML: &str = "game.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameSection {
    pub name: String,
    pub design_width: u32,
    pub design_height: u32,
    pub layer_count: u32,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            design_width: 1920,
            design_height: 1080,
            layer_count: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmSection {
    /// Script id loaded at startup.
    pub start_script: u32,
    pub start_script_buffer: u32,
    pub start_label: i32,
    pub instruction_set: String,
    pub use_return_ids: bool,
    pub instructions_per_tick: u32,
    pub max_threads: usize,
}

impl Default for VmSection {
    fn default() -> Self {
        Self {
            start_script: 0,
            start_script_buffer: 0,
            start_label: 0,
            instruction_set: "mo6tw".to_string(),
            use_return_ids: false,
            instructions_per_tick: 1000,
            max_threads: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssetsSection {
    /// Relative paths are resolved against the project directory.
    pub root: PathBuf,
    /// 0 decodes assets on the main thread.
    pub loader_threads: usize,
}

impl Default for AssetsSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            loader_threads: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub game: GameSection,
    pub vm: VmSection,
    pub assets: AssetsSection,
}

impl GameConfig {
    pub fn default_for_name(name: impl Into<String>) -> Self {
        Self {
            game: GameSection {
                name: name.into(),
                ..GameSection::default()
            },
            ..Self::default()
        }
    }

    pub fn asset_root(&self, project_root: &Path) -> PathBuf {
        if self.assets.root.is_absolute() {
            self.assets.root.clone()
        } else {
            project_root.join(&self.assets.root)
        }
    }
}

/// A loaded project: where it lives and how it is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub config: GameConfig,
}

impl Project {
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let root = root.into();
        let config = load_game_toml(&root)?;
        Ok(Self { root, config })
    }

    pub fn asset_root(&self) -> PathBuf {
        self.config.asset_root(&self.root)
    }
}

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    ParseToml(toml::de::Error),
    MissingField(&'static str),
    InvalidField(&'static str, String),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::ParseToml(err) => write!(f, "{err}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField(field, reason) => write!(f, "invalid field `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ProjectError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

pub fn load_game_toml(root: &Path) -> Result<GameConfig, ProjectError> {
    let game_toml = fs::read_to_string(root.join(GAME_TOML))?;
    parse_game_toml(&game_toml)
}

pub fn parse_game_toml(contents: &str) -> Result<GameConfig, ProjectError> {
    let config: GameConfig = toml::from_str(contents)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &GameConfig) -> Result<(), ProjectError> {
    if config.game.name.trim().is_empty() {
        return Err(ProjectError::MissingField("game.name"));
    }
    if config.game.design_width == 0 || config.game.design_height == 0 {
        return Err(ProjectError::InvalidField(
            "game.design_resolution",
            "resolution values must be greater than 0".to_string(),
        ));
    }
    if config.vm.instructions_per_tick == 0 {
        return Err(ProjectError::InvalidField(
            "vm.instructions_per_tick",
            "must be greater than 0".to_string(),
        ));
    }
    if !(1..=u16::MAX as usize).contains(&config.vm.max_threads) {
        return Err(ProjectError::InvalidField(
            "vm.max_threads",
            format!("must be between 1 and {}", u16::MAX),
        ));
    }
    Ok(())
}
