/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
    /// Seed for the cosmetic grass → stone substitution.
    pub decor_seed: u64,
    pub decor_chance: f64,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    /// Pixels an entity travels per tick toward its cell (16 = instant).
    pub walk_px_per_tick: i32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        SpeedConfig {
            tick_rate_ms: default_tick_rate(),
            walk_px_per_tick: default_walk_px(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub fire: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_walk_px")]
    walk_px_per_tick: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_fire")]
    fire: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_decor_seed")]
    decor_seed: u64,
    #[serde(default = "default_decor_chance")]
    decor_chance: f64,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 Hz
fn default_walk_px() -> i32 { 2 }        // 8 ticks per cell
fn default_fire() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into(), "Select".into()] }
fn default_quit() -> Vec<String> { vec!["Start".into()] }
fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "mailrun.log".into() }
fn default_decor_seed() -> u64 { 0x5eed }
fn default_decor_chance() -> f64 { 0.04 }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            walk_px_per_tick: default_walk_px(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            fire: default_fire(),
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
            decor_seed: default_decor_seed(),
            decor_chance: default_decor_chance(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, `~/.local/share/mailrun`, `/usr/share/mailrun`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
                walk_px_per_tick: toml_cfg.speed.walk_px_per_tick.max(1),
            },
            gamepad: GamepadConfig {
                fire: toml_cfg.gamepad.fire,
                restart: toml_cfg.gamepad.restart,
                quit: toml_cfg.gamepad.quit,
            },
            levels_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            decor_seed: toml_cfg.general.decor_seed,
            decor_chance: toml_cfg.general.decor_chance.clamp(0.0, 1.0),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mailrun");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/mailrun");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before logging is set up, so problems go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: TomlConfig = toml::from_str("").unwrap();
        let cfg = GameConfig::resolve(cfg, &[]);
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.speed.walk_px_per_tick, 2);
        assert_eq!(cfg.decor_seed, 0x5eed);
        assert_eq!(cfg.log_file, PathBuf::from("mailrun.log"));
        assert_eq!(cfg.gamepad.fire, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = "[speed]\nwalk_px_per_tick = 16\n\n[general]\ndecor_chance = 3.0\n";
        let cfg: TomlConfig = toml::from_str(text).unwrap();
        let cfg = GameConfig::resolve(cfg, &[]);
        assert_eq!(cfg.speed.walk_px_per_tick, 16);
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.decor_chance, 1.0);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }
}
