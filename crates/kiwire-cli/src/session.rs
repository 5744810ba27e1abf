use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kiwire_connect::{EditSession, EditorConfig};
use kiwire_schematic::Position;

/// Flags that override `kiwire.toml` for one invocation.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
    /// Coincidence grid in millimetres
    #[arg(long, global = true, value_name = "MM")]
    pub grid: Option<f64>,

    /// Extra directory searched for <Nickname>.kicad_sym (repeatable)
    #[arg(long = "lib-dir", global = true, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub lib_dirs: Vec<PathBuf>,

    /// Draw diagonal wires instead of two-segment paths
    #[arg(long, global = true)]
    pub allow_diagonal: bool,

    /// Do not write a .bak copy before saving
    #[arg(long, global = true)]
    pub no_backup: bool,
}

impl SessionArgs {
    pub fn config(&self, schematic: &Path) -> Result<EditorConfig> {
        let mut config = EditorConfig::discover(schematic)
            .with_context(|| format!("Failed to load settings for {}", schematic.display()))?;

        if let Some(grid) = self.grid {
            config.grid = grid;
        }
        if self.allow_diagonal {
            config.allow_diagonal = true;
        }
        if self.no_backup {
            config.backup = false;
        }
        // Command line directories are searched first
        let mut dirs = self.lib_dirs.clone();
        dirs.append(&mut config.library_dirs);
        config.library_dirs = dirs;

        config.validate()?;
        Ok(config)
    }

    pub fn open(&self, schematic: &Path) -> Result<EditSession> {
        let config = self.config(schematic)?;
        log::debug!("Opening {} with {config:?}", schematic.display());
        EditSession::open(schematic, config)
            .with_context(|| format!("Failed to open {}", schematic.display()))
    }
}

/// Save and report where the backup went.
pub fn save(session: &mut EditSession) -> Result<()> {
    let backup = session
        .save()
        .with_context(|| format!("Failed to save {}", session.path().display()))?;

    let name = session.path().display().to_string();
    match backup {
        Some(backup) => println!(
            "{} {name} (backup: {})",
            "Saved".green().bold(),
            backup.display()
        ),
        None => println!("{} {name}", "Saved".green().bold()),
    }
    Ok(())
}

/// `x,y` in millimetres.
pub fn parse_position(s: &str) -> Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let coordinate = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a number", v.trim()))
    };
    Ok(Position::new(coordinate(x)?, coordinate(y)?))
}
