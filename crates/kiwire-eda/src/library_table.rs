use crate::{Symbol, SymbolLibrary};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directories searched for `<Nickname>.kicad_sym` files, in order, with a
/// cache of the libraries loaded so far.
#[derive(Debug, Default, Clone)]
pub struct LibraryTable {
    search_dirs: Vec<PathBuf>,
    loaded: HashMap<String, SymbolLibrary>,
}

impl LibraryTable {
    pub fn new(search_dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        LibraryTable {
            search_dirs: search_dirs.into_iter().collect(),
            loaded: HashMap::new(),
        }
    }

    /// `extra_dirs` first, then `KICAD_SYMBOL_DIR` and the platform's KiCad
    /// install locations.
    pub fn with_default_dirs(extra_dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut dirs: Vec<PathBuf> = extra_dirs.into_iter().collect();
        dirs.extend(default_symbol_dirs());
        Self::new(dirs)
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// First `<nickname>.kicad_sym` found on the search path.
    pub fn library_path(&self, nickname: &str) -> Option<PathBuf> {
        let file_name = format!("{nickname}.kicad_sym");
        self.search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
    }

    /// Look up `Nickname:Name`, loading the nickname's library on first use.
    pub fn resolve(&mut self, lib_id: &str) -> Result<Symbol> {
        let (nickname, name) = lib_id
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid library id '{lib_id}', expected Nickname:Name"))?;

        let library = self.library(nickname)?;
        library
            .get_symbol(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Symbol '{name}' not found in library '{nickname}'"))
    }

    fn library(&mut self, nickname: &str) -> Result<&SymbolLibrary> {
        if !self.loaded.contains_key(nickname) {
            let path = self.library_path(nickname).ok_or_else(|| {
                anyhow::anyhow!(
                    "Library '{nickname}' not found in {} search director{}",
                    self.search_dirs.len(),
                    if self.search_dirs.len() == 1 { "y" } else { "ies" }
                )
            })?;
            let library = SymbolLibrary::from_file(&path)
                .with_context(|| format!("Failed to load library {}", path.display()))?;
            log::debug!(
                "Loaded {} symbols from {}",
                library.symbols().len(),
                path.display()
            );
            self.loaded.insert(nickname.to_string(), library);
        }
        self.loaded
            .get(nickname)
            .ok_or_else(|| anyhow::anyhow!("Library '{nickname}' failed to load"))
    }
}

/// `KICAD_SYMBOL_DIR` followed by the KiCad symbol directories that exist on
/// this platform.
pub fn default_symbol_dirs() -> Vec<PathBuf> {
    let possible_paths = if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Applications/KiCad/KiCad.app/Contents/SharedSupport/symbols"),
            PathBuf::from("/Library/Application Support/kicad/symbols"),
            home_relative("Library/Application Support/kicad/symbols"),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\Program Files\\KiCad\\share\\kicad\\symbols"),
            PathBuf::from("C:\\Program Files (x86)\\KiCad\\share\\kicad\\symbols"),
            dirs::config_dir()
                .map(|c| c.join("kicad\\symbols"))
                .unwrap_or_default(),
        ]
    } else {
        vec![
            PathBuf::from("/usr/share/kicad/symbols"),
            PathBuf::from("/usr/local/share/kicad/symbols"),
            PathBuf::from("/opt/kicad/share/kicad/symbols"),
            home_relative(".local/share/kicad/symbols"),
        ]
    };

    let mut paths = Vec::new();
    if let Ok(env_path) = std::env::var("KICAD_SYMBOL_DIR") {
        paths.push(PathBuf::from(env_path));
    }
    paths.extend(possible_paths);
    paths.retain(|p| !p.as_os_str().is_empty() && p.is_dir());
    paths
}

fn home_relative(path: impl AsRef<Path>) -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(path))
        .unwrap_or_default()
}
