//! Load, edit and save one schematic file.

use std::fs;
use std::path::{Path, PathBuf};

use kiwire_eda::LibraryTable;
use kiwire_schematic::{Schematic, SchematicError};

use crate::config::EditorConfig;
use crate::error::Result;
use crate::resolver::Resolver;

/// An open schematic: its path, its settings, and the resolver that owns
/// the in-memory document.
#[derive(Debug)]
pub struct EditSession {
    path: PathBuf,
    config: EditorConfig,
    resolver: Resolver,
    next_backup: u32,
}

impl EditSession {
    pub fn open(path: impl AsRef<Path>, config: EditorConfig) -> Result<Self> {
        let libraries = LibraryTable::with_default_dirs(config.library_dirs.iter().cloned());
        Self::open_with_libraries(path, config, libraries)
    }

    pub fn open_with_libraries(
        path: impl AsRef<Path>,
        config: EditorConfig,
        libraries: LibraryTable,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let schematic = Schematic::from_file(&path)?;
        let resolver = Resolver::with_libraries(schematic, &config, libraries);
        Ok(EditSession {
            path,
            config,
            resolver,
            next_backup: 1,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    pub fn schematic(&self) -> &Schematic {
        self.resolver.schematic()
    }

    /// Copy the file as it is on disk to the next free
    /// `<stem>.bak<N>.<ext>`. Returns `None` when there is nothing to copy.
    pub fn backup(&mut self) -> Result<Option<PathBuf>> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let mut target = backup_path(&self.path, self.next_backup);
        while target.exists() {
            self.next_backup += 1;
            target = backup_path(&self.path, self.next_backup);
        }

        fs::copy(&self.path, &target).map_err(|source| SchematicError::Io {
            path: target.clone(),
            source,
        })?;
        self.next_backup += 1;
        log::info!("Backed up {} to {}", self.path.display(), target.display());
        Ok(Some(target))
    }

    /// Write the document back, after a backup when backups are enabled.
    /// Returns the backup path, if one was made.
    pub fn save(&mut self) -> Result<Option<PathBuf>> {
        let backup = if self.config.backup {
            self.backup()?
        } else {
            None
        };
        self.resolver.schematic().write_to(&self.path)?;
        Ok(backup)
    }

    /// Drop in-memory edits and read the file again.
    pub fn reload(&mut self) -> Result<()> {
        let schematic = Schematic::from_file(&self.path)?;
        let libraries = self.resolver.libraries().clone();
        self.resolver = Resolver::with_libraries(schematic, &self.config, libraries);
        log::debug!("Reloaded {}", self.path.display());
        Ok(())
    }
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.bak{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}.bak{n}"),
    };
    path.with_file_name(name)
}
