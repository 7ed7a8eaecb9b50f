//! Macro storage - one pretty-printed JSON array per file

use crate::list::ActionList;
use anytime_core::{Error, ErrorCode, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct MacroStorage {
    dir: PathBuf,
}

impl MacroStorage {
    /// Storage rooted at `~/.anytime`
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| Error::new(ErrorCode::Io, "HOME not set"))?;
        Self::with_dir(PathBuf::from(home).join(".anytime"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Bare file names live in the storage directory; anything with a
    /// directory component is taken as given
    pub fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        let bare = file
            .parent()
            .map_or(true, |p| p.as_os_str().is_empty());
        if bare && !file.is_absolute() {
            self.dir.join(file)
        } else {
            file.to_path_buf()
        }
    }

    pub fn save(&self, list: &ActionList, file: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.resolve(file);
        let json = list.to_json()?;
        fs::write(&path, json)?;
        info!(path = %path.display(), actions = list.len(), "saved macro");
        Ok(path)
    }

    /// Load a macro; on failure nothing the caller holds is touched
    pub fn load(&self, file: impl AsRef<Path>) -> Result<ActionList> {
        let path = self.resolve(file);
        let json = fs::read_to_string(&path)?;
        let list = ActionList::from_json(&json)?;
        debug!(path = %path.display(), actions = list.len(), "loaded macro");
        Ok(list)
    }

    /// Load, or start empty when the file does not exist yet
    pub fn load_or_default(&self, file: impl AsRef<Path>) -> Result<ActionList> {
        let path = self.resolve(file);
        if path.exists() {
            self.load(path)
        } else {
            Ok(ActionList::new())
        }
    }

    /// Names of the macro files in the storage directory, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)?.collect::<std::io::Result<Vec<_>>>()?;
        let mut names: Vec<String> = entries
            .iter()
            .map(|e| e.path())
            .filter(|p| is_macro_file(p))
            .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Remove a macro file; anything but a `.json` file is refused
    pub fn delete(&self, file: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve(file);
        if !is_macro_file(&path) {
            return Err(Error::new(
                ErrorCode::Io,
                format!("{} is not a macro file", path.display()),
            ));
        }
        fs::remove_file(&path)?;
        info!(path = %path.display(), "deleted macro");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

fn is_macro_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}
