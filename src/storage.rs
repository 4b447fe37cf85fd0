use crate::dates::date_key;
use crate::model::{GoalStore, StoreError};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const GOALS_FILE: &str = "goals.json";
pub const BACKGROUND_FILE: &str = "background";
const PROJECT_DIR: &str = ".epoch";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Configured,
}

/// A data directory holding the persisted keys: the goal store and the
/// optional custom background.
#[derive(Debug, Clone)]
pub struct Storage {
    pub dir: PathBuf,
    pub scope: StoreScope,
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("reading import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid file format: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Configured => "configured",
        }
    }
}

pub fn init_project_store() -> Result<Storage> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).context("failed to create .epoch directory")?;
    let storage = Storage::new(dir, StoreScope::Project);
    if !storage.goals_path().exists() {
        storage.try_save(&GoalStore::default())?;
    }
    Ok(storage)
}

/// An explicit directory wins; otherwise the nearest `.epoch/` above
/// `start`; otherwise the per-user data directory.
pub fn locate_store(start: &Path, configured: Option<&Path>) -> Result<Storage> {
    if let Some(dir) = configured {
        return Ok(Storage::new(dir.to_path_buf(), StoreScope::Configured));
    }
    if let Some(project_dir) = find_project_dir(start) {
        return Ok(Storage::new(project_dir, StoreScope::Project));
    }
    Ok(Storage::new(global_data_dir()?, StoreScope::Global))
}

/// `epoch-goals-YYYY-MM-DD.json`
pub fn export_file_name(today: NaiveDate) -> String {
    format!("epoch-goals-{}.json", date_key(today))
}

pub fn parse_import(data: &str) -> Result<GoalStore, ImportError> {
    Ok(serde_json::from_str(data)?)
}

impl Storage {
    pub fn new(dir: PathBuf, scope: StoreScope) -> Self {
        Storage { dir, scope }
    }

    pub fn goals_path(&self) -> PathBuf {
        self.dir.join(GOALS_FILE)
    }

    /// Reads the whole store. Missing, unreadable or malformed data reads as
    /// an empty store.
    pub fn load(&self) -> GoalStore {
        match self.try_load() {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(path = %self.goals_path().display(), error = %format!("{:#}", err), "error reading goals");
                GoalStore::default()
            }
        }
    }

    /// Writes the whole store. A failed write is logged and dropped.
    pub fn save(&self, store: &GoalStore) {
        if let Err(err) = self.try_save(store) {
            tracing::error!(path = %self.goals_path().display(), error = %format!("{:#}", err), "error saving goals");
        }
    }

    /// Load, mutate, persist. The store is only written back when the
    /// mutation succeeded; a missing target leaves the file untouched.
    pub fn apply<T, F>(&self, mutate: F) -> (GoalStore, Result<T, StoreError>)
    where
        F: FnOnce(&mut GoalStore) -> Result<T, StoreError>,
    {
        let mut store = self.load();
        let outcome = mutate(&mut store);
        match &outcome {
            Ok(_) => self.save(&store),
            Err(err) => tracing::debug!(%err, "store operation skipped"),
        }
        (store, outcome)
    }

    pub fn try_load(&self) -> Result<GoalStore> {
        let path = self.goals_path();
        if !path.exists() {
            return Ok(GoalStore::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        if data.trim().is_empty() {
            return Ok(GoalStore::default());
        }
        let store = serde_json::from_str(&data).context("parsing goals file")?;
        Ok(store)
    }

    pub fn try_save(&self, store: &GoalStore) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {:?}", self.dir))?;
        let serialized = serde_json::to_string_pretty(store).context("serializing goals")?;
        let path = self.goals_path();
        fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }

    /// Writes a pretty-printed copy of the store. A directory destination
    /// gets the dated default file name.
    pub fn export_to(&self, dest: &Path, today: NaiveDate) -> Result<PathBuf> {
        let path = if dest.is_dir() {
            dest.join(export_file_name(today))
        } else {
            dest.to_path_buf()
        };
        let data = serde_json::to_string_pretty(&self.load()).context("serializing goals")?;
        fs::write(&path, data).with_context(|| format!("writing {:?}", path))?;
        tracing::info!(path = %path.display(), "exported goals");
        Ok(path)
    }

    /// Merges a store file into the current store. Malformed input is
    /// rejected before anything is written.
    pub fn import_from(&self, path: &Path) -> Result<usize, ImportError> {
        let data = fs::read_to_string(path)?;
        let incoming = parse_import(&data)?;
        let mut store = self.load();
        let added = store.merge(incoming);
        self.save(&store);
        tracing::info!(path = %path.display(), added, "imported goals");
        Ok(added)
    }

    pub fn background(&self) -> Option<PathBuf> {
        let path = self.dir.join(BACKGROUND_FILE);
        path.is_file().then_some(path)
    }

    pub fn set_background(&self, source: &Path) -> Result<PathBuf> {
        let is_image = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_image {
            bail!("not an image file: {}", source.display());
        }
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {:?}", self.dir))?;
        let dest = self.dir.join(BACKGROUND_FILE);
        fs::copy(source, &dest)
            .with_context(|| format!("copying {:?} to {:?}", source, dest))?;
        Ok(dest)
    }

    pub fn clear_background(&self) -> Result<()> {
        let path = self.dir.join(BACKGROUND_FILE);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {:?}", path))?;
        }
        Ok(())
    }
}

fn find_project_dir(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.join(GOALS_FILE).exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "epoch").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Goal;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const DAY: &str = "2024-06-01";

    fn storage(tmp: &TempDir) -> Storage {
        Storage::new(tmp.path().join("data"), StoreScope::Configured)
    }

    #[test]
    fn missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(storage(&tmp).load().is_empty());
    }

    #[test]
    fn corrupt_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        fs::create_dir_all(&storage.dir).unwrap();
        fs::write(storage.goals_path(), "{not json").unwrap();
        assert!(storage.load().is_empty());
        assert!(storage.try_load().is_err());
    }

    #[test]
    fn apply_persists_successful_mutations_only() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let (store, outcome) =
            storage.apply(|s| s.add_goal(DAY, Goal::new("1".into(), "Buy milk", None)).map(|_| ()));
        assert!(outcome.is_ok());
        assert_eq!(storage.load(), store);

        fs::write(storage.goals_path(), "sentinel").unwrap();
        let (_, outcome) = storage.apply(|s| s.toggle_goal(DAY, "missing"));
        assert!(outcome.is_err());
        assert_eq!(fs::read_to_string(storage.goals_path()).unwrap(), "sentinel");
    }

    #[test]
    fn unwritable_directory_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "").unwrap();
        let storage = Storage::new(blocker.join("nested"), StoreScope::Configured);
        storage.save(&GoalStore::default());
        assert!(storage.try_save(&GoalStore::default()).is_err());
    }

    #[test]
    fn import_skips_existing_ids() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage.apply(|s| s.add_goal(DAY, Goal::new("x".into(), "Mine", None)).map(|_| ()));
        let before = storage.load();

        let file = tmp.path().join("import.json");
        fs::write(
            &file,
            r#"{"2024-06-01": [{"id":"x","title":"A","completed":false,"subtasks":[]}]}"#,
        )
        .unwrap();
        assert_eq!(storage.import_from(&file).unwrap(), 0);
        assert_eq!(storage.load(), before);
    }

    #[test]
    fn malformed_import_leaves_store_untouched() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage.apply(|s| s.add_goal(DAY, Goal::new("x".into(), "Mine", None)).map(|_| ()));
        let before = fs::read_to_string(storage.goals_path()).unwrap();

        let file = tmp.path().join("broken.json");
        fs::write(&file, r#"{"2024-06-01": "nope"}"#).unwrap();
        assert!(matches!(
            storage.import_from(&file),
            Err(ImportError::Malformed(_))
        ));
        assert!(matches!(
            storage.import_from(&tmp.path().join("absent.json")),
            Err(ImportError::Io(_))
        ));
        assert_eq!(fs::read_to_string(storage.goals_path()).unwrap(), before);
    }

    #[test]
    fn export_into_directory_uses_dated_name() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage.apply(|s| s.add_goal(DAY, Goal::new("x".into(), "Mine", None)).map(|_| ()));
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let path = storage.export_to(tmp.path(), today).unwrap();
        assert_eq!(path, tmp.path().join("epoch-goals-2024-06-03.json"));
        let exported = parse_import(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported, storage.load());
    }

    #[test]
    fn background_is_independent_of_goals() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let image = tmp.path().join("sky.PNG");
        fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();
        let text = tmp.path().join("notes.txt");
        fs::write(&text, "hi").unwrap();

        assert!(storage.set_background(&text).is_err());
        assert_eq!(storage.background(), None);
        let stored = storage.set_background(&image).unwrap();
        assert_eq!(storage.background(), Some(stored));
        assert!(!storage.goals_path().exists());

        storage.clear_background().unwrap();
        assert_eq!(storage.background(), None);
        storage.clear_background().unwrap();
    }

    #[test]
    fn locate_walks_up_to_project_dir() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join(PROJECT_DIR);
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join(GOALS_FILE), "{}").unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = locate_store(&nested, None).unwrap();
        assert_eq!(found.scope, StoreScope::Project);
        assert_eq!(found.dir, project);

        let configured = locate_store(&nested, Some(Path::new("/elsewhere"))).unwrap();
        assert_eq!(configured.scope, StoreScope::Configured);
    }
}
