//! Named result bundles persisted per `(year, ensemble member)`.
//!
//! Layout on disk: `{root}/{year}/results_em_{member}.bin`, one bincode file
//! per ensemble member, each wrapped in a versioned envelope.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ResultKey;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

const FILE_PREFIX: &str = "results_em_";
const FILE_EXTENSION: &str = "bin";

/// Versioned envelope for one stored bundle.
///
/// `E` is `&Vec<(String, T)>` when saving and `Vec<(String, T)>` when loading.
#[derive(serde::Serialize, serde::Deserialize)]
struct ResultEnvelope<E> {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Key the bundle was saved under.
    key: ResultKey,
    /// Named results in insertion order.
    entries: E,
}

/// Named results for one `(year, ensemble member)`, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBundle<T> {
    entries: Vec<(String, T)>,
}

impl<T> ResultBundle<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the result stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Return `true` if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over result names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, result)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Return the number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if the bundle holds no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory result bundles backed by a directory tree.
///
/// Results accumulate in memory through [`ResultStore::add_result`] and
/// [`ResultStore::load`]; [`ResultStore::save`] writes every bundle.
pub struct ResultStore<T> {
    root: PathBuf,
    bundles: BTreeMap<ResultKey, ResultBundle<T>>,
}

impl<T> ResultStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a store rooted at `root`. Nothing is read or created yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            bundles: BTreeMap::new(),
        }
    }

    /// Return the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the file a bundle is saved to.
    #[must_use]
    pub fn result_path(&self, year: i32, ensemble_member: u32) -> PathBuf {
        self.root
            .join(year.to_string())
            .join(format!("{FILE_PREFIX}{ensemble_member}.{FILE_EXTENSION}"))
    }

    /// Add a named result under `(year, ensemble_member)`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::DuplicateResultName`] if `name` is already present.
    pub fn add_result(
        &mut self,
        year: i32,
        ensemble_member: u32,
        name: impl Into<String>,
        result: T,
    ) -> Result<(), IoError> {
        let name = name.into();
        let bundle = self
            .bundles
            .entry(ResultKey::new(year, ensemble_member))
            .or_insert_with(ResultBundle::new);
        if bundle.contains(&name) {
            return Err(IoError::DuplicateResultName {
                year,
                ensemble_member,
                name,
            });
        }
        bundle.entries.push((name, result));
        Ok(())
    }

    /// Return the bundle for `(year, ensemble_member)`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ResultNotFound`] if nothing was added or loaded for it.
    pub fn get_result(&self, year: i32, ensemble_member: u32) -> Result<&ResultBundle<T>, IoError> {
        self.bundles
            .get(&ResultKey::new(year, ensemble_member))
            .ok_or(IoError::ResultNotFound {
                year,
                ensemble_member,
            })
    }

    /// Return the keys held in memory, sorted.
    pub fn keys(&self) -> impl Iterator<Item = ResultKey> + '_ {
        self.bundles.keys().copied()
    }

    /// Write every in-memory bundle to disk, creating directories as needed.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirCreate`] | a year directory cannot be created |
    /// | [`IoError::Serialize`] | bincode encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip(self), fields(root = %self.root.display(), n_bundles = self.bundles.len()))]
    pub fn save(&self) -> Result<(), IoError> {
        for (key, bundle) in &self.bundles {
            let path = self.result_path(key.year, key.ensemble_member);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|e| IoError::OutputDirCreate {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            }

            let envelope = ResultEnvelope {
                format_version: FORMAT_VERSION,
                key: *key,
                entries: &bundle.entries,
            };
            let bytes = bincode::serialize(&envelope).map_err(|e| IoError::Serialize {
                path: path.clone(),
                source: e,
            })?;
            fs::write(&path, &bytes).map_err(|e| IoError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
            debug!(%key, n_results = bundle.len(), size_bytes = bytes.len(), "bundle saved");
        }
        info!("results saved");
        Ok(())
    }

    /// Read `(year, ensemble_member)` from disk and merge it into memory.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ResultNotFound`] | no file for the key |
    /// | [`IoError::ReadFile`] | file read failed |
    /// | [`IoError::Deserialize`] | bincode decoding failed |
    /// | [`IoError::IncompatibleFormatVersion`] | format version mismatch |
    /// | [`IoError::DuplicateResultName`] | a loaded name is already in memory |
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load(&mut self, year: i32, ensemble_member: u32) -> Result<&ResultBundle<T>, IoError> {
        let path = self.result_path(year, ensemble_member);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::ResultNotFound {
                    year,
                    ensemble_member,
                }
            } else {
                IoError::ReadFile {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let envelope: ResultEnvelope<Vec<(String, T)>> =
            bincode::deserialize(&bytes).map_err(|e| IoError::Deserialize {
                path: path.clone(),
                source: e,
            })?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(IoError::IncompatibleFormatVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path,
            });
        }

        // Reject the whole file before merging any of it.
        let key = ResultKey::new(year, ensemble_member);
        let duplicate = {
            let existing = self.bundles.get(&key);
            let mut seen = HashSet::new();
            envelope
                .entries
                .iter()
                .map(|(name, _)| name)
                .find(|name| {
                    existing.is_some_and(|bundle| bundle.contains(name))
                        || !seen.insert(name.as_str())
                })
                .cloned()
        };
        if let Some(name) = duplicate {
            return Err(IoError::DuplicateResultName {
                year,
                ensemble_member,
                name,
            });
        }

        let n_results = envelope.entries.len();
        self.bundles
            .entry(key)
            .or_insert_with(ResultBundle::new)
            .entries
            .extend(envelope.entries);
        debug!(year, ensemble_member, n_results, "bundle loaded");
        self.get_result(year, ensemble_member)
    }

    /// Remove the file for `(year, ensemble_member)` and drop it from memory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ResultNotFound`] if no file exists, or
    /// [`IoError::DeleteFile`] if removal fails.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn delete(&mut self, year: i32, ensemble_member: u32) -> Result<(), IoError> {
        let path = self.result_path(year, ensemble_member);
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::ResultNotFound {
                    year,
                    ensemble_member,
                }
            } else {
                IoError::DeleteFile {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        self.bundles.remove(&ResultKey::new(year, ensemble_member));
        info!(path = %path.display(), "results deleted");
        Ok(())
    }

    /// List years with a directory under the root, ascending.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadFile`] if the root cannot be listed.
    pub fn list_years(&self) -> Result<Vec<i32>, IoError> {
        let mut years: Vec<i32> = read_dir_names(&self.root)?
            .into_iter()
            .filter(|(_, is_dir)| *is_dir)
            .filter_map(|(name, _)| name.parse().ok())
            .collect();
        years.sort_unstable();
        Ok(years)
    }

    /// List ensemble members saved for `year`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadFile`] if the year directory cannot be listed.
    pub fn list_ensemble_members(&self, year: i32) -> Result<Vec<u32>, IoError> {
        let mut members: Vec<u32> = read_dir_names(&self.root.join(year.to_string()))?
            .into_iter()
            .filter(|(_, is_dir)| !*is_dir)
            .filter_map(|(name, _)| {
                name.strip_prefix(FILE_PREFIX)?
                    .strip_suffix(FILE_EXTENSION)?
                    .strip_suffix('.')?
                    .parse()
                    .ok()
            })
            .collect();
        members.sort_unstable();
        Ok(members)
    }
}

/// `(file name, is directory)` for each entry; empty if `dir` does not exist.
fn read_dir_names(dir: &Path) -> Result<Vec<(String, bool)>, IoError> {
    let read_error = |e| IoError::ReadFile {
        path: dir.to_path_buf(),
        source: e,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_error(e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_error)?;
        let is_dir = entry.file_type().map_err(read_error)?.is_dir();
        if let Some(name) = entry.file_name().to_str() {
            names.push((name.to_string(), is_dir));
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn add_and_get_preserve_order() {
        let mut store: ResultStore<u32> = ResultStore::new("unused");
        store.add_result(2005, 0, "b", 2).unwrap();
        store.add_result(2005, 0, "a", 1).unwrap();
        let bundle = store.get_result(2005, 0).unwrap();
        assert_eq!(bundle.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(bundle.get("a"), Some(&1));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut store: ResultStore<u32> = ResultStore::new("unused");
        store.add_result(2005, 0, "tracks", 1).unwrap();
        store.add_result(2005, 1, "tracks", 1).unwrap();
        assert!(matches!(
            store.add_result(2005, 0, "tracks", 2),
            Err(IoError::DuplicateResultName { year: 2005, ensemble_member: 0, .. })
        ));
    }

    #[test]
    fn missing_key_reported() {
        let store: ResultStore<u32> = ResultStore::new("unused");
        assert!(matches!(
            store.get_result(2005, 3),
            Err(IoError::ResultNotFound { year: 2005, ensemble_member: 3 })
        ));
    }

    #[test]
    fn path_layout() {
        let store: ResultStore<u32> = ResultStore::new("/data/out");
        assert_eq!(
            store.result_path(2005, 7),
            PathBuf::from("/data/out/2005/results_em_7.bin")
        );
    }

    #[test]
    fn save_load_delete_cycle() {
        let dir = TempDir::new().unwrap();
        let mut store: ResultStore<Vec<f64>> = ResultStore::new(dir.path());
        store.add_result(2005, 0, "pmins", vec![990.0, 985.5]).unwrap();
        store.add_result(2005, 2, "pmins", vec![1001.0]).unwrap();
        store.add_result(2004, 1, "pmins", vec![]).unwrap();
        store.save().unwrap();

        let mut reloaded: ResultStore<Vec<f64>> = ResultStore::new(dir.path());
        assert_eq!(reloaded.list_years().unwrap(), vec![2004, 2005]);
        assert_eq!(reloaded.list_ensemble_members(2005).unwrap(), vec![0, 2]);
        let bundle = reloaded.load(2005, 0).unwrap();
        assert_eq!(bundle.get("pmins"), Some(&vec![990.0, 985.5]));

        reloaded.delete(2005, 0).unwrap();
        assert_eq!(reloaded.list_ensemble_members(2005).unwrap(), vec![2]);
        assert!(matches!(
            reloaded.load(2005, 0),
            Err(IoError::ResultNotFound { .. })
        ));
        assert!(matches!(
            reloaded.delete(2005, 0),
            Err(IoError::ResultNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_on_load_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store: ResultStore<u32> = ResultStore::new(dir.path());
        store.add_result(2005, 0, "cal", 1).unwrap();
        store.add_result(2005, 0, "val", 2).unwrap();
        store.save().unwrap();

        let mut reloaded: ResultStore<u32> = ResultStore::new(dir.path());
        reloaded.add_result(2005, 0, "val", 20).unwrap();
        assert!(matches!(
            reloaded.load(2005, 0),
            Err(IoError::DuplicateResultName { ref name, .. }) if name == "val"
        ));
        let bundle = reloaded.get_result(2005, 0).unwrap();
        assert_eq!(bundle.names().collect::<Vec<_>>(), vec!["val"]);
        assert_eq!(bundle.get("val"), Some(&20));
    }

    #[test]
    fn version_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let store: ResultStore<u32> = ResultStore::new(dir.path());
        let path = store.result_path(2005, 0);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let envelope = ResultEnvelope::<Vec<(String, u32)>> {
            format_version: FORMAT_VERSION + 1,
            key: ResultKey::new(2005, 0),
            entries: Vec::new(),
        };
        fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let mut store: ResultStore<u32> = ResultStore::new(dir.path());
        assert!(matches!(
            store.load(2005, 0),
            Err(IoError::IncompatibleFormatVersion { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn listing_missing_root_is_empty() {
        let store: ResultStore<u32> = ResultStore::new("/nonexistent/stormcat-results");
        assert!(store.list_years().unwrap().is_empty());
        assert!(store.list_ensemble_members(2005).unwrap().is_empty());
    }
}
