//! Roadmap file on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use nfz_core::persistence::{from_json, to_json};
use nfz_core::{PersistenceError, Roadmap};

#[derive(Debug, Clone)]
pub struct RoadmapStore {
    path: PathBuf,
}

impl RoadmapStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, roadmap: &Roadmap) -> Result<(), PersistenceError> {
        let data = to_json(roadmap)?;
        fs::write(&self.path, &data).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            "Saved roadmap to {} ({} bytes)",
            self.path.display(),
            data.len()
        );
        Ok(())
    }

    /// `Ok(None)` when no file exists yet.
    pub fn load(&self) -> Result<Option<Roadmap>, PersistenceError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let roadmap = from_json(&data)?;
        tracing::info!(
            "Loaded roadmap from {}: {} nodes",
            self.path.display(),
            roadmap.len()
        );
        Ok(Some(roadmap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfz_core::{GeoBounds, Point, RoadmapNode};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nfz-store-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_is_none() {
        let store = RoadmapStore::new(temp_path("missing"));
        assert!(store.load().expect("no error").is_none());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let store = RoadmapStore::new(&path);
        let roadmap = Roadmap {
            nodes: vec![RoadmapNode {
                id: 0,
                point: Point::new(5.0, 52.0),
                edges: vec![],
            }],
            bounding_box: GeoBounds::NETHERLANDS,
            num_samples: 1,
            connection_radius: 0.01,
            built_at: None,
        };
        store.save(&roadmap).expect("save");
        assert_eq!(store.load().expect("load"), Some(roadmap));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").expect("write");
        let store = RoadmapStore::new(&path);
        assert!(matches!(store.load(), Err(PersistenceError::Parse(_))));
        let _ = fs::remove_file(path);
    }
}
