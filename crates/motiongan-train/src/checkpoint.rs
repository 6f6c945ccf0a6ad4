//! Checkpoint persistence: two weight files plus a cursor record.
//!
//! A failed write is fatal; the protocol must never continue believing a
//! checkpoint succeeded when it did not.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use motiongan_core::{Error, Result, TrainingCursor};

use crate::model::AdversarialModel;

const DISC_SUFFIX: &str = "_disc_weights.safetensors";
const GEN_SUFFIX: &str = "_gen_weights.safetensors";
const CURSOR_SUFFIX: &str = "_cursor.json";

/// The persisted cursor record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorRecord {
    pub cursor: TrainingCursor,
    pub saved_at: DateTime<Utc>,
}

/// Derives checkpoint file names from a base path and performs saves and
/// restores.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    base: PathBuf,
}

impl Checkpointer {
    pub fn new(base: impl Into<PathBuf>) -> Checkpointer {
        Checkpointer { base: base.into() }
    }

    pub fn disc_path(&self) -> PathBuf {
        self.with_suffix(DISC_SUFFIX)
    }

    pub fn gen_path(&self) -> PathBuf {
        self.with_suffix(GEN_SUFFIX)
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.with_suffix(CURSOR_SUFFIX)
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(suffix);
        self.base.with_file_name(name)
    }

    /// Persist both weight sets and the cursor.
    pub fn save<M: AdversarialModel>(&self, model: &M, cursor: TrainingCursor) -> Result<()> {
        if let Some(parent) = self.base.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::checkpoint(parent, e.to_string()))?;
            }
        }
        model.save_weights(&self.disc_path(), &self.gen_path())?;
        self.save_cursor(cursor)
    }

    fn save_cursor(&self, cursor: TrainingCursor) -> Result<()> {
        let record = CursorRecord {
            cursor,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(self.cursor_path(), json)
            .map_err(|e| Error::checkpoint(self.cursor_path(), e.to_string()))?;
        Ok(())
    }

    /// Load the persisted cursor, or `None` when no checkpoint exists yet.
    pub fn load_cursor(&self) -> Result<Option<CursorRecord>> {
        let path = self.cursor_path();
        if !path.exists() {
            return Ok(None);
        }
        let json =
            fs::read_to_string(&path).map_err(|e| Error::checkpoint(&path, e.to_string()))?;
        let record: CursorRecord = serde_json::from_str(&json)?;
        Ok(Some(record))
    }

    /// Restore model weights from an existing checkpoint pair.
    pub fn restore<M: AdversarialModel>(&self, model: &mut M) -> Result<()> {
        model.load_weights(&self.disc_path(), &self.gen_path())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FileDumpModel;

    impl AdversarialModel for FileDumpModel {
        fn disc_train(
            &mut self,
            _: &motiongan_data::AssembledBatch,
        ) -> Result<crate::losses::DiscLosses> {
            Ok(Default::default())
        }
        fn gen_train(
            &mut self,
            _: &motiongan_data::AssembledBatch,
        ) -> Result<crate::losses::GenLosses> {
            Ok(Default::default())
        }
        fn disc_eval(
            &mut self,
            _: &motiongan_data::AssembledBatch,
        ) -> Result<crate::losses::DiscLosses> {
            Ok(Default::default())
        }
        fn gen_eval(&mut self, _: &motiongan_data::AssembledBatch) -> Result<crate::model::GenEval> {
            Ok(crate::model::GenEval {
                losses: Default::default(),
                generated: ndarray::Array4::zeros((1, 1, 1, 3)),
                embedding: None,
            })
        }
        fn update_lr(&mut self, _: f64) -> Result<()> {
            Ok(())
        }
        fn save_weights(&self, disc_path: &Path, gen_path: &Path) -> Result<()> {
            fs::write(disc_path, b"disc")?;
            fs::write(gen_path, b"gen")?;
            Ok(())
        }
        fn load_weights(&mut self, _: &Path, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn paths_carry_fixed_suffixes() {
        let ckpt = Checkpointer::new("save/run1");
        assert!(ckpt
            .disc_path()
            .to_string_lossy()
            .ends_with("run1_disc_weights.safetensors"));
        assert!(ckpt
            .gen_path()
            .to_string_lossy()
            .ends_with("run1_gen_weights.safetensors"));
        assert!(ckpt.cursor_path().to_string_lossy().ends_with("run1_cursor.json"));
    }

    #[test]
    fn save_then_load_cursor_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpointer::new(dir.path().join("run"));
        let cursor = TrainingCursor { epoch: 4, batch: 0 };

        ckpt.save(&FileDumpModel, cursor).unwrap();

        assert!(ckpt.disc_path().exists());
        assert!(ckpt.gen_path().exists());
        let record = ckpt.load_cursor().unwrap().expect("cursor written");
        assert_eq!(record.cursor, cursor);
    }

    #[test]
    fn missing_cursor_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpointer::new(dir.path().join("fresh"));
        assert!(ckpt.load_cursor().unwrap().is_none());
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let ckpt = Checkpointer::new("/proc/does-not-exist/run");
        let err = ckpt.save(&FileDumpModel, TrainingCursor::default());
        assert!(err.is_err());
    }
}
