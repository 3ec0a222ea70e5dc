use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ignore_rules::IgnoreRules;
use crate::tree::{AnnotationNode, AnnotationTree};
use crate::util::write_atomic;

/// Project-relative name of the annotation sidecar file.
/// 註解側檔在專案根目錄下的固定檔名。
pub const SIDECAR_FILE_NAME: &str = ".codebasenotes-annotations.json";

const FORMAT_VERSION: u32 = 1;

/// Errors emitted by [`SidecarStore`].
/// [`SidecarStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("annotation sidecar IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid annotation sidecar payload: {0}")]
    Invalid(String),
}

/// On-disk document: the root node plus a format version marker. Legacy
/// sidecars without the marker load as version 1.
/// 磁碟文件格式：根節點加上版本欄位；舊檔缺少版本時視為第 1 版。
#[derive(Debug, Serialize, Deserialize)]
struct SidecarDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(flatten)]
    root: AnnotationNode,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// Loads/saves the annotation tree as pretty JSON at a fixed sidecar path,
/// tracking whether a backing file currently exists so "no annotations yet"
/// stays distinguishable from an emptied tree.
/// 以 JSON 儲存註解樹並追蹤側檔是否存在，
/// 以區分「尚未有註解」與「註解被清空」兩種狀態。
#[derive(Debug)]
pub struct SidecarStore {
    path: PathBuf,
    file_present: bool,
}

impl SidecarStore {
    /// Binds a store to `<workspace_root>/.codebasenotes-annotations.json`.
    /// 綁定到工作區根目錄下的側檔路徑。
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            path: workspace_root.as_ref().join(SIDECAR_FILE_NAME),
            file_present: false,
        }
    }

    /// Returns the backing sidecar path.
    /// 取得側檔完整路徑。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a backing file existed at the last load/save.
    /// 最近一次載入/儲存時側檔是否存在。
    pub fn file_present(&self) -> bool {
        self.file_present
    }

    /// Records an externally observed deletion of the sidecar.
    /// 外部刪除側檔時呼叫，清除存在旗標。
    pub fn mark_absent(&mut self) {
        self.file_present = false;
    }

    /// Loads the tree; a missing file yields an empty tree (not an error).
    /// Loaded trees are pruned so stale ignored-path entries never surface.
    /// 載入註解樹；檔案不存在時回傳空樹。載入後立即清理被忽略的節點。
    pub fn load(&mut self, ignore: &IgnoreRules) -> Result<AnnotationTree, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let document: SidecarDocument = serde_json::from_str(&contents)
                    .map_err(|err| StoreError::Invalid(err.to_string()))?;
                self.file_present = true;
                let mut tree = AnnotationTree::from_root(document.root);
                tree.prune(ignore);
                Ok(tree)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.file_present = false;
                Ok(AnnotationTree::new())
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Prunes, serializes, and atomically writes the tree. Write failures
    /// propagate; silent data loss is unacceptable.
    /// 先清理再序列化並原子寫入；寫入失敗必須回報呼叫端。
    pub fn save(
        &mut self,
        tree: &mut AnnotationTree,
        ignore: &IgnoreRules,
    ) -> Result<(), StoreError> {
        tree.prune(ignore);
        let document = SidecarDocument {
            version: FORMAT_VERSION,
            root: tree.root.clone(),
        };
        let payload = serde_json::to_vec_pretty(&document)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &payload)?;
        self.file_present = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, PathClassifier};
    use std::path::Path as StdPath;
    use tempfile::tempdir;

    struct LeafFiles;

    impl PathClassifier for LeafFiles {
        fn classify(&self, relative_path: &str, is_leaf: bool) -> NodeKind {
            if is_leaf {
                NodeKind::file_for_path(StdPath::new(relative_path))
            } else {
                NodeKind::Dir
            }
        }
    }

    #[test]
    fn load_missing_yields_empty_tree_without_file() {
        let dir = tempdir().unwrap();
        let mut store = SidecarStore::new(dir.path());
        let tree = store.load(&IgnoreRules::empty()).unwrap();
        assert!(tree.is_empty());
        assert!(!store.file_present());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = SidecarStore::new(dir.path());
        let ignore = IgnoreRules::empty();

        let mut tree = AnnotationTree::new();
        tree.set("src/app.ts", "entry point", &LeafFiles);
        tree.set("src", "source root", &LeafFiles);
        store.save(&mut tree, &ignore).unwrap();
        assert!(store.file_present());

        let loaded = store.load(&ignore).unwrap();
        assert_eq!(loaded, tree);
        assert_eq!(loaded.get("src/app.ts"), "entry point");
        assert_eq!(loaded.get("src"), "source root");
    }

    #[test]
    fn save_writes_version_marker() {
        let dir = tempdir().unwrap();
        let mut store = SidecarStore::new(dir.path());
        let mut tree = AnnotationTree::new();
        tree.set("a.txt", "note", &LeafFiles);
        store.save(&mut tree, &IgnoreRules::empty()).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["type"], "dir");
    }

    #[test]
    fn legacy_sidecar_without_version_loads() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SIDECAR_FILE_NAME),
            r#"{ "type": "dir", "subNodes": { "a.txt": { "type": "txt", "annotation": "old" } } }"#,
        )
        .unwrap();
        let mut store = SidecarStore::new(dir.path());
        let tree = store.load(&IgnoreRules::empty()).unwrap();
        assert_eq!(tree.get("a.txt"), "old");
        assert!(store.file_present());
    }

    #[test]
    fn corrupt_sidecar_is_a_hard_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SIDECAR_FILE_NAME), "{ not json").unwrap();
        let mut store = SidecarStore::new(dir.path());
        let err = store.load(&IgnoreRules::empty()).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn save_prunes_ignored_and_empty_nodes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "build/\n").unwrap();
        let ignore = IgnoreRules::load(dir.path());
        let mut store = SidecarStore::new(dir.path());

        let mut tree = AnnotationTree::new();
        tree.set("src/app.ts", "entry point", &LeafFiles);
        tree.set("build/out.js", "generated", &LeafFiles);
        store.save(&mut tree, &ignore).unwrap();

        // 記憶體內的樹也同步清理。 / The in-memory tree is pruned as well.
        assert_eq!(tree.get("build/out.js"), "");

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("build"));
        assert!(raw.contains("entry point"));
    }
}
