use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ignore_rules::IgnoreRules;
use crate::serde_kind;

/// Classification of a tree node as a directory or a file.
/// 節點的類型：資料夾，或（可帶副檔名的）檔案。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Dir,
    File { extension: Option<String> },
}

impl NodeKind {
    /// Derives a file kind from the path's lowercase extension.
    /// 依路徑副檔名（轉為小寫）建立檔案類型。
    pub fn file_for_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());
        NodeKind::File { extension }
    }

    /// The string stored in the sidecar's `type` field.
    /// 寫入側檔 `type` 欄位的字串。
    pub fn wire_name(&self) -> &str {
        match self {
            NodeKind::Dir => "dir",
            NodeKind::File {
                extension: Some(ext),
            } => ext,
            NodeKind::File { extension: None } => "file",
        }
    }

    /// Reconstructs a kind from a `type` field value.
    /// 從 `type` 欄位的字串還原節點類型。
    pub fn from_wire(value: &str) -> Self {
        match value {
            "dir" => NodeKind::Dir,
            "file" => NodeKind::File { extension: None },
            ext => NodeKind::File {
                extension: Some(ext.to_string()),
            },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Dir)
    }
}

/// Decides the kind of a node created for a path segment.
/// 決定新建節點類型的介面；正式實作會查詢檔案系統。
pub trait PathClassifier {
    fn classify(&self, relative_path: &str, is_leaf: bool) -> NodeKind;
}

/// Classifier backed by `fs::metadata` against the workspace root.
/// 以工作區根目錄下的 `fs::metadata` 結果分類節點。
#[derive(Debug)]
pub struct FsClassifier {
    root: PathBuf,
}

impl FsClassifier {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl PathClassifier for FsClassifier {
    fn classify(&self, relative_path: &str, is_leaf: bool) -> NodeKind {
        let full_path = self.root.join(relative_path);
        match fs::metadata(&full_path) {
            Ok(metadata) if !is_leaf || metadata.is_dir() => NodeKind::Dir,
            Ok(_) => NodeKind::file_for_path(&full_path),
            Err(err) => {
                // Stat 失敗時退回一般檔案類型。 / Degrade to a plain file kind when stat fails.
                warn!(
                    "could not classify {}: {err}; defaulting to file",
                    full_path.display()
                );
                NodeKind::File { extension: None }
            }
        }
    }
}

/// One path segment in the annotation tree.
/// 註解樹中的單一路徑節點。
///
/// `annotation: None` means "no note"; `Some("")` is a present, empty note —
/// the two are distinct and must survive serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationNode {
    #[serde(rename = "type", with = "serde_kind")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(
        rename = "subNodes",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub children: BTreeMap<String, AnnotationNode>,
}

impl AnnotationNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            annotation: None,
            children: BTreeMap::new(),
        }
    }
}

/// In-memory trie keyed by path segments.
/// 以路徑片段為鍵的記憶體內註解樹。
///
/// The tree is a pure data structure: ignore enforcement and persistence
/// belong to the layers above (`IgnoreRules` only appears as a `prune`
/// argument, never as owned state).
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationTree {
    pub root: AnnotationNode,
}

impl AnnotationTree {
    /// Constructs an empty tree with a directory root.
    /// 建立僅含資料夾根節點的空樹。
    pub fn new() -> Self {
        Self {
            root: AnnotationNode::new(NodeKind::Dir),
        }
    }

    /// Wraps a deserialized root node, restoring the root-kind invariant.
    /// 包裝反序列化的根節點並強制其為資料夾類型。
    pub fn from_root(mut root: AnnotationNode) -> Self {
        root.kind = NodeKind::Dir;
        Self { root }
    }

    /// True when the tree holds no annotations and no nodes.
    /// 樹中沒有任何節點與註解時回傳 `true`。
    pub fn is_empty(&self) -> bool {
        self.root.annotation.is_none() && self.root.children.is_empty()
    }

    /// Returns the annotation at `path`, or `""` when absent. Never fails.
    /// 取得指定路徑的註解；不存在時回傳空字串，永不失敗。
    pub fn get(&self, path: &str) -> &str {
        let mut node = &self.root;
        for segment in split_segments(path) {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return "",
            }
        }
        node.annotation.as_deref().unwrap_or("")
    }

    /// Walks/creates nodes along `path` and overwrites the terminal
    /// annotation, classifying each newly created node.
    /// 沿路徑建立節點並覆寫末端註解；新節點的類型由分類器決定。
    pub fn set(&mut self, path: &str, text: impl Into<String>, classifier: &dyn PathClassifier) {
        let segments = split_segments(path);
        if segments.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        let mut walked = String::new();
        let last_index = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(segment);
            let is_leaf = index == last_index;
            node = node
                .children
                .entry((*segment).to_string())
                .or_insert_with(|| AnnotationNode::new(classifier.classify(&walked, is_leaf)));
        }
        node.annotation = Some(text.into());
    }

    /// Deletes the terminal node from its parent; missing ancestors make this
    /// a silent no-op. Returns whether a node was actually removed.
    /// 自父節點移除末端節點；祖先不存在時安靜略過，回傳是否真的移除。
    pub fn remove(&mut self, path: &str) -> bool {
        let segments = split_segments(path);
        let Some((last, prefix)) = segments.split_last() else {
            return false;
        };

        let mut node = &mut self.root;
        for segment in prefix {
            match node.children.get_mut(*segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.children.remove(*last).is_some()
    }

    /// Relocates a single non-empty annotation value from `old` to `new`.
    /// Descendant annotations stay where they are. Returns whether a value
    /// moved.
    /// 將 `old` 的非空註解搬移至 `new`；子孫節點的註解不會跟著移動。
    pub fn rename(&mut self, old: &str, new: &str, classifier: &dyn PathClassifier) -> bool {
        let current = self.get(old).to_string();
        if current.is_empty() {
            return false;
        }
        self.remove(old);
        self.set(new, current, classifier);
        true
    }

    /// Single-pass cleanup: drops ignored subtrees without recursing into
    /// them, then drops children left with no annotation and no children.
    /// 單趟清理：先整棵捨棄被忽略的子樹，再由下而上移除變空的節點。
    pub fn prune(&mut self, ignore: &IgnoreRules) {
        prune_children(&mut self.root, "", ignore);
    }
}

impl Default for AnnotationTree {
    fn default() -> Self {
        Self::new()
    }
}

fn prune_children(node: &mut AnnotationNode, prefix: &str, ignore: &IgnoreRules) {
    node.children.retain(|name, child| {
        let child_path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        if ignore.is_ignored(&child_path) {
            return false;
        }
        prune_children(child, &child_path, ignore);
        child.annotation.is_some() || !child.children.is_empty()
    });
}

/// Splits a relative path into single segments, accepting `/` and `\`.
/// 以 `/` 或 `\` 切割相對路徑為片段。
pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}
