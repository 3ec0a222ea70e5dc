use std::path::Path;
use std::sync::mpsc::Receiver;

use thiserror::Error;

use crate::ignore_rules::IgnoreRules;
use crate::list::{flatten, AnnotationEntry};
use crate::notifier::ChangeNotifier;
use crate::store::{SidecarStore, StoreError};
use crate::tree::{split_segments, AnnotationTree, FsClassifier};
use crate::watch::SidecarEvent;

/// 編輯請求被拒絕的原因；這是拒絕，不是例外。 /
/// Why an edit request was refused. A refusal, not a failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditRefusal {
    #[error("{0} is ignored by .gitignore and cannot be annotated")]
    Ignored(String),
}

/// 編輯面板開啟時需要的資料。 / What an editor panel shows when an edit begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditContext {
    pub item_name: String,
    pub annotation: String,
}

/// The collaborator boundary of the annotation store: owns the tree, the
/// ignore rules, the sidecar store, and the change notifier, and threads
/// every mutation through the save-then-notify ordering.
/// 註解儲存的對外介面：持有註解樹、忽略規則、側檔儲存器與變更廣播器，
/// 所有修改一律先存檔成功後才廣播。
///
/// Session-only state is limited to the current edit target; everything UI
/// keeps (debounce timers, visibility, selection) lives with the caller.
#[derive(Debug)]
pub struct AnnotationService {
    tree: AnnotationTree,
    ignore: IgnoreRules,
    store: SidecarStore,
    notifier: ChangeNotifier,
    classifier: FsClassifier,
    current_edit_target: Option<String>,
}

impl AnnotationService {
    /// 開啟工作區：讀取忽略規則並載入側檔。 /
    /// Opens a workspace: builds ignore rules and loads the sidecar.
    pub fn open(workspace_root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let workspace_root = workspace_root.as_ref();
        let ignore = IgnoreRules::load(workspace_root);
        let mut store = SidecarStore::new(workspace_root);
        let tree = store.load(&ignore)?;
        let classifier = FsClassifier::new(workspace_root);
        Ok(Self {
            tree,
            ignore,
            store,
            notifier: ChangeNotifier::new(),
            classifier,
            current_edit_target: None,
        })
    }

    /// 側檔完整路徑。 / Full path of the sidecar file.
    pub fn sidecar_path(&self) -> &Path {
        self.store.path()
    }

    /// 側檔目前是否存在於磁碟。 / Whether a sidecar file currently backs the store.
    pub fn sidecar_present(&self) -> bool {
        self.store.file_present()
    }

    /// 路徑是否被忽略規則排除。 / Whether the path is excluded by the ignore rules.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore.is_ignored(path)
    }

    /// 取得註解；被忽略或不存在的路徑回傳空字串。 /
    /// Annotation at `path`; `""` when absent or ignored. Never fails.
    pub fn annotation(&self, path: &str) -> &str {
        if self.ignore.is_ignored(path) {
            return "";
        }
        self.tree.get(path)
    }

    /// Sets an annotation, persists, then notifies. Returns `Ok(false)` when
    /// the path is ignored (a refusal — nothing is mutated). On a save
    /// failure the in-memory edit is retained so the user does not lose it,
    /// but the error propagates so they can be warned.
    /// 設定註解並存檔後廣播；被忽略的路徑回傳 `Ok(false)` 且不做任何修改。
    /// 存檔失敗時保留記憶體內的修改並回報錯誤。
    pub fn set_annotation(
        &mut self,
        path: &str,
        text: impl Into<String>,
    ) -> Result<bool, StoreError> {
        if self.ignore.is_ignored(path) {
            return Ok(false);
        }
        self.tree.set(path, text, &self.classifier);
        self.persist_then_notify(path)?;
        Ok(true)
    }

    /// Models the editor-panel round trip: records the edit target and hands
    /// back what the panel displays.
    /// 模擬編輯面板的往返：記錄目前編輯目標並回傳面板顯示所需資料。
    pub fn begin_edit(&mut self, path: &str) -> Result<EditContext, EditRefusal> {
        if self.ignore.is_ignored(path) {
            return Err(EditRefusal::Ignored(path.to_string()));
        }
        self.current_edit_target = Some(path.to_string());
        let item_name = split_segments(path)
            .last()
            .map(|segment| segment.to_string())
            .unwrap_or_default();
        Ok(EditContext {
            item_name,
            annotation: self.tree.get(path).to_string(),
        })
    }

    /// Applies edited text to the recorded target, persists, notifies, and
    /// returns the notified path. `Ok(None)` when no edit is in progress.
    /// The target stays recorded so repeated submissions keep updating it.
    /// 將編輯結果套用到先前記錄的目標並存檔、廣播；沒有進行中的編輯時
    /// 回傳 `Ok(None)`。目標保持記錄，重複送出會持續更新同一項目。
    pub fn submit_edit(&mut self, text: impl Into<String>) -> Result<Option<String>, StoreError> {
        let Some(target) = self.current_edit_target.clone() else {
            return Ok(None);
        };
        if self.ignore.is_ignored(&target) {
            return Ok(None);
        }
        self.tree.set(&target, text, &self.classifier);
        self.persist_then_notify(&target)?;
        Ok(Some(target))
    }

    /// 移除註解節點；祖先不存在時安靜略過。 /
    /// Removes the annotation node; missing ancestors make this a no-op.
    pub fn remove_annotation(&mut self, path: &str) -> Result<(), StoreError> {
        if self.tree.remove(path) {
            self.persist_then_notify(path)?;
        }
        Ok(())
    }

    /// Relocates a single annotation value from `old` to `new`. Moving a path
    /// without a (non-empty) annotation changes nothing. A move onto an
    /// ignored target still removes the old entry, matching `set`'s refusal.
    /// 將單一註解值自 `old` 搬至 `new`；來源沒有註解時不做任何事。
    /// 目標被忽略時仍會移除舊節點（與 `set` 的拒絕行為一致）。
    pub fn move_annotation(&mut self, old: &str, new: &str) -> Result<(), StoreError> {
        if self.ignore.is_ignored(old) || self.tree.get(old).is_empty() {
            return Ok(());
        }
        let moved = if self.ignore.is_ignored(new) {
            self.tree.remove(old);
            false
        } else {
            self.tree.rename(old, new, &self.classifier)
        };
        self.store.save(&mut self.tree, &self.ignore)?;
        self.notifier.emit(old);
        if moved {
            self.notifier.emit(new);
        }
        Ok(())
    }

    /// 訂閱變更事件。 / Subscribes to change notifications.
    pub fn subscribe(&mut self) -> Receiver<String> {
        self.notifier.subscribe()
    }

    /// 攤平所有註解供摘要顯示。 / All annotations, flattened for summary display.
    pub fn list_all(&self) -> Vec<AnnotationEntry> {
        flatten(&self.tree)
    }

    /// 立即清理並存檔。 / Prunes ignored/empty nodes and saves immediately.
    pub fn prune(&mut self) -> Result<(), StoreError> {
        self.store.save(&mut self.tree, &self.ignore)
    }

    /// 重新自磁碟載入（外部建立或修改側檔時）。 /
    /// Reloads from disk after an external sidecar creation or edit.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.tree = self.store.load(&self.ignore)?;
        Ok(())
    }

    /// 外部刪除側檔時清空註解樹並清除存在旗標。 /
    /// External sidecar deletion: clear the tree, drop the existence flag.
    pub fn reset(&mut self) {
        self.tree = AnnotationTree::new();
        self.store.mark_absent();
    }

    /// 將監看事件導向 reload/reset。 / Routes a watch event to reload/reset.
    pub fn handle_sidecar_event(&mut self, event: SidecarEvent) -> Result<(), StoreError> {
        match event {
            SidecarEvent::Created | SidecarEvent::Modified => self.reload(),
            SidecarEvent::Removed => {
                self.reset();
                Ok(())
            }
        }
    }

    fn persist_then_notify(&mut self, path: &str) -> Result<(), StoreError> {
        // 存檔失敗就不廣播；訂閱者不得相信未落盤的變更。 /
        // No notification on a failed save; subscribers must never believe
        // an unsaved change was persisted.
        self.store.save(&mut self.tree, &self.ignore)?;
        self.notifier.emit(path);
        Ok(())
    }
}
