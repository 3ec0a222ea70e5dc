use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::EventKind;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::store::SIDECAR_FILE_NAME;

/// 監看側檔時可能發生的錯誤。 / Errors raised while watching the sidecar.
#[derive(Debug, Error)]
pub enum SidecarWatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
    #[error("watch channel disconnected")]
    ChannelDisconnected,
}

/// 側檔在工作階段之外被改動的事件。 / External change observed on the sidecar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarEvent {
    Created,
    Modified,
    Removed,
}

/// Watches the workspace root (non-recursively) for changes to the sidecar
/// file, so an external edit or deletion can be folded back into the store.
/// Debouncing is the consumer's concern; this type only observes and maps.
/// 監看工作區根目錄下的側檔變動；事件去抖動由呼叫端自行處理。
pub struct SidecarWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<SidecarEvent>,
}

impl SidecarWatcher {
    /// 開始監看指定工作區的側檔。 / Starts watching the sidecar of the given workspace.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SidecarWatchError> {
        let root = workspace_root.as_ref().to_path_buf();
        let sidecar = root.join(SIDECAR_FILE_NAME);
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    if let Some(mapped) = map_event(&sidecar, event) {
                        let _ = tx.send(mapped);
                    }
                }
            },
            Config::default(),
        )?;
        // 側檔可能尚未存在，因此監看其所在目錄而非檔案本身。 /
        // The sidecar may not exist yet, so the parent directory is watched.
        watcher.watch(&root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// 嘗試取得下一個事件（非阻塞）。 / Attempts to fetch the next event without blocking.
    pub fn try_next(&self) -> Option<SidecarEvent> {
        self.rx.try_recv().ok()
    }

    /// 在期限內等待事件，逾時回傳 `None`。 / Waits for an event until the timeout, returning `None` on timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<SidecarEvent>, SidecarWatchError> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(SidecarWatchError::ChannelDisconnected)
            }
        }
    }
}

fn map_event(sidecar: &Path, event: notify::Event) -> Option<SidecarEvent> {
    let concerns_sidecar = event
        .paths
        .iter()
        .any(|path| path.file_name() == sidecar.file_name());
    if !concerns_sidecar {
        return None;
    }

    match event.kind {
        EventKind::Create(_) => Some(SidecarEvent::Created),
        EventKind::Remove(_) => Some(SidecarEvent::Removed),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => {
            // Rename 事件以檔案是否仍存在判斷方向。 / Direction of a rename is
            // resolved by whether the sidecar still exists.
            if sidecar.exists() {
                Some(SidecarEvent::Created)
            } else {
                Some(SidecarEvent::Removed)
            }
        }
        EventKind::Modify(_) => Some(SidecarEvent::Modified),
        _ => None,
    }
}
