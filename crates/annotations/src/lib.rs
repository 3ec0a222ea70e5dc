//! Annotation store primitives for CodebaseNotes.
//! 管理 CodebaseNotes 專案註解的核心模組。

mod serde_kind;
mod util;

pub mod ignore_rules;
pub mod list;
pub mod notifier;
pub mod service;
pub mod store;
pub mod tree;
pub mod watch;

pub use ignore_rules::IgnoreRules;
pub use list::{flatten, AnnotationEntry};
pub use notifier::ChangeNotifier;
pub use service::{AnnotationService, EditContext, EditRefusal};
pub use store::{SidecarStore, StoreError, SIDECAR_FILE_NAME};
pub use tree::{AnnotationNode, AnnotationTree, FsClassifier, NodeKind, PathClassifier};
pub use watch::{SidecarEvent, SidecarWatchError, SidecarWatcher};
