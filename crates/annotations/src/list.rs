use crate::tree::{AnnotationNode, AnnotationTree};

/// 攤平後的一筆 (路徑, 註解) 資料。 / One flattened (path, annotation) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationEntry {
    pub path: String,
    pub annotation: String,
}

/// Flattens the tree depth-first into (path, annotation) pairs, keeping only
/// present, non-empty annotations. Recomputed on every call; ordering follows
/// child-map iteration and carries no display guarantee — consumers sort.
/// 以深度優先將註解樹攤平為 (路徑, 註解) 序列，只保留非空註解；
/// 每次呼叫重新計算，排序屬於呈現層的責任。
pub fn flatten(tree: &AnnotationTree) -> Vec<AnnotationEntry> {
    let mut entries = Vec::new();
    collect(&tree.root, "", &mut entries);
    entries
}

fn collect(node: &AnnotationNode, prefix: &str, entries: &mut Vec<AnnotationEntry>) {
    for (name, child) in &node.children {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        if let Some(annotation) = &child.annotation {
            if !annotation.is_empty() {
                entries.push(AnnotationEntry {
                    path: path.clone(),
                    annotation: annotation.clone(),
                });
            }
        }
        collect(child, &path, entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, PathClassifier};
    use std::path::Path;

    struct LeafFiles;

    impl PathClassifier for LeafFiles {
        fn classify(&self, relative_path: &str, is_leaf: bool) -> NodeKind {
            if is_leaf {
                NodeKind::file_for_path(Path::new(relative_path))
            } else {
                NodeKind::Dir
            }
        }
    }

    #[test]
    fn emits_only_non_empty_annotations() {
        let mut tree = AnnotationTree::new();
        tree.set("src", "source root", &LeafFiles);
        tree.set("src/app.ts", "entry point", &LeafFiles);
        tree.set("README.md", "", &LeafFiles);

        let entries = flatten(&tree);
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&AnnotationEntry {
            path: "src".into(),
            annotation: "source root".into(),
        }));
        assert!(entries.contains(&AnnotationEntry {
            path: "src/app.ts".into(),
            annotation: "entry point".into(),
        }));
    }

    #[test]
    fn parent_precedes_descendants() {
        let mut tree = AnnotationTree::new();
        tree.set("src", "source root", &LeafFiles);
        tree.set("src/app.ts", "entry point", &LeafFiles);

        let entries = flatten(&tree);
        let parent = entries.iter().position(|e| e.path == "src").unwrap();
        let child = entries.iter().position(|e| e.path == "src/app.ts").unwrap();
        assert!(parent < child);
    }

    #[test]
    fn empty_tree_flattens_to_nothing() {
        let tree = AnnotationTree::new();
        assert!(flatten(&tree).is_empty());
    }

    #[test]
    fn recomputed_on_every_call() {
        let mut tree = AnnotationTree::new();
        tree.set("a.txt", "one", &LeafFiles);
        assert_eq!(flatten(&tree).len(), 1);
        tree.set("b.txt", "two", &LeafFiles);
        assert_eq!(flatten(&tree).len(), 2);
    }
}
