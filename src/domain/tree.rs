//! Folder hierarchy helpers: tree assembly, descendant closure and ancestry.
//!
//! Postgres resolves closures and ancestor chains with recursive CTEs; these
//! pure helpers do the same over in-memory folder lists and back the nested
//! tree endpoint.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::FolderRecord;

/// Upper bound on breadcrumb depth.
pub const MAX_ANCESTOR_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: FolderRecord,
    pub children: Vec<FolderNode>,
}

/// Assemble a forest from `folders`, preserving input order among siblings.
///
/// Runs in O(n) via a parent → children adjacency map. Folders whose parent
/// is absent from the input are unreachable and therefore omitted.
pub fn build_tree(folders: Vec<FolderRecord>) -> Vec<FolderNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<FolderRecord>> = HashMap::new();
    for folder in folders {
        by_parent.entry(folder.parent_id).or_default().push(folder);
    }
    attach_children(None, &mut by_parent)
}

fn attach_children(
    parent: Option<Uuid>,
    by_parent: &mut HashMap<Option<Uuid>, Vec<FolderRecord>>,
) -> Vec<FolderNode> {
    let Some(children) = by_parent.remove(&parent) else {
        return Vec::new();
    };

    children
        .into_iter()
        .map(|folder| {
            let children = attach_children(Some(folder.id), by_parent);
            FolderNode { folder, children }
        })
        .collect()
}

/// Breadth-first descendant closure of `root`, including `root` itself.
///
/// `edges` are `(id, parent_id)` pairs. The visited set makes the walk safe
/// even if the stored data contains a cycle.
pub fn descendant_closure(root: Uuid, edges: &[(Uuid, Option<Uuid>)]) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (id, parent) in edges {
        if let Some(parent) = parent {
            children.entry(*parent).or_default().push(*id);
        }
    }

    let mut visited = HashSet::from([root]);
    let mut closure = vec![root];
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        for child in children.get(&current).into_iter().flatten() {
            if visited.insert(*child) {
                closure.push(*child);
                queue.push_back(*child);
            }
        }
    }

    closure
}

/// Ancestors of `id`, nearest parent first, capped at [`MAX_ANCESTOR_DEPTH`].
pub fn ancestor_chain(id: Uuid, parents: &HashMap<Uuid, Option<Uuid>>) -> Vec<Uuid> {
    let mut chain = Vec::new();
    let mut current = parents.get(&id).copied().flatten();

    while let Some(parent) = current {
        if parent == id || chain.contains(&parent) || chain.len() == MAX_ANCESTOR_DEPTH {
            break;
        }
        chain.push(parent);
        current = parents.get(&parent).copied().flatten();
    }

    chain
}

/// Whether re-parenting `folder` under `new_parent` would close a loop,
/// given the current descendant closure of `folder`.
pub fn creates_cycle(folder: Uuid, new_parent: Uuid, closure_of_folder: &[Uuid]) -> bool {
    new_parent == folder || closure_of_folder.contains(&new_parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ReviewState;
    use time::{Duration, OffsetDateTime};

    fn folder(name: &str, parent: Option<Uuid>, offset: i64) -> FolderRecord {
        FolderRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            image: None,
            parent_id: parent,
            review: ReviewState::draft(),
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::minutes(offset),
        }
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let a = folder("A", None, 0);
        let b = folder("B", Some(a.id), 1);
        let c = folder("C", Some(b.id), 2);
        let d = folder("D", None, 3);

        let forest = build_tree(vec![a.clone(), b.clone(), c.clone(), d.clone()]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].folder.id, a.id);
        assert_eq!(forest[0].children[0].folder.id, b.id);
        assert_eq!(forest[0].children[0].children[0].folder.id, c.id);
        assert_eq!(forest[1].folder.id, d.id);
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn tree_drops_folders_with_missing_parent() {
        let a = folder("A", None, 0);
        let orphan = folder("orphan", Some(Uuid::new_v4()), 1);

        let forest = build_tree(vec![a.clone(), orphan]);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].folder.id, a.id);
    }

    #[test]
    fn closure_includes_root_and_all_descendants() {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let unrelated = Uuid::new_v4();
        let edges = vec![
            (root, None),
            (child, Some(root)),
            (grandchild, Some(child)),
            (unrelated, None),
        ];

        let closure = descendant_closure(root, &edges);

        assert_eq!(closure, vec![root, child, grandchild]);
    }

    #[test]
    fn closure_terminates_on_cyclic_data() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edges = vec![(a, Some(b)), (b, Some(a))];

        let closure = descendant_closure(a, &edges);

        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn ancestors_are_listed_nearest_first() {
        let root = Uuid::new_v4();
        let mid = Uuid::new_v4();
        let leaf = Uuid::new_v4();
        let parents = HashMap::from([(root, None), (mid, Some(root)), (leaf, Some(mid))]);

        assert_eq!(ancestor_chain(leaf, &parents), vec![mid, root]);
        assert!(ancestor_chain(root, &parents).is_empty());
    }

    #[test]
    fn reparenting_under_descendant_is_a_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let other = Uuid::new_v4();
        let closure = vec![a, b];

        assert!(creates_cycle(a, a, &closure));
        assert!(creates_cycle(a, b, &closure));
        assert!(!creates_cycle(a, other, &closure));
    }
}
