use std::collections::HashSet;

use super::snapshot::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeRow {
    pub pid: u32,
    pub depth: usize,
}

/// Pre-order traversal of the process hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeWalk {
    pub rows: Vec<TreeRow>,
    /// PIDs reached a second time through a different parent link.
    pub revisited: Vec<u32>,
    /// PIDs no root leads to, i.e. members of a parent cycle.
    pub unreachable: Vec<u32>,
}

/// Top-level processes in discovery order: those whose parent is 0,
/// themselves, or absent from the snapshot (the parent already exited).
pub fn roots(snapshot: &Snapshot) -> Vec<u32> {
    let mut seen = HashSet::new();
    snapshot
        .processes()
        .iter()
        .filter(|p| seen.insert(p.pid))
        .filter(|p| p.ppid == 0 || p.ppid == p.pid || !snapshot.contains(p.ppid))
        .map(|p| p.pid)
        .collect()
}

/// Walks every root, then reports whatever could not be reached.
pub fn walk(snapshot: &Snapshot) -> TreeWalk {
    let mut walk = TreeWalk::default();
    let mut visited = HashSet::with_capacity(snapshot.len());
    for root in roots(snapshot) {
        descend(snapshot, root, &mut visited, &mut walk);
    }
    for process in snapshot.processes() {
        if visited.insert(process.pid) {
            walk.unreachable.push(process.pid);
        }
    }
    walk
}

/// Walks the subtree below `root`. An unknown root yields an empty walk.
pub fn walk_from(snapshot: &Snapshot, root: u32) -> TreeWalk {
    let mut walk = TreeWalk::default();
    if snapshot.contains(root) {
        let mut visited = HashSet::new();
        descend(snapshot, root, &mut visited, &mut walk);
    }
    walk
}

fn descend(snapshot: &Snapshot, root: u32, visited: &mut HashSet<u32>, walk: &mut TreeWalk) {
    let mut stack = vec![(root, 0usize)];
    while let Some((pid, depth)) = stack.pop() {
        if !visited.insert(pid) {
            walk.revisited.push(pid);
            continue;
        }
        walk.rows.push(TreeRow { pid, depth });
        // Reverse so the first-discovered child is popped first.
        for &child in snapshot.children(pid).iter().rev() {
            if child != pid {
                stack.push((child, depth + 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::snapshot::tests::{facts, sample};

    fn snapshot(pairs: &[(u32, u32)]) -> Snapshot {
        let records = pairs.iter().map(|&(pid, ppid)| sample(pid, ppid)).collect();
        Snapshot::build(records, facts(1024))
    }

    fn pids(walk: &TreeWalk) -> Vec<(u32, usize)> {
        walk.rows.iter().map(|r| (r.pid, r.depth)).collect()
    }

    #[test]
    fn missing_parent_becomes_a_root() {
        let snapshot = snapshot(&[(1, 0), (2, 1), (3, 99)]);
        let walk = walk(&snapshot);
        assert_eq!(pids(&walk), vec![(1, 0), (2, 1), (3, 0)]);
        assert!(walk.unreachable.is_empty());
        assert!(walk.revisited.is_empty());
    }

    #[test]
    fn children_follow_discovery_order_depth_first() {
        let snapshot = snapshot(&[(1, 0), (5, 1), (3, 1), (6, 5), (4, 3)]);
        assert_eq!(
            pids(&walk(&snapshot)),
            vec![(1, 0), (5, 1), (6, 2), (3, 1), (4, 2)]
        );
    }

    #[test]
    fn cycles_are_reported_not_followed() {
        let snapshot = snapshot(&[(1, 0), (10, 11), (11, 10), (12, 12)]);
        let walk = walk(&snapshot);
        assert_eq!(pids(&walk), vec![(1, 0), (12, 0)]);
        assert_eq!(walk.unreachable, vec![10, 11]);
    }

    #[test]
    fn pid_listed_under_two_parents_is_visited_once() {
        let snapshot = snapshot(&[(1, 0), (2, 1), (7, 1), (7, 2)]);
        let walk = walk(&snapshot);
        let visits = walk.rows.iter().filter(|r| r.pid == 7).count();
        assert_eq!(visits, 1);
        assert_eq!(walk.revisited, vec![7]);
    }

    #[test]
    fn walk_from_subtree_and_unknown_root() {
        let snapshot = snapshot(&[(1, 0), (2, 1), (3, 2), (4, 1)]);
        assert_eq!(pids(&walk_from(&snapshot, 2)), vec![(2, 0), (3, 1)]);
        assert!(walk_from(&snapshot, 404).rows.is_empty());
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let pairs: Vec<(u32, u32)> = (1..=50_000).map(|pid| (pid, pid - 1)).collect();
        let walk = walk(&snapshot(&pairs));
        assert_eq!(walk.rows.len(), 50_000);
        assert_eq!(walk.rows.last().map(|r| r.depth), Some(49_999));
    }
}
