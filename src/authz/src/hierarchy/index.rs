//! Arena-backed hierarchy index with pre-order intervals

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{AuthzError, Result};
use crate::report::BuildReport;
use crate::types::{DanglingPolicy, GroupRecord, TreeKind};

/// Position of a node in the arena
pub type Slot = usize;

const UNVISITED: u8 = 0;
const ON_PATH: u8 = 1;
const DONE: u8 = 2;

/// Immutable ancestor/descendant closure for one forest
///
/// Built once per snapshot; every query afterwards is read-only, so the index
/// can be shared across threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct HierarchyIndex<K> {
    kind: TreeKind,
    keys: Vec<K>,
    names: Vec<String>,
    slots: HashMap<K, Slot>,
    parent: Vec<Option<Slot>>,
    depth: Vec<usize>,
    /// Pre-order position of each slot
    enter: Vec<usize>,
    /// One past the pre-order position of the slot's last descendant
    exit: Vec<usize>,
    preorder: Vec<Slot>,
}

impl<K> HierarchyIndex<K>
where
    K: Copy + Eq + Hash + fmt::Display + Into<u64>,
{
    /// Build the index from parent-link rows
    ///
    /// # Errors
    ///
    /// - [`AuthzError::DuplicateId`] if an id appears twice
    /// - [`AuthzError::Cycle`] if a parent chain does not terminate
    /// - [`AuthzError::DanglingReference`] for an unknown parent under
    ///   [`DanglingPolicy::Reject`]; under `Skip` the node becomes a root
    pub fn build(
        kind: TreeKind,
        nodes: &[GroupRecord<K>],
        policy: DanglingPolicy,
        report: &mut BuildReport,
    ) -> Result<Self> {
        let n = nodes.len();
        let mut slots = HashMap::with_capacity(n);
        let mut keys = Vec::with_capacity(n);
        let mut names = Vec::with_capacity(n);

        for node in nodes {
            if slots.insert(node.id, keys.len()).is_some() {
                return Err(AuthzError::DuplicateId {
                    kind: kind.into(),
                    id: node.id.into(),
                });
            }
            keys.push(node.id);
            names.push(node.name.clone());
        }

        let mut parent = vec![None; n];
        for (slot, node) in nodes.iter().enumerate() {
            let Some(parent_id) = node.parent else {
                continue;
            };
            match slots.get(&parent_id) {
                Some(&parent_slot) => parent[slot] = Some(parent_slot),
                None => report.dangling(
                    policy,
                    format!("{} {} has unknown parent {}", kind, node.id, parent_id),
                )?,
            }
        }

        detect_cycles(kind, &keys, &parent)?;

        let mut children: Vec<Vec<Slot>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (slot, link) in parent.iter().enumerate() {
            match link {
                Some(p) => children[*p].push(slot),
                None => roots.push(slot),
            }
        }

        let mut enter = vec![0; n];
        let mut exit = vec![0; n];
        let mut depth = vec![0; n];
        let mut preorder = Vec::with_capacity(n);

        // (slot, subtree finished)
        let mut stack: Vec<(Slot, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((slot, finished)) = stack.pop() {
            if finished {
                exit[slot] = preorder.len();
                continue;
            }
            enter[slot] = preorder.len();
            preorder.push(slot);
            depth[slot] = parent[slot].map_or(0, |p| depth[p] + 1);

            stack.push((slot, true));
            for &child in children[slot].iter().rev() {
                stack.push((child, false));
            }
        }

        if preorder.len() != n {
            return Err(AuthzError::Internal(format!(
                "{} hierarchy traversal reached {} of {} nodes",
                kind,
                preorder.len(),
                n
            )));
        }

        Ok(Self {
            kind,
            keys,
            names,
            slots,
            parent,
            depth,
            enter,
            exit,
            preorder,
        })
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, id: K) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn slot(&self, id: K) -> Option<Slot> {
        self.slots.get(&id).copied()
    }

    /// Slot of `id`, or `NotFound` for an id outside this tree
    pub fn require(&self, id: K) -> Result<Slot> {
        self.slot(id)
            .ok_or_else(|| AuthzError::not_found(self.kind.into(), id))
    }

    pub(crate) fn key(&self, slot: Slot) -> K {
        self.keys[slot]
    }

    /// All ids, in ingestion order
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.keys.iter().copied()
    }

    pub fn name(&self, id: K) -> Option<&str> {
        self.slot(id).map(|slot| self.names[slot].as_str())
    }

    pub fn parent(&self, id: K) -> Result<Option<K>> {
        let slot = self.require(id)?;
        Ok(self.parent[slot].map(|p| self.keys[p]))
    }

    /// Number of edges between `id` and its root
    pub fn depth(&self, id: K) -> Result<usize> {
        Ok(self.depth[self.require(id)?])
    }

    /// Root ids, in ingestion order
    pub fn roots(&self) -> impl Iterator<Item = K> + '_ {
        self.parent
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(slot, _)| self.keys[slot])
    }

    /// Chain from `id` up to its root, inclusive, nearest first
    pub fn ancestors(&self, id: K) -> Result<Ancestors<'_, K>> {
        let slot = self.require(id)?;
        Ok(Ancestors {
            keys: &self.keys,
            slots: self.ancestor_slots(slot),
        })
    }

    /// Allocation-free slot walk used on the query path
    pub(crate) fn ancestor_slots(&self, slot: Slot) -> AncestorSlots<'_> {
        AncestorSlots {
            parent: &self.parent,
            next: Some(slot),
        }
    }

    /// Whether `ancestor` is on the chain from `descendant` to its root
    ///
    /// Reflexive: every node is its own ancestor.
    pub fn is_ancestor(&self, ancestor: K, descendant: K) -> Result<bool> {
        let a = self.require(ancestor)?;
        let d = self.require(descendant)?;
        Ok(self.is_ancestor_slot(a, d))
    }

    pub(crate) fn is_ancestor_slot(&self, ancestor: Slot, descendant: Slot) -> bool {
        self.enter[ancestor] <= self.enter[descendant]
            && self.exit[descendant] <= self.exit[ancestor]
    }

    /// `id` and everything below it, in pre-order
    pub fn descendants(&self, id: K) -> Result<impl Iterator<Item = K> + '_> {
        let slot = self.require(id)?;
        Ok(self
            .descendant_slots(slot)
            .iter()
            .map(move |&s| self.keys[s]))
    }

    pub(crate) fn descendant_slots(&self, slot: Slot) -> &[Slot] {
        &self.preorder[self.enter[slot]..self.exit[slot]]
    }
}

/// Walk parent links and fail on the first chain that revisits itself
fn detect_cycles<K>(kind: TreeKind, keys: &[K], parent: &[Option<Slot>]) -> Result<()>
where
    K: fmt::Display,
{
    let mut state = vec![UNVISITED; keys.len()];
    let mut path = Vec::new();

    for start in 0..keys.len() {
        if state[start] != UNVISITED {
            continue;
        }

        path.clear();
        let mut current = Some(start);
        while let Some(slot) = current {
            match state[slot] {
                UNVISITED => {
                    state[slot] = ON_PATH;
                    path.push(slot);
                    current = parent[slot];
                }
                ON_PATH => {
                    let from = path.iter().position(|&s| s == slot).unwrap_or(0);
                    let cycle: Vec<String> = path[from..]
                        .iter()
                        .chain(std::iter::once(&slot))
                        .map(|&s| keys[s].to_string())
                        .collect();
                    return Err(AuthzError::Cycle {
                        tree: kind,
                        path: cycle.join(" -> "),
                    });
                }
                _ => break,
            }
        }

        for &slot in &path {
            state[slot] = DONE;
        }
    }

    Ok(())
}

/// Iterator over ancestor slots, nearest first
#[derive(Debug, Clone)]
pub struct AncestorSlots<'a> {
    parent: &'a [Option<Slot>],
    next: Option<Slot>,
}

impl Iterator for AncestorSlots<'_> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        let slot = self.next?;
        self.next = self.parent[slot];
        Some(slot)
    }
}

/// Iterator over ancestor ids, nearest first
#[derive(Debug, Clone)]
pub struct Ancestors<'a, K> {
    keys: &'a [K],
    slots: AncestorSlots<'a>,
}

impl<K: Copy> Iterator for Ancestors<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.slots.next().map(|slot| self.keys[slot])
    }
}
