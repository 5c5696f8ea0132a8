//! Ancestor/descendant closure over a parent-linked forest
//!
//! Both the subject-group tree and the resource-group tree are stored as an
//! arena of slots with a parent-index array. A single pre-order pass assigns
//! every slot an `[enter, exit)` interval, so ancestry checks are O(1) and a
//! node's descendants are one contiguous slice of the pre-order.
//!
//! # Examples
//!
//! ```
//! use tiered_authz::hierarchy::HierarchyIndex;
//! use tiered_authz::report::BuildReport;
//! use tiered_authz::types::{DanglingPolicy, GroupRecord, ResourceGroupId, TreeKind};
//!
//! let nodes = vec![
//!     GroupRecord::root(1u64, "Building A"),
//!     GroupRecord::child(2u64, "Floor 1", 1u64),
//!     GroupRecord::child(3u64, "Room 101", 2u64),
//! ];
//! let mut report = BuildReport::new();
//! let index = HierarchyIndex::<ResourceGroupId>::build(
//!     TreeKind::ResourceGroups,
//!     &nodes,
//!     DanglingPolicy::Skip,
//!     &mut report,
//! )
//! .unwrap();
//!
//! let chain: Vec<u64> = index.ancestors(ResourceGroupId(3)).unwrap().map(|id| id.get()).collect();
//! assert_eq!(chain, vec![3, 2, 1]);
//! assert!(index.is_ancestor(ResourceGroupId(1), ResourceGroupId(3)).unwrap());
//! ```

mod index;


pub use index::{Ancestors, HierarchyIndex, Slot};
