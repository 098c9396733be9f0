//! Broad-Phase Collision Detection
//!
//! An incremental dynamic AABB tree plus the pair bookkeeping that turns
//! proxy movement into candidate contact pairs.
//!
//! # Tree
//!
//! - **Fat AABBs**: leaves are inflated by [`AABB_EXTENSION`] and stretched
//!   along their displacement so small movements don't touch the tree.
//! - **Rotations**: AVL-style balancing keeps queries O(log n).
//! - **Free-list node pool**: nodes are indices into a reusable vector.
//!
//! # Pairs
//!
//! Moved proxies are buffered; [`BroadPhase::update_pairs`] queries the
//! tree around each buffered proxy, deduplicates the results, and hands
//! `(proxy, proxy)` candidates to the caller.

use glam::Vec2;

use crate::collision::{Aabb, RayCastInput};
use crate::settings::{AABB_EXTENSION, AABB_MULTIPLIER};

/// Sentinel for "no node".
pub const NULL_NODE: u32 = u32::MAX;

/// Payload stored on each leaf: which fixture child the proxy belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyData {
    /// Index of the owning fixture's arena slot.
    pub fixture: u32,
    /// Shape child index (chain segment) within the fixture.
    pub child: u32,
}

#[derive(Clone, Debug)]
struct TreeNode {
    aabb: Aabb,
    data: ProxyData,
    parent: u32,
    left: u32,
    right: u32,
    /// Leaf = 0, free = -1.
    height: i32,
    moved: bool,
}

impl TreeNode {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.left == NULL_NODE
    }
}

// ============================================================================
// DynamicTree
// ============================================================================

/// Incremental bounding-volume hierarchy over fat AABBs.
pub struct DynamicTree {
    nodes: Vec<TreeNode>,
    free_list: u32,
    root: u32,
    proxy_count: usize,
}

impl DynamicTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_list: NULL_NODE,
            root: NULL_NODE,
            proxy_count: 0,
        }
    }

    fn alloc_node(&mut self) -> u32 {
        if self.free_list == NULL_NODE {
            let id = self.nodes.len() as u32;
            self.nodes.push(TreeNode {
                aabb: Aabb::default(),
                data: ProxyData {
                    fixture: u32::MAX,
                    child: 0,
                },
                parent: NULL_NODE,
                left: NULL_NODE,
                right: NULL_NODE,
                height: -1,
                moved: false,
            });
            id
        } else {
            let id = self.free_list;
            self.free_list = self.nodes[id as usize].parent;
            let node = &mut self.nodes[id as usize];
            node.parent = NULL_NODE;
            node.left = NULL_NODE;
            node.right = NULL_NODE;
            node.height = 0;
            node.moved = false;
            id
        }
    }

    fn free_node(&mut self, id: u32) {
        let node = &mut self.nodes[id as usize];
        node.parent = self.free_list;
        node.height = -1;
        self.free_list = id;
    }

    /// Insert a fat proxy for `aabb`. Returns the proxy id.
    pub fn create_proxy(&mut self, aabb: Aabb, data: ProxyData) -> u32 {
        let id = self.alloc_node();
        let r = Vec2::splat(AABB_EXTENSION);
        let node = &mut self.nodes[id as usize];
        node.aabb = Aabb::new(aabb.lower - r, aabb.upper + r);
        node.data = data;
        node.height = 0;
        node.moved = true;
        self.insert_leaf(id);
        self.proxy_count += 1;
        id
    }

    /// Remove a proxy.
    pub fn destroy_proxy(&mut self, proxy: u32) {
        debug_assert!(self.nodes[proxy as usize].is_leaf());
        self.remove_leaf(proxy);
        self.free_node(proxy);
        self.proxy_count -= 1;
    }

    /// Move a proxy to a new tight AABB with a displacement hint.
    ///
    /// Returns true when the proxy actually re-entered the tree (its tight
    /// box escaped the stored fat box).
    pub fn move_proxy(&mut self, proxy: u32, aabb: Aabb, displacement: Vec2) -> bool {
        debug_assert!(self.nodes[proxy as usize].is_leaf());

        // Extend along the displacement to predict where the proxy is going.
        let r = Vec2::splat(AABB_EXTENSION);
        let mut fat = Aabb::new(aabb.lower - r, aabb.upper + r);
        let d = AABB_MULTIPLIER * displacement;
        if d.x < 0.0 {
            fat.lower.x += d.x;
        } else {
            fat.upper.x += d.x;
        }
        if d.y < 0.0 {
            fat.lower.y += d.y;
        } else {
            fat.upper.y += d.y;
        }

        let tree_aabb = self.nodes[proxy as usize].aabb;
        if tree_aabb.contains(&aabb) {
            // The tight box is still inside the fat box. Only rebuild when
            // the fat box has become uselessly large.
            let huge = Aabb::new(
                fat.lower - 4.0 * r,
                fat.upper + 4.0 * r,
            );
            if huge.contains(&tree_aabb) {
                return false;
            }
        }

        self.remove_leaf(proxy);
        self.nodes[proxy as usize].aabb = fat;
        self.insert_leaf(proxy);
        self.nodes[proxy as usize].moved = true;
        true
    }

    /// Leaf payload.
    #[inline]
    #[must_use]
    pub fn proxy_data(&self, proxy: u32) -> ProxyData {
        self.nodes[proxy as usize].data
    }

    /// Stored fat AABB of a proxy.
    #[inline]
    #[must_use]
    pub fn fat_aabb(&self, proxy: u32) -> Aabb {
        self.nodes[proxy as usize].aabb
    }

    /// Number of live proxies.
    #[inline]
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Tree height (0 for an empty tree).
    #[must_use]
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Maximum height difference between siblings anywhere in the tree.
    #[must_use]
    pub fn max_balance(&self) -> i32 {
        let mut max_balance = 0;
        for node in &self.nodes {
            if node.height <= 1 {
                continue;
            }
            let left = node.left as usize;
            let right = node.right as usize;
            let balance = (self.nodes[right].height - self.nodes[left].height).abs();
            max_balance = max_balance.max(balance);
        }
        max_balance
    }

    /// Total internal perimeter divided by the root perimeter; 1.0 is a
    /// perfectly tight tree.
    #[must_use]
    pub fn area_ratio(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }
        let root_area = self.nodes[self.root as usize].aabb.perimeter();
        if root_area == 0.0 {
            return 0.0;
        }
        let mut total = 0.0;
        for node in &self.nodes {
            if node.height < 0 {
                continue;
            }
            total += node.aabb.perimeter();
        }
        total / root_area
    }

    /// Visit every proxy whose fat AABB overlaps `aabb`. Return false from
    /// the callback to stop early.
    pub fn query(&self, aabb: &Aabb, mut callback: impl FnMut(u32) -> bool) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if node.aabb.test_overlap(aabb) {
                if node.is_leaf() {
                    if !callback(id) {
                        return;
                    }
                } else {
                    stack.push(node.left);
                    stack.push(node.right);
                }
            }
        }
    }

    /// Segment-cast through the tree. The callback receives the current
    /// clipped input and the hit proxy, and returns a new max fraction:
    /// 0 ends the cast, 1 leaves it unclipped, anything else clips it.
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        mut callback: impl FnMut(&RayCastInput, u32) -> f32,
    ) {
        let p1 = input.p1;
        let p2 = input.p2;
        let r = (p2 - p1).normalize_or_zero();
        if r == Vec2::ZERO {
            return;
        }

        // Perpendicular to the segment for the fat-box rejection test.
        let abs_v = Vec2::new(r.y.abs(), r.x.abs());
        let mut max_fraction = input.max_fraction;

        let segment_aabb = |max_fraction: f32| {
            let t = p1 + max_fraction * (p2 - p1);
            Aabb::new(p1.min(t), p1.max(t))
        };
        let mut aabb = segment_aabb(max_fraction);

        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if !node.aabb.test_overlap(&aabb) {
                continue;
            }

            // Separating-axis check against the segment's direction.
            let c = node.aabb.center();
            let h = node.aabb.extents();
            let separation = crate::math::cross_vv(r, p1 - c).abs() - abs_v.dot(h);
            if separation > 0.0 {
                continue;
            }

            if node.is_leaf() {
                let sub_input = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };
                let value = callback(&sub_input, id);
                if value == 0.0 {
                    return;
                }
                if value > 0.0 {
                    max_fraction = value;
                    aabb = segment_aabb(max_fraction);
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // Find the best sibling by the surface-area heuristic.
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let node = &self.nodes[index as usize];
            let left = node.left;
            let right = node.right;

            let area = node.aabb.perimeter();
            let combined_area = node.aabb.combine(&leaf_aabb).perimeter();

            // Cost of making a new parent for this node and the leaf.
            let cost = 2.0 * combined_area;
            let inheritance_cost = 2.0 * (combined_area - area);

            let child_cost = |child: u32| {
                let child_aabb = &self.nodes[child as usize].aabb;
                let combined = child_aabb.combine(&leaf_aabb);
                if self.nodes[child as usize].is_leaf() {
                    combined.perimeter() + inheritance_cost
                } else {
                    combined.perimeter() - child_aabb.perimeter() + inheritance_cost
                }
            };

            let cost_left = child_cost(left);
            let cost_right = child_cost(right);

            if cost < cost_left && cost < cost_right {
                break;
            }
            index = if cost_left < cost_right { left } else { right };
        }

        let sibling = index;

        // Splice in a new parent.
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.alloc_node();
        {
            let sibling_aabb = self.nodes[sibling as usize].aabb;
            let sibling_height = self.nodes[sibling as usize].height;
            let node = &mut self.nodes[new_parent as usize];
            node.parent = old_parent;
            node.aabb = leaf_aabb.combine(&sibling_aabb);
            node.height = sibling_height + 1;
        }

        if old_parent != NULL_NODE {
            let op = &mut self.nodes[old_parent as usize];
            if op.left == sibling {
                op.left = new_parent;
            } else {
                op.right = new_parent;
            }
        } else {
            self.root = new_parent;
        }
        self.nodes[new_parent as usize].left = sibling;
        self.nodes[new_parent as usize].right = leaf;
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        // Fix heights and AABBs up the tree, rebalancing as we go.
        let mut index = self.nodes[leaf as usize].parent;
        while index != NULL_NODE {
            index = self.balance(index);

            let left = self.nodes[index as usize].left;
            let right = self.nodes[index as usize].right;
            debug_assert!(left != NULL_NODE && right != NULL_NODE);

            let height =
                1 + self.nodes[left as usize].height.max(self.nodes[right as usize].height);
            let aabb = self.nodes[left as usize]
                .aabb
                .combine(&self.nodes[right as usize].aabb);
            let node = &mut self.nodes[index as usize];
            node.height = height;
            node.aabb = aabb;

            index = node.parent;
        }
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].left == leaf {
            self.nodes[parent as usize].right
        } else {
            self.nodes[parent as usize].left
        };

        if grand_parent != NULL_NODE {
            let gp = &mut self.nodes[grand_parent as usize];
            if gp.left == parent {
                gp.left = sibling;
            } else {
                gp.right = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);

            let mut index = grand_parent;
            while index != NULL_NODE {
                index = self.balance(index);

                let left = self.nodes[index as usize].left;
                let right = self.nodes[index as usize].right;
                let aabb = self.nodes[left as usize]
                    .aabb
                    .combine(&self.nodes[right as usize].aabb);
                let height =
                    1 + self.nodes[left as usize].height.max(self.nodes[right as usize].height);
                let node = &mut self.nodes[index as usize];
                node.aabb = aabb;
                node.height = height;

                index = node.parent;
            }
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Rotate the subtree at `a` if it is unbalanced; returns the new root
    /// of the subtree.
    fn balance(&mut self, a: u32) -> u32 {
        let ia = a as usize;
        if self.nodes[ia].is_leaf() || self.nodes[ia].height < 2 {
            return a;
        }

        let b = self.nodes[ia].left;
        let c = self.nodes[ia].right;
        let ib = b as usize;
        let ic = c as usize;

        let balance = self.nodes[ic].height - self.nodes[ib].height;

        // Rotate C up.
        if balance > 1 {
            let f = self.nodes[ic].left;
            let g = self.nodes[ic].right;
            let fi = f as usize;
            let gi = g as usize;

            // Swap A and C.
            self.nodes[ic].left = a;
            self.nodes[ic].parent = self.nodes[ia].parent;
            self.nodes[ia].parent = c;

            let c_parent = self.nodes[ic].parent;
            if c_parent != NULL_NODE {
                if self.nodes[c_parent as usize].left == a {
                    self.nodes[c_parent as usize].left = c;
                } else {
                    self.nodes[c_parent as usize].right = c;
                }
            } else {
                self.root = c;
            }

            // Hang the taller grandchild off C, the shorter off A.
            if self.nodes[fi].height > self.nodes[gi].height {
                self.nodes[ic].right = f;
                self.nodes[ia].right = g;
                self.nodes[gi].parent = a;
                self.nodes[ia].aabb = self.nodes[ib].aabb.combine(&self.nodes[gi].aabb);
                self.nodes[ic].aabb = self.nodes[ia].aabb.combine(&self.nodes[fi].aabb);
                self.nodes[ia].height = 1 + self.nodes[ib].height.max(self.nodes[gi].height);
                self.nodes[ic].height = 1 + self.nodes[ia].height.max(self.nodes[fi].height);
            } else {
                self.nodes[ic].right = g;
                self.nodes[ia].right = f;
                self.nodes[fi].parent = a;
                self.nodes[ia].aabb = self.nodes[ib].aabb.combine(&self.nodes[fi].aabb);
                self.nodes[ic].aabb = self.nodes[ia].aabb.combine(&self.nodes[gi].aabb);
                self.nodes[ia].height = 1 + self.nodes[ib].height.max(self.nodes[fi].height);
                self.nodes[ic].height = 1 + self.nodes[ia].height.max(self.nodes[gi].height);
            }

            return c;
        }

        // Rotate B up.
        if balance < -1 {
            let d = self.nodes[ib].left;
            let e = self.nodes[ib].right;
            let di = d as usize;
            let ei = e as usize;

            self.nodes[ib].left = a;
            self.nodes[ib].parent = self.nodes[ia].parent;
            self.nodes[ia].parent = b;

            let b_parent = self.nodes[ib].parent;
            if b_parent != NULL_NODE {
                if self.nodes[b_parent as usize].left == a {
                    self.nodes[b_parent as usize].left = b;
                } else {
                    self.nodes[b_parent as usize].right = b;
                }
            } else {
                self.root = b;
            }

            if self.nodes[di].height > self.nodes[ei].height {
                self.nodes[ib].right = d;
                self.nodes[ia].left = e;
                self.nodes[ei].parent = a;
                self.nodes[ia].aabb = self.nodes[ic].aabb.combine(&self.nodes[ei].aabb);
                self.nodes[ib].aabb = self.nodes[ia].aabb.combine(&self.nodes[di].aabb);
                self.nodes[ia].height = 1 + self.nodes[ic].height.max(self.nodes[ei].height);
                self.nodes[ib].height = 1 + self.nodes[ia].height.max(self.nodes[di].height);
            } else {
                self.nodes[ib].right = e;
                self.nodes[ia].left = d;
                self.nodes[di].parent = a;
                self.nodes[ia].aabb = self.nodes[ic].aabb.combine(&self.nodes[di].aabb);
                self.nodes[ib].aabb = self.nodes[ia].aabb.combine(&self.nodes[ei].aabb);
                self.nodes[ia].height = 1 + self.nodes[ic].height.max(self.nodes[di].height);
                self.nodes[ib].height = 1 + self.nodes[ia].height.max(self.nodes[ei].height);
            }

            return b;
        }

        a
    }
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// BroadPhase
// ============================================================================

/// The tree plus move/pair buffers consumed by the contact manager.
pub struct BroadPhase {
    tree: DynamicTree,
    move_buffer: Vec<u32>,
    pair_buffer: Vec<(u32, u32)>,
}

impl BroadPhase {
    /// Create an empty broad-phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::new(),
            pair_buffer: Vec::new(),
        }
    }

    /// Create a proxy and schedule it for pair generation.
    pub fn create_proxy(&mut self, aabb: Aabb, data: ProxyData) -> u32 {
        let proxy = self.tree.create_proxy(aabb, data);
        self.move_buffer.push(proxy);
        proxy
    }

    /// Destroy a proxy, dropping any pending move.
    pub fn destroy_proxy(&mut self, proxy: u32) {
        self.move_buffer.retain(|&p| p != proxy);
        self.tree.destroy_proxy(proxy);
    }

    /// Move a proxy; it will participate in the next pair update.
    pub fn move_proxy(&mut self, proxy: u32, aabb: Aabb, displacement: Vec2) {
        if self.tree.move_proxy(proxy, aabb, displacement) {
            self.move_buffer.push(proxy);
        }
    }

    /// Force a proxy into the next pair update without moving it (used when
    /// filters change).
    pub fn touch_proxy(&mut self, proxy: u32) {
        self.move_buffer.push(proxy);
    }

    /// Leaf payload for a proxy.
    #[inline]
    #[must_use]
    pub fn proxy_data(&self, proxy: u32) -> ProxyData {
        self.tree.proxy_data(proxy)
    }

    /// Do the stored fat AABBs of two proxies overlap?
    #[inline]
    #[must_use]
    pub fn test_overlap(&self, proxy_a: u32, proxy_b: u32) -> bool {
        self.tree
            .fat_aabb(proxy_a)
            .test_overlap(&self.tree.fat_aabb(proxy_b))
    }

    /// Number of proxies.
    #[inline]
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.tree.proxy_count()
    }

    /// Tree height diagnostic.
    #[inline]
    #[must_use]
    pub fn tree_height(&self) -> i32 {
        self.tree.height()
    }

    /// Tree balance diagnostic.
    #[inline]
    #[must_use]
    pub fn tree_balance(&self) -> i32 {
        self.tree.max_balance()
    }

    /// Tree quality diagnostic (1.0 = tight).
    #[inline]
    #[must_use]
    pub fn tree_quality(&self) -> f32 {
        self.tree.area_ratio()
    }

    /// Drain buffered moves into a deduplicated candidate pair list.
    ///
    /// Pairs are returned `(min_proxy, max_proxy)`-ordered and sorted, which
    /// keeps downstream contact creation deterministic.
    pub fn update_pairs(&mut self) -> Vec<(u32, u32)> {
        self.pair_buffer.clear();

        for i in 0..self.move_buffer.len() {
            let query_proxy = self.move_buffer[i];
            let fat = self.tree.fat_aabb(query_proxy);

            let mut local_pairs = Vec::new();
            self.tree.query(&fat, |proxy| {
                if proxy == query_proxy {
                    return true;
                }
                // Avoid double-reporting a pair when both proxies moved.
                let both_moved =
                    self.tree.nodes[proxy as usize].moved && proxy > query_proxy;
                if both_moved {
                    return true;
                }
                local_pairs.push((query_proxy.min(proxy), query_proxy.max(proxy)));
                true
            });
            self.pair_buffer.extend(local_pairs);
        }

        for &proxy in &self.move_buffer {
            self.tree.nodes[proxy as usize].moved = false;
        }
        self.move_buffer.clear();

        self.pair_buffer.sort_unstable();
        self.pair_buffer.dedup();
        core::mem::take(&mut self.pair_buffer)
    }

    /// Query the tree for proxies overlapping `aabb`.
    pub fn query(&self, aabb: &Aabb, callback: impl FnMut(u32) -> bool) {
        self.tree.query(aabb, callback);
    }

    /// Segment-cast through the tree (see [`DynamicTree::ray_cast`]).
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        callback: impl FnMut(&RayCastInput, u32) -> f32,
    ) {
        self.tree.ray_cast(input, callback);
    }
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x: f32, y: f32, hx: f32, hy: f32) -> Aabb {
        Aabb::new(Vec2::new(x - hx, y - hy), Vec2::new(x + hx, y + hy))
    }

    fn data(i: u32) -> ProxyData {
        ProxyData {
            fixture: i,
            child: 0,
        }
    }

    #[test]
    fn test_create_query_destroy() {
        let mut tree = DynamicTree::new();
        let a = tree.create_proxy(aabb(0.0, 0.0, 1.0, 1.0), data(1));
        let b = tree.create_proxy(aabb(10.0, 0.0, 1.0, 1.0), data(2));

        let mut hits = Vec::new();
        tree.query(&aabb(0.0, 0.0, 2.0, 2.0), |p| {
            hits.push(p);
            true
        });
        assert_eq!(hits, vec![a]);

        tree.destroy_proxy(a);
        assert_eq!(tree.proxy_count(), 1);
        let mut hits = Vec::new();
        tree.query(&aabb(10.0, 0.0, 2.0, 2.0), |p| {
            hits.push(p);
            true
        });
        assert_eq!(hits, vec![b]);
    }

    #[test]
    fn test_tree_stays_balanced() {
        let mut tree = DynamicTree::new();
        for i in 0..64 {
            tree.create_proxy(aabb(i as f32 * 3.0, 0.0, 1.0, 1.0), data(i));
        }
        assert!(tree.height() <= 12, "height = {}", tree.height());
        assert!(tree.max_balance() <= 1);
    }

    #[test]
    fn test_small_move_does_not_reinsert() {
        let mut tree = DynamicTree::new();
        let a = tree.create_proxy(aabb(0.0, 0.0, 1.0, 1.0), data(1));
        // Move well within the fat margin.
        let moved = tree.move_proxy(a, aabb(0.01, 0.0, 1.0, 1.0), Vec2::new(0.01, 0.0));
        assert!(!moved);
        let moved = tree.move_proxy(a, aabb(5.0, 0.0, 1.0, 1.0), Vec2::new(5.0, 0.0));
        assert!(moved);
    }

    #[test]
    fn test_update_pairs_dedup() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(aabb(0.0, 0.0, 1.0, 1.0), data(1));
        let b = bp.create_proxy(aabb(0.5, 0.0, 1.0, 1.0), data(2));
        let _far = bp.create_proxy(aabb(50.0, 0.0, 1.0, 1.0), data(3));

        let pairs = bp.update_pairs();
        assert_eq!(pairs, vec![(a.min(b), a.max(b))]);

        // No moves buffered: no pairs.
        assert!(bp.update_pairs().is_empty());
    }

    #[test]
    fn test_ray_cast_finds_closest() {
        let mut bp = BroadPhase::new();
        let near = bp.create_proxy(aabb(2.0, 0.0, 0.5, 0.5), data(1));
        let _mid = bp.create_proxy(aabb(5.0, 0.0, 0.5, 0.5), data(2));

        let mut first_hits = Vec::new();
        bp.ray_cast(
            &RayCastInput {
                p1: Vec2::new(0.0, 0.0),
                p2: Vec2::new(10.0, 0.0),
                max_fraction: 1.0,
            },
            |_input, proxy| {
                first_hits.push(proxy);
                1.0
            },
        );
        assert!(first_hits.contains(&near));
    }
}
