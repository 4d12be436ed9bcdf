//! Blocks that can still affect fork choice, indexed by root.
//!
//! Each node stores the total balance of votes for it and its descendants. Votes are applied as
//! differences propagated to every ancestor, so computing the weight of a block is a lookup.
//! Children are found through a reverse index kept up to date on insertion and pruning.

use core::iter;

use im::{HashMap, OrdSet};
use log::error;
use types::primitives::{Gwei, Slot, H256};

use crate::misc::{ChainLink, Difference};

#[derive(Clone, Debug)]
struct Node {
    chain_link: ChainLink,
    attesting_balance: Gwei,
}

#[derive(Clone, Debug)]
pub struct BlockTree {
    root: H256,
    nodes: HashMap<H256, Node>,
    children: HashMap<H256, OrdSet<H256>>,
}

impl BlockTree {
    #[must_use]
    pub fn new(anchor: ChainLink) -> Self {
        let root = anchor.block_root;

        let node = Node {
            chain_link: anchor,
            attesting_balance: 0,
        };

        Self {
            root,
            nodes: HashMap::unit(root, node),
            children: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> H256 {
        self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn contains(&self, block_root: H256) -> bool {
        self.nodes.contains_key(&block_root)
    }

    #[must_use]
    pub fn chain_link(&self, block_root: H256) -> Option<&ChainLink> {
        self.nodes.get(&block_root).map(|node| &node.chain_link)
    }

    /// Balance of votes for `block_root` and its descendants. Unknown blocks have none.
    #[must_use]
    pub fn attesting_balance(&self, block_root: H256) -> Gwei {
        self.nodes
            .get(&block_root)
            .map(|node| node.attesting_balance)
            .unwrap_or_default()
    }

    /// Adds a block whose parent is already in the tree.
    ///
    /// New blocks have no votes yet. Votes arriving before their blocks are deferred.
    pub fn insert(&mut self, chain_link: ChainLink) {
        let block_root = chain_link.block_root;
        let parent_root = chain_link.parent_root();

        self.children
            .entry(parent_root)
            .or_insert_with(OrdSet::new)
            .insert(block_root);

        self.nodes.insert(
            block_root,
            Node {
                chain_link,
                attesting_balance: 0,
            },
        );
    }

    pub fn children(&self, block_root: H256) -> impl Iterator<Item = H256> + '_ {
        self.children.get(&block_root).into_iter().flatten().copied()
    }

    /// The chain ending with `block_root`, starting with `block_root` itself and going back as
    /// far as the tree reaches.
    pub fn ancestors(&self, block_root: H256) -> impl Iterator<Item = &ChainLink> + '_ {
        iter::successors(self.chain_link(block_root), |chain_link| {
            self.chain_link(chain_link.parent_root())
        })
    }

    /// Root of the latest block at or before `slot` in the chain ending with `block_root`.
    ///
    /// Returns `None` if the chain does not reach back to `slot` or `block_root` is unknown.
    #[must_use]
    pub fn ancestor(&self, block_root: H256, slot: Slot) -> Option<H256> {
        self.ancestors(block_root)
            .find(|chain_link| chain_link.slot() <= slot)
            .map(|chain_link| chain_link.block_root)
    }

    /// Whether `descendant` is `ancestor` or one of its descendants.
    #[must_use]
    pub fn is_descendant(&self, descendant: H256, ancestor: H256) -> bool {
        self.chain_link(ancestor).is_some_and(|chain_link| {
            self.ancestor(descendant, chain_link.slot()) == Some(ancestor)
        })
    }

    /// Adds `difference` to the attesting balance of `block_root` and all of its ancestors.
    ///
    /// Differences for blocks not in the tree are dropped.
    pub fn apply_difference(&mut self, block_root: H256, difference: Difference) {
        if difference == 0 {
            return;
        }

        let magnitude = difference.unsigned_abs();
        let mut current = block_root;

        while let Some(node) = self.nodes.get_mut(&current) {
            let balance = node.attesting_balance;

            node.attesting_balance = if difference.is_negative() {
                balance.checked_sub(magnitude).unwrap_or_else(|| {
                    error!(
                        "attesting balance of block {current:?} would become negative \
                         (attesting_balance: {balance}, difference: {difference})",
                    );
                    0
                })
            } else {
                balance.saturating_add(magnitude)
            };

            current = node.chain_link.parent_root();
        }
    }

    pub fn apply_differences(&mut self, differences: impl IntoIterator<Item = (H256, Difference)>) {
        for (block_root, difference) in differences {
            self.apply_difference(block_root, difference);
        }
    }

    /// Makes `new_root` the root of the tree, dropping every block that does not descend from it.
    ///
    /// Returns the roots of the dropped blocks.
    pub fn prune(&mut self, new_root: H256) -> Vec<H256> {
        if new_root == self.root || !self.contains(new_root) {
            return vec![];
        }

        let mut retained = HashMap::new();
        let mut retained_children = HashMap::new();
        let mut stack = vec![new_root];

        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                retained.insert(current, node.clone());
            }

            if let Some(children) = self.children.get(&current) {
                stack.extend(children.iter().copied());
                retained_children.insert(current, children.clone());
            }
        }

        let pruned = self
            .nodes
            .keys()
            .filter(|block_root| !retained.contains_key(*block_root))
            .copied()
            .collect();

        self.root = new_root;
        self.nodes = retained;
        self.children = retained_children;

        pruned
    }
}
