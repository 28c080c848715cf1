//! Huffman tree construction for hierarchical softmax.
//!
//! The tree is only needed long enough to read off each leaf's code; nodes live
//! in a flat arena and refer to each other by index. Leaves are nodes
//! `0..n`, internal nodes are `n..2n-1` in creation order, so the root is
//! always node `2n - 2` and internal node `i` owns output-layer row `i - n`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A leaf's position in the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codeword {
    /// Branch taken at each internal node, root to leaf.
    pub code: Vec<u8>,
    /// Output-layer rows of the internal nodes where those branches are taken,
    /// root to leaf, followed by the root's row once more.
    /// Empty for a tree with a single leaf, which has no internal nodes.
    pub path: Vec<u32>,
}

#[derive(Debug)]
struct Node {
    count: u64,
    /// `None` until the node is merged; stays `None` for the root.
    parent: Option<usize>,
    /// Which child of its parent this node is.
    bit: u8,
}

/// Builds a Huffman tree over `counts` and returns the codeword of each leaf,
/// in the same order.
///
/// Frequent leaves get short codes. Among equal counts, the node created first
/// is merged first.
pub fn encode(counts: &[u64]) -> Vec<Codeword> {
    let n = counts.len();
    let mut nodes: Vec<Node> = Vec::with_capacity(2 * n);
    let mut heap = BinaryHeap::with_capacity(n);
    for &count in counts {
        heap.push(Reverse((count, nodes.len())));
        nodes.push(Node {
            count,
            parent: None,
            bit: 0,
        });
    }

    // Merge the two smallest nodes until only the root is left.
    while let Some(Reverse((_, min1))) = heap.pop() {
        let Some(Reverse((_, min2))) = heap.pop() else {
            break;
        };
        let merged = nodes.len();
        nodes.push(Node {
            count: nodes[min1].count + nodes[min2].count,
            parent: None,
            bit: 0,
        });
        nodes[min1].parent = Some(merged);
        nodes[min1].bit = 0;
        nodes[min2].parent = Some(merged);
        nodes[min2].bit = 1;
        heap.push(Reverse((nodes[merged].count, merged)));
    }

    let Some(root) = nodes.len().checked_sub(1) else {
        return vec![];
    };
    nodes[root].bit = 1;
    let root_row = root.checked_sub(n).map(|row| row as u32);

    (0..n)
        .map(|leaf| {
            let mut code = vec![];
            let mut path = vec![];
            let mut b = leaf;
            while let Some(parent) = nodes[b].parent {
                code.push(nodes[b].bit);
                path.push((parent - n) as u32);
                b = parent;
            }
            code.reverse();
            path.reverse();
            // Every path ends at the root's row, so the root always gets trained.
            path.extend(root_row);
            Codeword { code, path }
        })
        .collect()
}
