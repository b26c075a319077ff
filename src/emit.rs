//! Node buffer used by the compiler.
//!
//! Compilation runs twice. The first pass only counts nodes, the second
//! emits them into a buffer of exactly that size. Links are node indices;
//! `insert()` shifts the links that point into the moved operand, so loops
//! already closed inside it stay valid. A link from before the operand to
//! its first node ends up at the inserted node.

use crate::insn::{Node, Op};
use crate::types::NodeId;

#[derive(Debug)]
pub struct Emitter {
    /// None while sizing.
    nodes: Option<Vec<Node>>,

    /// Number of nodes so far.
    size: usize,
}

impl Emitter {
    /// An emitter for the sizing pass: nodes are counted, not stored.
    pub fn sizing() -> Self {
        Emitter {
            nodes: None,
            size: 0,
        }
    }

    /// An emitter for the final pass, given the size found by sizing.
    pub fn emitting(capacity: usize) -> Self {
        Emitter {
            nodes: Some(Vec::with_capacity(capacity)),
            size: 0,
        }
    }

    #[inline]
    pub fn is_emitting(&self) -> bool {
        self.nodes.is_some()
    }

    /// \return the index the next node will get.
    #[inline]
    pub fn size(&self) -> NodeId {
        self.size
    }

    /// Append an unlinked node. \return its index.
    pub fn node(&mut self, op: Op) -> NodeId {
        let id = self.size;
        if let Some(nodes) = &mut self.nodes {
            nodes.push(Node { op, next: None });
        }
        self.size += 1;
        id
    }

    /// \return the op at `p`. None while sizing.
    pub fn op_at(&self, p: NodeId) -> Option<&Op> {
        self.nodes.as_ref()?.get(p).map(|n| &n.op)
    }

    /// \return the link of `p`. None while sizing, which ends every walk.
    pub fn next_of(&self, p: NodeId) -> Option<NodeId> {
        self.nodes.as_ref()?.get(p)?.next
    }

    /// Set the link of the last node in the chain starting at `p`.
    /// Linking a node to itself leaves it unlinked.
    pub fn tail(&mut self, p: NodeId, val: NodeId) {
        let mut scan = p;
        while let Some(next) = self.next_of(scan) {
            scan = next;
        }
        if scan == val {
            return;
        }
        if let Some(node) = self.nodes.as_mut().and_then(|nodes| nodes.get_mut(scan)) {
            node.next = Some(val);
        }
    }

    /// `tail()` on the operand of `p`, when `p` is a BRANCH or a complex
    /// brace. Other nodes have no operand chain to link.
    pub fn op_tail(&mut self, p: NodeId, val: NodeId) {
        if matches!(self.op_at(p), Some(Op::Branch) | Some(Op::BraceComplex(_))) {
            self.tail(p + 1, val);
        }
    }

    /// Insert a node at `opnd`, moving the operand and everything after it
    /// up by one. The new node is unlinked.
    pub fn insert(&mut self, op: Op, opnd: NodeId) {
        if let Some(nodes) = &mut self.nodes {
            for (idx, node) in nodes.iter_mut().enumerate() {
                if let Some(next) = &mut node.next {
                    if *next > opnd || (*next == opnd && idx >= opnd) {
                        *next += 1;
                    }
                }
            }
            nodes.insert(opnd, Node { op, next: None });
        }
        self.size += 1;
    }

    /// Insert a BRACE_LIMITS at `opnd`, linked to the node it moved.
    pub fn insert_limits(&mut self, min: u32, max: u32, opnd: NodeId) {
        self.insert(Op::BraceLimits { min, max }, opnd);
        if let Some(node) = self.nodes.as_mut().and_then(|nodes| nodes.get_mut(opnd)) {
            node.next = Some(opnd + 1);
        }
    }

    /// \return the emitted nodes; empty after a sizing pass.
    pub fn finish(self) -> Vec<Node> {
        self.nodes.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exactly(s: &str) -> Op {
        Op::Exactly(s.into())
    }

    #[test]
    fn sizing_counts_inserts() {
        let mut e = Emitter::sizing();
        let a = e.node(exactly("a"));
        e.insert(Op::Branch, a);
        e.insert_limits(1, 2, a);
        e.tail(a, 7);
        assert_eq!(e.size(), 3);
        assert!(!e.is_emitting());
        assert!(e.finish().is_empty());
    }

    #[test]
    fn tail_walks_chain() {
        let mut e = Emitter::emitting(3);
        let a = e.node(exactly("a"));
        let b = e.node(exactly("b"));
        let end = e.node(Op::End);
        e.tail(a, b);
        e.tail(a, end);
        let nodes = e.finish();
        assert_eq!(nodes[a].next, Some(b));
        assert_eq!(nodes[b].next, Some(end));
        assert_eq!(nodes[end].next, None);
    }

    #[test]
    fn insert_shifts_links() {
        // Build "x" followed by a closed loop over "a", then wrap it.
        let mut e = Emitter::emitting(8);
        let x = e.node(exactly("x"));
        let ret = e.node(exactly("a"));
        e.tail(x, ret);
        e.insert(Op::Branch, ret);
        let back = e.node(Op::Back);
        e.op_tail(ret, back);
        e.op_tail(ret, ret);
        let nodes = e.finish();
        // "x" now leads to the inserted node.
        assert_eq!(nodes[x].next, Some(ret));
        assert_eq!(nodes[ret].op, Op::Branch);
        assert_eq!(nodes[ret + 1].next, Some(back));
        assert_eq!(nodes[back].next, Some(ret));
    }

    #[test]
    fn insert_keeps_inner_loops() {
        // "a" loops back to itself and then goes on to "b".
        let mut e = Emitter::emitting(4);
        let a = e.node(exactly("a"));
        let b = e.node(exactly("b"));
        if let Some(nodes) = &mut e.nodes {
            nodes[a].next = Some(a);
            nodes[b].next = Some(b);
        }
        e.insert(Op::Match, a);
        let nodes = e.finish();
        assert_eq!(nodes[a].op, Op::Match);
        assert_eq!(nodes[a + 1].next, Some(a + 1));
        assert_eq!(nodes[b + 1].next, Some(b + 1));
    }

    #[test]
    fn limits_link_to_moved_node() {
        let mut e = Emitter::emitting(2);
        let ret = e.node(Op::BraceSimple);
        e.insert_limits(2, 5, ret);
        let nodes = e.finish();
        assert_eq!(nodes[ret].op, Op::BraceLimits { min: 2, max: 5 });
        assert_eq!(nodes[ret].next, Some(ret + 1));
        assert_eq!(nodes[ret + 1].op, Op::BraceSimple);
    }
}
