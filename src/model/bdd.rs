//! A compact BDD manager used to answer configuration queries over a feature model.
//!
//! Nodes are hash-consed in a unique table, so two structurally equal functions share
//! one node and satisfiability is a constant-time check against the `ZERO` terminal.
//! Variables are 1-indexed and ordered by their index.
//!
//! Besides the usual connectives this manager offers exactly what the configuration
//! oracle needs: model counting ([`Bdd::sat_count`]) and uniform sampling of models
//! ([`Bdd::random_sat`]).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use log::debug;
use num_bigint::BigUint;
use rand::Rng;

use crate::assignment::Assignment;

/// Handle of a BDD node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    pub const ZERO: Ref = Ref(0);
    pub const ONE: Ref = Ref(1);

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 <= 1
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Ref::ZERO => write!(f, "@0"),
            Ref::ONE => write!(f, "@1"),
            Ref(i) => write!(f, "@{}", i),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

/// Sentinel variable of the terminals, below every real variable.
const TERMINAL_VARIABLE: u32 = u32::MAX;

/// Default number of entries the ITE cache may hold before it is flushed.
pub const DEFAULT_CACHE_LIMIT: usize = 1 << 16;

pub struct Bdd {
    nodes: RefCell<Vec<Node>>,
    unique: RefCell<HashMap<Node, Ref>>,
    cache: RefCell<HashMap<(Ref, Ref, Ref), Ref>>,
    cache_limit: usize,
}

impl Default for Bdd {
    fn default() -> Self {
        Self::with_cache_limit(DEFAULT_CACHE_LIMIT)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("nodes", &self.nodes.borrow().len())
            .field("cache", &self.cache.borrow().len())
            .finish()
    }
}

impl Bdd {
    /// Creates a manager whose ITE cache is flushed once it holds `cache_limit` entries.
    pub fn with_cache_limit(cache_limit: usize) -> Self {
        assert!(cache_limit > 0, "Cache limit should be positive");

        let terminal = Node {
            variable: TERMINAL_VARIABLE,
            low: Ref::ZERO,
            high: Ref::ZERO,
        };
        Self {
            nodes: RefCell::new(vec![terminal, terminal]),
            unique: RefCell::new(HashMap::new()),
            cache: RefCell::new(HashMap::new()),
            cache_limit,
        }
    }

    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }

    /// Number of allocated nodes, terminals included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn variable(&self, node: Ref) -> u32 {
        self.nodes.borrow()[node.index()].variable
    }
    pub fn low(&self, node: Ref) -> Ref {
        self.nodes.borrow()[node.index()].low
    }
    pub fn high(&self, node: Ref) -> Ref {
        self.nodes.borrow()[node.index()].high
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        if low == high {
            return low;
        }

        let node = Node { variable: v, low, high };
        if let Some(&existing) = self.unique.borrow().get(&node) {
            return existing;
        }

        let mut nodes = self.nodes.borrow_mut();
        let id = Ref(nodes.len() as u32);
        nodes.push(node);
        self.unique.borrow_mut().insert(node, id);
        id
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    /// The function of a single (signed, DIMACS-style) literal.
    pub fn mk_literal(&self, literal: i32) -> Ref {
        assert_ne!(literal, 0, "Literal 0 is not a valid literal");
        let v = literal.unsigned_abs();
        if literal > 0 {
            self.mk_node(v, Ref::ZERO, Ref::ONE)
        } else {
            self.mk_node(v, Ref::ONE, Ref::ZERO)
        }
    }

    /// Conjunction of literals.
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        literals
            .into_iter()
            .fold(Ref::ONE, |acc, lit| self.apply_and(acc, self.mk_literal(lit)))
    }

    /// Disjunction of literals.
    pub fn mk_clause(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        literals
            .into_iter()
            .fold(Ref::ZERO, |acc, lit| self.apply_or(acc, self.mk_literal(lit)))
    }

    fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        if node.is_terminal() || self.variable(node) != v {
            return (node, node);
        }
        (self.low(node), self.high(node))
    }

    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Terminal cases
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }

        let key = (f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let v = self.variable(f).min(self.variable(g)).min(self.variable(h));
        let (f0, f1) = self.top_cofactors(f, v);
        let (g0, g1) = self.top_cofactors(g, v);
        let (h0, h1) = self.top_cofactors(h, v);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(v, e, t);

        let mut cache = self.cache.borrow_mut();
        if cache.len() >= self.cache_limit {
            debug!("apply_ite: flushing {} cache entries", cache.len());
            cache.clear();
        }
        cache.insert(key, res);
        res
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        self.apply_ite(f, Ref::ZERO, Ref::ONE)
    }

    pub fn apply_and(&self, f: Ref, g: Ref) -> Ref {
        self.apply_ite(f, g, Ref::ZERO)
    }

    pub fn apply_or(&self, f: Ref, g: Ref) -> Ref {
        self.apply_ite(f, Ref::ONE, g)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    /// Level of `node` for counting purposes: terminals sit just below the last variable.
    fn level(&self, node: Ref, num_vars: u32) -> u32 {
        if node.is_terminal() {
            num_vars + 1
        } else {
            self.variable(node)
        }
    }

    /// Number of models of `f` over variables `1..=num_vars`.
    pub fn sat_count(&self, f: Ref, num_vars: u32) -> BigUint {
        let mut cache = HashMap::new();
        let count = self.count_below(f, num_vars, &mut cache);
        count << (self.level(f, num_vars) - 1)
    }

    /// Models of `node` over the variables from its own level down to `num_vars`.
    fn count_below(&self, node: Ref, num_vars: u32, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        }
        if self.is_one(node) {
            return BigUint::from(1u32);
        }
        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let v = self.variable(node);
        assert!(v <= num_vars, "Variable {} exceeds the universe of {} variables", v, num_vars);
        let (low, high) = (self.low(node), self.high(node));
        let count_low = self.count_below(low, num_vars, cache) << (self.level(low, num_vars) - v - 1);
        let count_high = self.count_below(high, num_vars, cache) << (self.level(high, num_vars) - v - 1);

        let count = count_low + count_high;
        cache.insert(node, count.clone());
        count
    }

    /// Draws a complete model of `f` uniformly at random over variables `1..=num_vars`.
    pub fn random_sat<R: Rng + ?Sized>(&self, f: Ref, num_vars: u32, rng: &mut R) -> Option<Assignment> {
        if self.is_zero(f) {
            return None;
        }

        let mut cache = HashMap::new();
        let mut assignment = Assignment::new(num_vars);

        // Variables above the root are unconstrained.
        for v in 1..self.level(f, num_vars) {
            assignment.set_var(v, rng.random_bool(0.5));
        }

        let mut current = f;
        while !self.is_one(current) {
            let v = self.variable(current);
            let (low, high) = (self.low(current), self.high(current));
            let weight_low = self.count_below(low, num_vars, &mut cache) << (self.level(low, num_vars) - v - 1);
            let weight_high = self.count_below(high, num_vars, &mut cache) << (self.level(high, num_vars) - v - 1);

            let take_high = pick_second(rng, &weight_low, &weight_high);
            assignment.set_var(v, take_high);
            let next = if take_high { high } else { low };

            // Variables skipped between `v` and the next node are unconstrained.
            for skipped in (v + 1)..self.level(next, num_vars) {
                assignment.set_var(skipped, rng.random_bool(0.5));
            }
            current = next;
        }

        debug_assert!(assignment.is_complete());
        debug!("random_sat: drew a model over {} variables", num_vars);
        Some(assignment)
    }

    fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Drops every node not reachable from `roots` and compacts the node table.
    ///
    /// Returns the new handles of `roots`, in the same order.
    /// Any other handle obtained before the call is invalidated.
    pub fn collect_garbage(&self, roots: &[Ref]) -> Vec<Ref> {
        self.clear_cache();

        let mut nodes = self.nodes.borrow_mut();
        let mut alive = vec![false; nodes.len()];
        alive[Ref::ZERO.index()] = true;
        alive[Ref::ONE.index()] = true;
        let mut stack = roots.to_vec();
        while let Some(node) = stack.pop() {
            if alive[node.index()] {
                continue;
            }
            alive[node.index()] = true;
            stack.push(nodes[node.index()].low);
            stack.push(nodes[node.index()].high);
        }

        // Children are always allocated before their parents.
        let mut remap = vec![Ref::ZERO; nodes.len()];
        remap[Ref::ONE.index()] = Ref::ONE;
        let mut compacted = vec![nodes[0], nodes[1]];
        let mut unique = self.unique.borrow_mut();
        unique.clear();
        for (i, node) in nodes.iter().enumerate().skip(2) {
            if !alive[i] {
                continue;
            }
            let node = Node {
                variable: node.variable,
                low: remap[node.low.index()],
                high: remap[node.high.index()],
            };
            let id = Ref(compacted.len() as u32);
            compacted.push(node);
            unique.insert(node, id);
            remap[i] = id;
        }

        debug!("collect_garbage: kept {} of {} nodes", compacted.len(), nodes.len());
        *nodes = compacted;
        roots.iter().map(|root| remap[root.index()]).collect()
    }
}

/// Chooses between two weighted options, returning `true` for the second one with
/// probability `b / (a + b)`. The weights are scaled down to 53 bits first.
fn pick_second<R: Rng + ?Sized>(rng: &mut R, a: &BigUint, b: &BigUint) -> bool {
    if *a == BigUint::ZERO {
        return true;
    }
    if *b == BigUint::ZERO {
        return false;
    }

    let bits = a.bits().max(b.bits());
    let shift = bits.saturating_sub(53);
    let scaled = |x: &BigUint| -> u64 { (x >> shift).to_u64_digits().first().copied().unwrap_or(0) };
    let (a, b) = (scaled(a), scaled(b));
    if a + b == 0 {
        return rng.random_bool(0.5);
    }
    rng.random_range(0..a + b) >= a
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_log::test;

    use super::*;

    #[test]
    fn test_terminals() {
        let bdd = Bdd::default();
        assert!(bdd.is_zero(bdd.zero()));
        assert!(bdd.is_one(bdd.one()));
        assert_eq!(bdd.apply_not(bdd.zero()), bdd.one());
        assert_eq!(bdd.num_nodes(), 2);
    }

    #[test]
    fn test_hash_consing() {
        let bdd = Bdd::default();
        let f = bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));
        let g = bdd.apply_and(bdd.mk_var(2), bdd.mk_var(1));
        assert_eq!(f, g);
        assert_eq!(bdd.mk_cube([1, 2]), f);
    }

    #[test]
    fn test_connectives() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let not_x1 = bdd.apply_not(x1);

        assert_eq!(not_x1, bdd.mk_literal(-1));
        assert!(bdd.is_zero(bdd.apply_and(x1, not_x1)));
        assert!(bdd.is_one(bdd.apply_or(x1, not_x1)));
        assert_eq!(bdd.apply_not(not_x1), x1);

        let clause = bdd.mk_clause([1, -2]);
        let expected = bdd.apply_not(bdd.mk_cube([-1, 2]));
        assert_eq!(clause, expected);
    }

    #[test]
    fn test_sat_count() {
        let bdd = Bdd::default();

        assert_eq!(bdd.sat_count(bdd.one(), 3), BigUint::from(8u32));
        assert_eq!(bdd.sat_count(bdd.zero(), 3), BigUint::ZERO);
        assert_eq!(bdd.sat_count(bdd.mk_var(2), 3), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(bdd.mk_cube([1, -3]), 3), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(bdd.mk_clause([1, 2]), 2), BigUint::from(3u32));
        assert_eq!(bdd.sat_count(bdd.mk_clause([1, 3]), 4), BigUint::from(12u32));
    }

    #[test]
    fn test_cache_is_bounded() {
        let bdd = Bdd::with_cache_limit(8);
        let f = bdd.apply_and_many((1..=12).map(|v| bdd.mk_clause([v, -(v % 12 + 1)])));
        assert!(bdd.cache.borrow().len() <= 8);
        assert_eq!(bdd.sat_count(f, 12), BigUint::from(2u32));
    }

    #[test]
    fn test_collect_garbage() {
        let bdd = Bdd::default();
        let f = bdd.apply_and(bdd.mk_clause([1, 2]), bdd.mk_clause([-2, 4]));
        let count = bdd.sat_count(f, 5);
        let live = bdd.num_nodes();

        for v in 1..=5 {
            bdd.mk_cube([v, -(v % 5 + 1), 3]);
        }
        assert!(bdd.num_nodes() > live);

        let roots = bdd.collect_garbage(&[f, bdd.one()]);
        assert_eq!(roots[1], bdd.one());
        let f = roots[0];
        assert!(bdd.num_nodes() <= live);
        assert_eq!(bdd.sat_count(f, 5), count);

        // The unique table still shares structure with the survivors.
        let live = bdd.num_nodes();
        assert_eq!(bdd.apply_and(bdd.mk_clause([1, 2]), bdd.mk_clause([-2, 4])), f);
        assert_eq!(bdd.collect_garbage(&[f]), vec![f]);
        assert_eq!(bdd.num_nodes(), live);
    }

    #[test]
    fn test_random_sat_is_model() {
        let bdd = Bdd::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        // (x1 | x2) & (!x2 | x4), over 5 variables
        let f = bdd.apply_and(bdd.mk_clause([1, 2]), bdd.mk_clause([-2, 4]));
        for _ in 0..50 {
            let model = bdd.random_sat(f, 5, &mut rng).unwrap();
            assert!(model.is_complete());
            let lits = model.to_literal_set();
            let cube = bdd.mk_cube(lits.iter());
            assert!(!bdd.is_zero(bdd.apply_and(f, cube)));
        }
        assert_eq!(bdd.random_sat(bdd.zero(), 5, &mut rng), None);
    }

    #[test]
    fn test_random_sat_covers_all_models() {
        let bdd = Bdd::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let f = bdd.mk_clause([1, 2]);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(bdd.random_sat(f, 2, &mut rng).unwrap().to_literal_set());
        }
        assert_eq!(seen.len(), 3);
    }
}
