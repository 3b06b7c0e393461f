//! Index-ordered (positional) assignments.
//!
//! Slot `v - 1` holds the literal assigned to variable `v`, or `0` if the variable is
//! still unassigned. This is the layout the sampler fills in while walking a BDD;
//! finished assignments are handed out as natural-order [`LiteralSet`]s.

use crate::literal::LiteralSet;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Assignment {
    values: Vec<i32>,
}

impl Assignment {
    /// Creates an empty assignment over variables `1..=num_variables`.
    pub fn new(num_variables: u32) -> Self {
        Self {
            values: vec![0; num_variables as usize],
        }
    }

    pub fn num_variables(&self) -> u32 {
        self.values.len() as u32
    }

    /// The literal assigned to `var`, or `0` if unassigned.
    pub fn get(&self, var: u32) -> i32 {
        assert_ne!(var, 0, "Variable index should not be zero");
        self.values[(var - 1) as usize]
    }

    /// Assigns `literal`, returning the previous value of its slot.
    pub fn set(&mut self, literal: i32) -> i32 {
        assert_ne!(literal, 0, "Literal 0 is not a valid literal");
        let slot = (literal.unsigned_abs() - 1) as usize;
        assert!(slot < self.values.len(), "Variable {} is out of range", literal.unsigned_abs());
        std::mem::replace(&mut self.values[slot], literal)
    }

    /// Assigns `var` positively or negatively.
    pub fn set_var(&mut self, var: u32, value: bool) {
        let lit = var as i32;
        self.set(if value { lit } else { -lit });
    }

    /// Returns `true` if every variable is assigned.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|&v| v != 0)
    }

    /// The assigned literals in natural order; unassigned slots are dropped.
    pub fn to_literal_set(&self) -> LiteralSet {
        self.values.iter().copied().filter(|&v| v != 0).collect()
    }
}
