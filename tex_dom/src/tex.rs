/*! Data structures TeX computes with: category codes, tokens, numeric values and the
    document tree that is the interpreter's output. */

pub mod catcodes;
pub mod tokens;
pub mod numerics;
pub mod nodes;
