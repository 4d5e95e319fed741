//! Rulegraph core library.
//!
//! This library turns a fixed C++ project layout into a graph of compile,
//! link, aggregate and coverage rules, and renders that graph for an external
//! execution engine.

pub mod hasher;
pub mod ir;
pub mod layout;
pub mod ninja_gen;
pub mod paths;
pub mod runner;
pub mod toolchain;
