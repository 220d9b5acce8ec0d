#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate maplit;

pub mod ast;
pub mod frontend;
pub mod interpreter;
pub mod ir;
pub mod position;
pub mod schema;
pub mod surface;
