//! Program Module
//!
//! Everything between program source text and a callable function.
//!
//! ## Submodules
//! - **`types`**: Declared types (`TypeId`), runtime values and host tensors.
//! - **`compiler`**: The `Compiler` seam and the text format compiler.
//! - **`artifact`**: Compiled buffers, the program image and opened artifacts.

pub mod artifact;
pub mod compiler;
pub mod types;

#[cfg(test)]
mod tests;
