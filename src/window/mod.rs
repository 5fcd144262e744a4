//! Window Builder: fixed-size overlapping windows with edge padding.

mod assembler;
mod plan;
mod types;


pub use assembler::WindowAssembler;
pub use plan::WindowPlan;
pub use types::Window;
