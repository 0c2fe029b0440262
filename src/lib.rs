// Host side of the cooperative scheduler: demo tasks, a debug
// console and a std clock.

pub mod apps;
pub mod clock;
pub mod console;

pub use megasched_kernel as kernel;
