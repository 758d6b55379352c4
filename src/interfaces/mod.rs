//! Presentation-facing surfaces. The engine itself never formats anything;
//! this layer calls the operations and prints the published snapshots.

pub mod cli;
