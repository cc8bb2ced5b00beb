pub mod index;
pub mod retrieve;
