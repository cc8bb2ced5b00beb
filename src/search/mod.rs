pub mod explicit;
pub mod merge;
pub mod retriever;
pub mod title;
pub mod vector;
