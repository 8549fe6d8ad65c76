//! Graph representation and algorithms module

pub mod algorithms;
pub mod builder;
pub mod compressed;
pub mod pajek;

pub use builder::ParcelGraph;
pub use compressed::CompressedGraph;
