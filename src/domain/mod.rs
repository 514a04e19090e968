pub mod association;
pub mod benchmark;
pub mod crawler;
pub mod product;
pub mod scope;
