pub mod benchmark;
pub mod config;
pub mod crawler;
pub mod product;
