// src/market/mod.rs
pub mod book;
pub mod generator;
