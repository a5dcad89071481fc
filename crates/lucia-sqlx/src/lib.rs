#![doc = include_str!("../README.md")]

pub mod adapter;

pub use adapter::SqlxAdapter;
