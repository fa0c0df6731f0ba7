#![cfg(test)]

pub mod common;
pub mod bootstrap_tests;
pub mod native_tests;
