#![allow(dead_code)]

pub mod fake_backend;
pub mod sample_notebooks;

pub use fake_backend::FakeBackend;
pub use sample_notebooks::*;
