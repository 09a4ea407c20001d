pub mod embedder;
pub mod imagegen;
