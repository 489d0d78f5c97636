pub mod app;
pub mod cli;
pub mod form;
pub mod geo;
pub mod map;
pub mod render;
pub mod storage;
pub mod types;
pub mod utils;
