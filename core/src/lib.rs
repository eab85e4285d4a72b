pub mod model;
pub mod repository;
pub mod search;
pub mod storage;
