pub mod api;
pub mod config;
pub mod logs;
pub mod mongodb;
pub mod project;
pub mod schema;
pub mod store;
pub mod testcase;
pub mod testing;
