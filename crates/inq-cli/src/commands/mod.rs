pub mod audit;
pub mod claim;
pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod migrations;
pub mod query;
pub mod shared;
pub mod submit;
