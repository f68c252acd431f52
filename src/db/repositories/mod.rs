pub mod asset;
pub mod audit;
pub mod maintenance;
pub mod report;
pub mod user;
