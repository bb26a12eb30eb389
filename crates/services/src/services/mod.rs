pub mod backend_migration;
pub mod config;
pub mod critical;
pub mod dashboard;
pub mod health_score;
pub mod pagination;
pub mod projects;
pub mod remote_store;
pub mod seed;
pub mod site_stats;
pub mod sites;
pub mod solar_metrics;
pub mod validation;
