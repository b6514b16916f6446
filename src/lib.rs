pub mod app;
pub mod auth;
pub mod communities;
pub mod config;
pub mod digest;
pub mod discover;
pub mod error;
pub mod invites;
pub mod items;
pub mod leases;
pub mod requests;
pub mod state;
pub mod subscriptions;
pub mod telemetry;
pub mod validation;
