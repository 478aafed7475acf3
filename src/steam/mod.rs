//! Steam module - trade offers and inventories over the Web API and community site

pub mod auth;
pub mod client;
pub mod messages;
pub mod rest;

pub use auth::CommunitySession;
pub use client::SteamTradingClient;
pub use rest::SteamRestClient;
