//! Reqwest-backed implementation of the campaign service.

pub mod client;

pub use client::HttpCampaignService;
