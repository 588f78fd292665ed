pub mod admin;
pub mod api;
pub mod auth;
pub mod awards;
pub mod collections;
pub mod config;
pub mod content;
pub mod controller;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod manage_members;
pub mod notify;
pub mod poll;
pub mod publishing;
pub mod services;
pub mod surreal;
pub mod typeahead;
