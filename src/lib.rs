//! REST backend for user accounts and their address books.
//!
//! Accounts register, confirm their email through a mailed link, log in for
//! a 20-hour bearer session and may upload an avatar. Every contact belongs
//! to exactly one account.

pub mod app;
pub mod auth;
pub mod avatars;
pub mod config;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod mail;
pub mod state;

pub use state::AppState;
