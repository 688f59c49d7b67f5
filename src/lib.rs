//! LevelUp client core: authenticated API access with transparent token
//! refresh, experience/level progression and the main-screen data flow.

pub mod api;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod progression;
pub mod tasks;
