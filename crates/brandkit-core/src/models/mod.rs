//! Data models, organized by domain.

mod asset;
mod client;
mod inspiration;
mod integration;
mod invitation;
mod user;

pub use asset::*;
pub use client::*;
pub use inspiration::*;
pub use integration::*;
pub use invitation::*;
pub use user::*;
