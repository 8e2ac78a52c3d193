pub mod assets;
pub mod auth;
pub mod clients;
pub mod figma;
pub mod files;
pub mod google;
pub mod inspiration;
pub mod invitations;
pub mod public_links;
pub mod slack;
pub mod users;
