//! Slack slash-command bot: request signing, command parsing, Block Kit
//! formatting and the service that answers commands from a client's assets.

mod blocks;
mod command;
mod service;
mod signature;

pub use blocks::{
    format_color_blocks, format_font_blocks, format_help_blocks, format_logo_blocks, LogoLink,
    SlackMessage, MAX_BLOCKS,
};
pub use command::{BrandCommand, SlashCommand};
pub use service::SlackService;
pub use signature::{verify_signature, REPLAY_WINDOW_SECS};

use brandkit_core::AppError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlackError {
    #[error("Missing Slack signature headers")]
    MissingHeaders,

    #[error("Slack request timestamp is outside the replay window")]
    StaleTimestamp,

    #[error("Slack signature mismatch")]
    InvalidSignature,

    #[error("Malformed slash command: {0}")]
    InvalidPayload(String),
}

impl From<SlackError> for AppError {
    fn from(err: SlackError) -> Self {
        match err {
            SlackError::InvalidPayload(msg) => AppError::BadRequest(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}
