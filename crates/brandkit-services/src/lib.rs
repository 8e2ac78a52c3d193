//! Brandkit Services Layer
//!
//! Business services shared by the HTTP API: on-demand asset conversion,
//! the Slack slash-command bot, Figma color sync, Google Drive import and
//! invitation mail. Handlers in `brandkit-api` stay thin and call into here.

pub mod conversion;
pub mod figma;
pub mod google_drive;
pub mod mailer;
pub mod slack;

pub use conversion::{
    AssetConverter, ConversionError, FileRequest, FontConverter, FontFormat, LogoConverter,
    LogoFormat, LogoOptions, ServedFile,
};
pub use figma::{sync_colors, FigmaClient, SyncSummary};
pub use google_drive::{
    import_files, DriveFile, GoogleDriveClient, ImportContext, ImportEvent, TokenResponse,
};
pub use mailer::{mailer_from_config, InvitationEmail, InvitationMailer, LogMailer, SmtpMailer};
pub use slack::{
    format_color_blocks, verify_signature, BrandCommand, SlackError, SlackMessage, SlackService,
    SlashCommand,
};
