use std::sync::Arc;
use std::time::Duration;

use brandkit_core::colors::ColorData;
use brandkit_core::models::{AssetCategory, BrandAsset, Client, SlackWorkspace, Visibility};
use brandkit_core::{AppError, StorageBackend};
use brandkit_db::{AssetRepository, ClientRepository, IntegrationRepository};
use brandkit_storage::Storage;
use chrono::Utc;
use rand::RngCore;

use super::blocks::{
    format_color_blocks, format_font_blocks, format_help_blocks, format_logo_blocks, LogoLink,
    SlackMessage,
};
use super::command::{BrandCommand, SlashCommand};

/// Lifetime of logo image links handed to Slack
const LOGO_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Answers slash commands from the assets of the client a workspace is
/// connected to. Only shared assets are ever shown.
#[derive(Clone)]
pub struct SlackService {
    clients: Arc<dyn ClientRepository>,
    assets: Arc<dyn AssetRepository>,
    integrations: Arc<dyn IntegrationRepository>,
    storage: Arc<dyn Storage>,
    /// Where Slack reaches this API, e.g. `https://brand.example.com`
    public_base_url: String,
}

impl SlackService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        assets: Arc<dyn AssetRepository>,
        integrations: Arc<dyn IntegrationRepository>,
        storage: Arc<dyn Storage>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            clients,
            assets,
            integrations,
            storage,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn swatch_base_url(&self) -> String {
        format!("{}/api/slack/swatch", self.public_base_url)
    }

    #[tracing::instrument(skip(self, command), fields(team_id = %command.team_id, text = %command.text))]
    pub async fn handle(&self, command: &SlashCommand) -> Result<SlackMessage, AppError> {
        let Some(workspace) = self
            .integrations
            .get_slack_workspace(&command.team_id)
            .await?
        else {
            return Ok(SlackMessage::plain(
                "This Slack workspace is not connected to a brand yet. Ask an admin to connect it in Brandkit.",
            ));
        };

        let Some(client) = self.clients.get(workspace.client_id).await? else {
            return Ok(SlackMessage::plain(
                "The brand connected to this workspace no longer exists.",
            ));
        };

        if !client.feature_toggles.slack_integration {
            return Ok(SlackMessage::plain(format!(
                "Slack access is turned off for *{}*.",
                client.name
            )));
        }

        let message = match BrandCommand::parse(&command.text) {
            BrandCommand::Colors => self.colors(&client).await?,
            BrandCommand::Logo { variant } => {
                self.logos(&workspace, &client, variant.as_deref()).await?
            }
            BrandCommand::Fonts => self.fonts(&client).await?,
            BrandCommand::Help => {
                SlackMessage::ephemeral("Brand commands", format_help_blocks(&command.command))
            }
            BrandCommand::Unknown(text) => {
                let mut blocks = SlackMessage::plain(format!("Unknown command `{}`.", text)).blocks;
                blocks.extend(format_help_blocks(&command.command));
                SlackMessage::ephemeral(format!("Unknown command {}", text), blocks)
            }
        };

        tracing::info!(client_id = %client.id, blocks = message.blocks.len(), "Slack command answered");
        Ok(message)
    }

    async fn shared(
        &self,
        client: &Client,
        category: AssetCategory,
    ) -> Result<Vec<BrandAsset>, AppError> {
        Ok(self
            .assets
            .list_for_client(client.id, Some(category))
            .await?
            .into_iter()
            .filter(|a| a.visibility == Visibility::Shared)
            .collect())
    }

    async fn colors(&self, client: &Client) -> Result<SlackMessage, AppError> {
        let colors: Vec<ColorData> = self
            .shared(client, AssetCategory::Color)
            .await?
            .iter()
            .filter_map(|a| ColorData::from_asset_data(&a.name, &a.data))
            .collect();
        Ok(SlackMessage::ephemeral(
            format!("{} colors", client.name),
            format_color_blocks(&client.name, &colors, &self.swatch_base_url()),
        ))
    }

    /// A URL Slack can fetch the logo from. Object stores hand out presigned
    /// URLs; local files are only reachable through a short-lived public link.
    async fn logo_url(
        &self,
        workspace: &SlackWorkspace,
        logo: &BrandAsset,
        storage_key: &str,
    ) -> Result<String, AppError> {
        if self.storage.backend_type() != StorageBackend::Local {
            return Ok(self.storage.get_presigned_url(storage_key, LOGO_URL_TTL).await?);
        }

        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let expires_at = Utc::now() + chrono::Duration::seconds(LOGO_URL_TTL.as_secs() as i64);
        let link = self
            .assets
            .create_public_link(
                logo.id,
                logo.client_id,
                &hex::encode(bytes),
                workspace.created_by,
                Some(expires_at),
            )
            .await?;
        Ok(format!("{}/api/public/{}", self.public_base_url, link.token))
    }

    async fn logos(
        &self,
        workspace: &SlackWorkspace,
        client: &Client,
        variant: Option<&str>,
    ) -> Result<SlackMessage, AppError> {
        let variant = variant.map(str::to_lowercase);
        let mut links = Vec::new();
        for logo in self.shared(client, AssetCategory::Logo).await? {
            if let Some(v) = &variant {
                if !logo.name.to_lowercase().contains(v.as_str()) {
                    continue;
                }
            }
            let Some(key) = logo.storage_key.as_deref() else {
                continue;
            };
            let url = self.logo_url(workspace, &logo, key).await?;
            links.push(LogoLink {
                name: logo.name.clone(),
                url,
            });
        }
        Ok(SlackMessage::ephemeral(
            format!("{} logos", client.name),
            format_logo_blocks(&client.name, &links),
        ))
    }

    async fn fonts(&self, client: &Client) -> Result<SlackMessage, AppError> {
        let mut fonts = Vec::new();
        for font in self.shared(client, AssetCategory::Font).await? {
            let mut formats: Vec<String> = font
                .file_name
                .as_deref()
                .and_then(|n| n.rsplit_once('.'))
                .map(|(_, ext)| vec![ext.to_lowercase()])
                .unwrap_or_default();
            for converted in self.assets.list_converted(font.id).await? {
                if !converted.is_dark_variant && !formats.contains(&converted.format) {
                    formats.push(converted.format);
                }
            }
            fonts.push((font.name, formats));
        }
        Ok(SlackMessage::ephemeral(
            format!("{} typography", client.name),
            format_font_blocks(&client.name, &fonts),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkit_core::colors::ColorType;
    use brandkit_core::models::{CreateClientRequest, FeatureToggles, NewBrandAsset, NewSlackWorkspace};
    use brandkit_db::memory::{
        InMemoryAssetRepository, InMemoryClientRepository, InMemoryIntegrationRepository,
    };
    use brandkit_storage::LocalStorage;
    use uuid::Uuid;

    struct Fixture {
        service: SlackService,
        clients: Arc<dyn ClientRepository>,
        assets: Arc<dyn AssetRepository>,
        integrations: Arc<dyn IntegrationRepository>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost/uploads".to_string())
                .await
                .unwrap(),
        );
        let clients: Arc<dyn ClientRepository> = Arc::new(InMemoryClientRepository::default());
        let assets: Arc<dyn AssetRepository> = Arc::new(InMemoryAssetRepository::default());
        let integrations: Arc<dyn IntegrationRepository> =
            Arc::new(InMemoryIntegrationRepository::default());
        let service = SlackService::new(
            clients.clone(),
            assets.clone(),
            integrations.clone(),
            storage,
            "http://localhost/",
        );
        Fixture {
            service,
            clients,
            assets,
            integrations,
            _dir: dir,
        }
    }

    async fn connected_client(f: &Fixture, slack_enabled: bool) -> Client {
        let client = f
            .clients
            .create(
                &CreateClientRequest {
                    name: "Acme".to_string(),
                    description: None,
                    website: None,
                    primary_color: None,
                    feature_toggles: Some(FeatureToggles {
                        slack_integration: slack_enabled,
                        ..Default::default()
                    }),
                },
                None,
            )
            .await
            .unwrap();
        f.integrations
            .upsert_slack_workspace(NewSlackWorkspace {
                team_id: "T1".to_string(),
                client_id: client.id,
                bot_token: None,
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
        client
    }

    async fn add_color(f: &Fixture, client: &Client, name: &str, hex: &str, visibility: Visibility) {
        let color = ColorData::from_hex(name, hex, ColorType::Brand).unwrap();
        f.assets
            .create(NewBrandAsset {
                id: Uuid::new_v4(),
                client_id: client.id,
                name: name.to_string(),
                category: AssetCategory::Color,
                visibility,
                data: color.to_json(),
                file_name: None,
                mime_type: None,
                file_size: None,
                storage_key: None,
                uploaded_by: None,
            })
            .await
            .unwrap();
    }

    fn command(text: &str) -> SlashCommand {
        SlashCommand {
            team_id: "T1".to_string(),
            command: "/brand".to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unknown_workspace_gets_setup_hint() {
        let f = fixture().await;
        let message = f.service.handle(&command("colors")).await.unwrap();
        assert!(message.text.contains("not connected"));
    }

    #[tokio::test]
    async fn colors_lists_only_shared_colors() {
        let f = fixture().await;
        let client = connected_client(&f, true).await;
        add_color(&f, &client, "Red", "#FF0000", Visibility::Shared).await;
        add_color(&f, &client, "Secret", "#00FF00", Visibility::Private).await;

        let message = f.service.handle(&command("colors")).await.unwrap();
        let rendered = serde_json::to_string(&message.blocks).unwrap();
        assert!(rendered.contains("*Red*"));
        assert!(!rendered.contains("Secret"));
        assert_eq!(message.response_type, "ephemeral");
    }

    #[tokio::test]
    async fn disabled_integration_is_reported() {
        let f = fixture().await;
        connected_client(&f, false).await;
        let message = f.service.handle(&command("colors")).await.unwrap();
        assert!(message.text.contains("turned off"));
    }

    #[tokio::test]
    async fn local_logos_link_through_public_links() {
        let f = fixture().await;
        let client = connected_client(&f, true).await;
        let logo = f
            .assets
            .create(NewBrandAsset {
                id: Uuid::new_v4(),
                client_id: client.id,
                name: "Primary".to_string(),
                category: AssetCategory::Logo,
                visibility: Visibility::Shared,
                data: serde_json::json!({}),
                file_name: Some("primary.png".to_string()),
                mime_type: Some("image/png".to_string()),
                file_size: Some(68),
                storage_key: Some(format!("clients/{}/assets/primary.png", client.id)),
                uploaded_by: None,
            })
            .await
            .unwrap();

        let message = f.service.handle(&command("logo")).await.unwrap();
        let rendered = serde_json::to_string(&message.blocks).unwrap();
        let prefix = "http://localhost/api/public/";
        let start = rendered.find(prefix).expect("logo url") + prefix.len();
        let token: String = rendered[start..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();

        let link = f
            .assets
            .get_public_link_by_token(&token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.asset_id, logo.id);
        assert!(link.expires_at.is_some());
        assert!(!rendered.contains("/clients/"));
    }
}
