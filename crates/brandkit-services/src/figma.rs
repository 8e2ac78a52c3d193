//! Figma REST client and the color-style sync into color assets

use std::collections::HashMap;
use std::time::Duration;

use brandkit_core::colors::{ColorData, ColorType, Rgb};
use brandkit_core::models::{AssetCategory, NewBrandAsset, UpdateAssetRequest, Visibility};
use brandkit_core::AppError;
use brandkit_db::AssetRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FIGMA_API_BASE: &str = "https://api.figma.com";

/// Figma node ids per request; keeps the query string reasonable
const NODE_BATCH: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct FigmaStyle {
    pub key: String,
    pub node_id: String,
    pub style_type: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct StylesResponse {
    meta: StylesMeta,
}

#[derive(Debug, Deserialize)]
struct StylesMeta {
    #[serde(default)]
    styles: Vec<FigmaStyle>,
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    nodes: HashMap<String, Option<NodeEntry>>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    document: FigmaNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FigmaNode {
    pub id: String,
    #[serde(default)]
    pub fills: Vec<FigmaPaint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FigmaPaint {
    #[serde(rename = "type")]
    pub paint_type: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub color: Option<FigmaColor>,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FigmaColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl FigmaNode {
    /// Color of the first visible solid fill
    pub fn solid_color(&self) -> Option<Rgb> {
        self.fills
            .iter()
            .find(|p| p.visible && p.paint_type == "SOLID")
            .and_then(|p| p.color)
            .map(|c| Rgb::from_unit_floats(c.r, c.g, c.b))
    }
}

#[derive(Clone)]
pub struct FigmaClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl FigmaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create Figma HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        access_token: &str,
        path: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .header("X-Figma-Token", access_token)
            .send()
            .await
            .map_err(|e| figma_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Figma API error");
            return Err(match status.as_u16() {
                401 | 403 => AppError::InvalidOAuthToken("Figma rejected the access token".to_string()),
                404 => AppError::NotFound("Figma file not found".to_string()),
                _ => figma_error(format!("HTTP {}", status.as_u16())),
            });
        }

        response
            .json()
            .await
            .map_err(|e| figma_error(format!("unexpected response: {}", e)))
    }

    #[tracing::instrument(skip(self, access_token))]
    pub async fn get_file_styles(
        &self,
        access_token: &str,
        file_key: &str,
    ) -> Result<Vec<FigmaStyle>, AppError> {
        let response: StylesResponse = self
            .get_json(access_token, &format!("/v1/files/{}/styles", urlencoding::encode(file_key)))
            .await?;
        Ok(response.meta.styles)
    }

    #[tracing::instrument(skip(self, access_token, ids), fields(count = ids.len()))]
    pub async fn get_nodes(
        &self,
        access_token: &str,
        file_key: &str,
        ids: &[String],
    ) -> Result<Vec<FigmaNode>, AppError> {
        let mut nodes = Vec::with_capacity(ids.len());
        for batch in ids.chunks(NODE_BATCH) {
            let response: NodesResponse = self
                .get_json(
                    access_token,
                    &format!(
                        "/v1/files/{}/nodes?ids={}",
                        urlencoding::encode(file_key),
                        urlencoding::encode(&batch.join(","))
                    ),
                )
                .await?;
            nodes.extend(response.nodes.into_values().flatten().map(|n| n.document));
        }
        Ok(nodes)
    }
}

fn figma_error(message: String) -> AppError {
    AppError::Integration {
        service: "Figma",
        message,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// `Brand/Primary` → ("Primary", Brand). The style folder picks the group.
fn split_style_name(style_name: &str) -> (String, ColorType) {
    let lowered = style_name.to_lowercase();
    let color_type = if ["neutral", "gray", "grey", "mono"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        ColorType::Neutral
    } else if ["interactive", "link", "button", "state", "action"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        ColorType::Interactive
    } else {
        ColorType::Brand
    };
    let name = style_name
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(style_name.trim())
        .to_string();
    (name, color_type)
}

/// Pull FILL styles from a Figma file into the client's color assets.
/// Colors are matched by name; unchanged colors are skipped.
#[tracing::instrument(skip(figma, assets, access_token), fields(client_id = %client_id))]
pub async fn sync_colors(
    figma: &FigmaClient,
    assets: &dyn AssetRepository,
    client_id: Uuid,
    access_token: &str,
    file_key: &str,
    uploaded_by: Option<Uuid>,
) -> Result<SyncSummary, AppError> {
    let styles: Vec<FigmaStyle> = figma
        .get_file_styles(access_token, file_key)
        .await?
        .into_iter()
        .filter(|s| s.style_type == "FILL")
        .collect();

    let mut summary = SyncSummary::default();
    if styles.is_empty() {
        return Ok(summary);
    }

    let ids: Vec<String> = styles.iter().map(|s| s.node_id.clone()).collect();
    let nodes: HashMap<String, FigmaNode> = figma
        .get_nodes(access_token, file_key, &ids)
        .await?
        .into_iter()
        .map(|n| (n.id.clone(), n))
        .collect();

    for style in &styles {
        let Some(rgb) = nodes.get(&style.node_id).and_then(FigmaNode::solid_color) else {
            summary.skipped += 1;
            continue;
        };
        let (name, color_type) = split_style_name(&style.name);
        let color = ColorData::from_rgb(&name, rgb, color_type);

        match assets
            .find_by_name(client_id, AssetCategory::Color, &name)
            .await?
        {
            Some(existing) => {
                let current = ColorData::from_asset_data(&existing.name, &existing.data);
                if current.as_ref() == Some(&color) {
                    summary.skipped += 1;
                    continue;
                }
                assets
                    .update(
                        existing.id,
                        &UpdateAssetRequest {
                            data: Some(color.to_json()),
                            ..Default::default()
                        },
                    )
                    .await?;
                summary.updated += 1;
            }
            None => {
                assets
                    .create(NewBrandAsset {
                        id: Uuid::new_v4(),
                        client_id,
                        name: name.clone(),
                        category: AssetCategory::Color,
                        visibility: Visibility::Shared,
                        data: color.to_json(),
                        file_name: None,
                        mime_type: None,
                        file_size: None,
                        storage_key: None,
                        uploaded_by,
                    })
                    .await?;
                summary.created += 1;
            }
        }
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "Figma color sync finished"
    );
    Ok(summary)
}
