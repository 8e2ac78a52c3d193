use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use tokio::process::Command;

use super::ConversionError;

/// FontForge script: open the first argument, generate the second.
/// The output format follows the output file's extension.
const FONTFORGE_SCRIPT: &str = "Open($1); Generate($2)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    Ttf,
    Otf,
    Woff,
    Woff2,
    Eot,
}

impl FontFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FontFormat::Ttf => "ttf",
            FontFormat::Otf => "otf",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
            FontFormat::Eot => "eot",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FontFormat::Ttf => "font/ttf",
            FontFormat::Otf => "font/otf",
            FontFormat::Woff => "font/woff",
            FontFormat::Woff2 => "font/woff2",
            FontFormat::Eot => "application/vnd.ms-fontobject",
        }
    }

    /// Detect from the file extension first, then the MIME type
    pub fn detect(file_name: &str, mime_type: &str) -> Option<Self> {
        file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| ext.parse().ok())
            .or_else(|| match mime_type.to_ascii_lowercase().as_str() {
                "font/ttf" | "application/x-font-ttf" | "application/font-sfnt" => {
                    Some(FontFormat::Ttf)
                }
                "font/otf" | "application/x-font-otf" => Some(FontFormat::Otf),
                "font/woff" | "application/font-woff" => Some(FontFormat::Woff),
                "font/woff2" => Some(FontFormat::Woff2),
                "application/vnd.ms-fontobject" => Some(FontFormat::Eot),
                _ => None,
            })
    }
}

impl FromStr for FontFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ttf" => Ok(FontFormat::Ttf),
            "otf" => Ok(FontFormat::Otf),
            "woff" => Ok(FontFormat::Woff),
            "woff2" => Ok(FontFormat::Woff2),
            "eot" => Ok(FontFormat::Eot),
            other => Err(ConversionError::UnsupportedFormat(format!(
                "'{}' is not a supported font format (ttf, otf, woff, woff2, eot)",
                other
            ))),
        }
    }
}

/// Converts fonts by running FontForge in a scratch directory
#[derive(Debug, Clone)]
pub struct FontConverter {
    fontforge_path: PathBuf,
    timeout: Duration,
}

impl FontConverter {
    pub fn new(fontforge_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            fontforge_path: fontforge_path.into(),
            timeout,
        }
    }

    #[tracing::instrument(skip(self, data), fields(source = source.extension(), target = target.extension(), bytes = data.len()))]
    pub async fn convert(
        &self,
        data: &[u8],
        source: FontFormat,
        target: FontFormat,
    ) -> Result<Vec<u8>, ConversionError> {
        if source == target {
            return Ok(data.to_vec());
        }

        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(format!("input.{}", source.extension()));
        let output = workdir.path().join(format!("output.{}", target.extension()));
        tokio::fs::write(&input, data).await?;

        let started = std::time::Instant::now();
        let child = Command::new(&self.fontforge_path)
            .arg("-lang=ff")
            .arg("-c")
            .arg(FONTFORGE_SCRIPT)
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ConversionError::FontForge(format!(
                    "could not start {}: {}",
                    self.fontforge_path.display(),
                    e
                ))
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConversionError::Timeout(self.timeout.as_secs()))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::warn!(status = ?result.status.code(), stderr = %stderr.trim(), "FontForge exited with an error");
            return Err(ConversionError::FontForge(stderr.trim().to_string()));
        }

        let converted = tokio::fs::read(&output).await.map_err(|_| {
            ConversionError::FontForge(format!(
                "no {} output produced: {}",
                target.extension(),
                String::from_utf8_lossy(&result.stderr).trim()
            ))
        })?;

        tracing::info!(
            duration_ms = started.elapsed().as_millis() as u64,
            output_bytes = converted.len(),
            "Font converted"
        );

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension_then_mime() {
        assert_eq!(FontFormat::detect("Brand.WOFF2", ""), Some(FontFormat::Woff2));
        assert_eq!(
            FontFormat::detect("font", "application/vnd.ms-fontobject"),
            Some(FontFormat::Eot)
        );
        assert_eq!(FontFormat::detect("readme.txt", "text/plain"), None);
    }

    #[tokio::test]
    async fn same_format_is_passthrough() {
        let converter = FontConverter::new("/nonexistent/fontforge", Duration::from_secs(1));
        let out = converter
            .convert(b"font-bytes", FontFormat::Ttf, FontFormat::Ttf)
            .await
            .unwrap();
        assert_eq!(out, b"font-bytes");
    }

    #[tokio::test]
    async fn missing_binary_is_a_fontforge_error() {
        let converter = FontConverter::new("/nonexistent/fontforge", Duration::from_secs(1));
        let err = converter
            .convert(b"font-bytes", FontFormat::Ttf, FontFormat::Woff)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::FontForge(_)));
    }
}
