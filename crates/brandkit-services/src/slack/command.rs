use super::SlackError;

/// Fields of a slash-command POST we act on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashCommand {
    pub team_id: String,
    pub user_id: String,
    pub command: String,
    pub text: String,
    pub response_url: Option<String>,
}

impl SlashCommand {
    /// Parse the `application/x-www-form-urlencoded` body Slack posts
    pub fn from_form_body(body: &[u8]) -> Result<Self, SlackError> {
        let body = std::str::from_utf8(body)
            .map_err(|_| SlackError::InvalidPayload("body is not UTF-8".to_string()))?;

        let mut command = SlashCommand::default();
        for pair in body.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value)?;
            match key {
                "team_id" => command.team_id = value,
                "user_id" => command.user_id = value,
                "command" => command.command = value,
                "text" => command.text = value,
                "response_url" => command.response_url = Some(value).filter(|v| !v.is_empty()),
                _ => {}
            }
        }

        if command.team_id.is_empty() {
            return Err(SlackError::InvalidPayload("team_id is required".to_string()));
        }
        Ok(command)
    }
}

fn decode_component(value: &str) -> Result<String, SlackError> {
    urlencoding::decode(&value.replace('+', " "))
        .map(|v| v.into_owned())
        .map_err(|_| SlackError::InvalidPayload("invalid percent-encoding".to_string()))
}

/// What the user asked the bot for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrandCommand {
    Colors,
    Logo { variant: Option<String> },
    Fonts,
    Help,
    Unknown(String),
}

impl BrandCommand {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (head, rest) = text
            .split_once(char::is_whitespace)
            .map(|(h, r)| (h, r.trim()))
            .unwrap_or((text, ""));

        match head.to_ascii_lowercase().as_str() {
            "" | "help" => BrandCommand::Help,
            "colors" | "colours" | "color" | "colour" | "palette" => BrandCommand::Colors,
            "logo" | "logos" => BrandCommand::Logo {
                variant: Some(rest.to_string()).filter(|v| !v.is_empty()),
            },
            "fonts" | "font" | "typography" | "type" => BrandCommand::Fonts,
            _ => BrandCommand::Unknown(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_body() {
        let body = b"token=t&team_id=T123&user_id=U9&command=%2Fbrand&text=logo+dark+mode&response_url=https%3A%2F%2Fhooks.slack.com%2Fx";
        let cmd = SlashCommand::from_form_body(body).unwrap();
        assert_eq!(cmd.team_id, "T123");
        assert_eq!(cmd.command, "/brand");
        assert_eq!(cmd.text, "logo dark mode");
        assert_eq!(cmd.response_url.as_deref(), Some("https://hooks.slack.com/x"));
    }

    #[test]
    fn team_id_is_required() {
        assert!(SlashCommand::from_form_body(b"text=colors").is_err());
    }

    #[test]
    fn parses_commands() {
        assert_eq!(BrandCommand::parse(""), BrandCommand::Help);
        assert_eq!(BrandCommand::parse("  Colors "), BrandCommand::Colors);
        assert_eq!(BrandCommand::parse("palette"), BrandCommand::Colors);
        assert_eq!(
            BrandCommand::parse("logo  dark"),
            BrandCommand::Logo {
                variant: Some("dark".to_string())
            }
        );
        assert_eq!(BrandCommand::parse("logos"), BrandCommand::Logo { variant: None });
        assert_eq!(BrandCommand::parse("typography"), BrandCommand::Fonts);
        assert_eq!(
            BrandCommand::parse("weather today"),
            BrandCommand::Unknown("weather today".to_string())
        );
    }
}
