use reqwest::Url;
use serde_json::json;

use crate::services::webhook::{PayloadBody, Provider, RenderedPayload, StatusTag, WebhookError};

pub const TEAMS_COLOR_UP: &str = "2ECC71";
pub const TEAMS_COLOR_DOWN: &str = "E74C3C";

/// Inputs shared by every payload builder
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub monitor_name: &'a str,
    pub message: &'a str,
    pub status: StatusTag,
}

impl RenderContext<'_> {
    fn title(&self) -> String {
        format!("Service {}: {}", self.status, self.monitor_name)
    }
}

pub type Renderer = fn(&RenderContext<'_>) -> RenderedPayload;

pub struct ProviderRule {
    pub provider: Provider,
    pub hosts: &'static [&'static str],
    pub include_subdomains: bool,
    pub render: Renderer,
}

impl ProviderRule {
    pub fn matches(&self, host: &str) -> bool {
        self.hosts.iter().any(|candidate| {
            host == *candidate
                || (self.include_subdomains
                    && host
                        .strip_suffix(candidate)
                        .is_some_and(|prefix| prefix.ends_with('.')))
        })
    }
}

/// Hostname matchers, checked in order. Unmatched hosts get the generic format.
pub static PROVIDERS: &[ProviderRule] = &[
    ProviderRule {
        provider: Provider::Discord,
        hosts: &["discord.com", "discordapp.com"],
        include_subdomains: true,
        render: render_discord,
    },
    ProviderRule {
        provider: Provider::Slack,
        hosts: &["hooks.slack.com"],
        include_subdomains: false,
        render: render_slack,
    },
    ProviderRule {
        provider: Provider::Teams,
        hosts: &["outlook.office.com", "webhook.office.com"],
        include_subdomains: true,
        render: render_teams,
    },
];

pub fn match_provider(host: &str) -> Option<&'static ProviderRule> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    PROVIDERS.iter().find(|rule| rule.matches(&host))
}

/// Render the payload for whichever provider owns the target URL's host
pub fn render_for_url(url: &str, ctx: &RenderContext<'_>) -> Result<RenderedPayload, WebhookError> {
    let parsed = Url::parse(url).map_err(|e| WebhookError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let host = parsed
        .host_str()
        .ok_or_else(|| WebhookError::MissingHost(url.to_string()))?;

    let render = match_provider(host)
        .map(|rule| rule.render)
        .unwrap_or(render_generic as Renderer);

    Ok(render(ctx))
}

fn render_discord(ctx: &RenderContext<'_>) -> RenderedPayload {
    RenderedPayload {
        provider: Provider::Discord,
        body: PayloadBody::Json(json!({
            "content": format!("**{}:** {}", ctx.status, ctx.message),
        })),
        headers: Vec::new(),
    }
}

fn render_slack(ctx: &RenderContext<'_>) -> RenderedPayload {
    RenderedPayload {
        provider: Provider::Slack,
        body: PayloadBody::Json(json!({
            "text": format!("*{}:* {}", ctx.status, ctx.message),
        })),
        headers: Vec::new(),
    }
}

fn render_teams(ctx: &RenderContext<'_>) -> RenderedPayload {
    let color = match ctx.status {
        StatusTag::Up => TEAMS_COLOR_UP,
        StatusTag::Down => TEAMS_COLOR_DOWN,
    };

    RenderedPayload {
        provider: Provider::Teams,
        body: PayloadBody::Json(json!({
            "@type": "MessageCard",
            "themeColor": color,
            "title": ctx.title(),
            "text": ctx.message,
        })),
        headers: Vec::new(),
    }
}

/// ntfy-style: plain text body, metadata in headers
fn render_generic(ctx: &RenderContext<'_>) -> RenderedPayload {
    let (priority, tags) = match ctx.status {
        StatusTag::Down => ("5", "rotating_light"),
        StatusTag::Up => ("3", "white_check_mark"),
    };

    RenderedPayload {
        provider: Provider::Generic,
        body: PayloadBody::Text(ctx.message.to_string()),
        headers: vec![
            ("Title", ctx.title()),
            ("Priority", priority.to_string()),
            ("Tags", tags.to_string()),
        ],
    }
}
