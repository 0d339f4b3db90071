//! REST directory implementation.
//!
//! Implements the [`Directory`] trait over the platform's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{DirectoryError, DirectoryResult};
use crate::ids::{GuildId, MemberId, RoleId};
use crate::traits::Directory;
use crate::types::{GuildInfo, MemberPage, MemberRecord, PageRequest, RoleInfo};

/// Configuration for the REST directory client.
#[derive(Clone)]
pub struct RestConfig {
    /// Base URL of the directory API.
    pub base_url: String,
    /// Bot token used for authentication.
    pub token: String,
    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl RestConfig {
    /// Create a configuration with default endpoint and timeouts.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: "https://discord.com/api/v10".to_string(),
            token: token.into(),
            read_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn validate(&self) -> DirectoryResult<()> {
        if self.token.trim().is_empty() {
            return Err(DirectoryError::authentication("empty bot token"));
        }
        if self.base_url.trim().is_empty() {
            return Err(DirectoryError::decode("empty base URL"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Directory backed by the platform's REST API.
#[derive(Debug)]
pub struct RestDirectory {
    config: RestConfig,
    client: Client,
}

impl RestDirectory {
    /// Create a new REST directory client.
    pub fn new(config: RestConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| DirectoryError::network("failed to build HTTP client", e))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> DirectoryResult<Response> {
        request
            .header("Authorization", format!("Bot {}", self.config.token))
            .send()
            .await
            .map_err(|e| DirectoryError::network("request failed", e))
    }

    /// Map a non-success status to the error taxonomy.
    ///
    /// 404 carries the entity kind and id of the call site so the caller can
    /// recover at the right granularity.
    async fn check_status(
        response: Response,
        entity: &'static str,
        id: impl ToString,
    ) -> DirectoryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        trace!(status = status.as_u16(), body = %body, "non-success response");

        match status {
            StatusCode::NOT_FOUND => Err(DirectoryError::not_found(entity, id.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                DirectoryError::authentication(format!("status {}: {body}", status.as_u16())),
            ),
            _ => Err(DirectoryError::api(status.as_u16(), body)),
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> DirectoryResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| DirectoryError::decode(e.to_string()))
    }
}

#[async_trait]
impl Directory for RestDirectory {
    async fn fetch_guild(&self, guild_id: GuildId) -> DirectoryResult<GuildInfo> {
        let request = self.client.get(self.url(&format!("/guilds/{guild_id}")));
        let response = self.send(request).await?;
        let response = Self::check_status(response, "guild", guild_id).await?;
        let wire: WireGuild = Self::decode(response).await?;
        wire.into_info()
    }

    async fn get_role(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> DirectoryResult<Option<RoleInfo>> {
        let request = self
            .client
            .get(self.url(&format!("/guilds/{guild_id}/roles")));
        let response = self.send(request).await?;
        let response = Self::check_status(response, "guild", guild_id).await?;
        let wire: Vec<WireRole> = Self::decode(response).await?;

        for role in wire {
            let info = role.into_info()?;
            if info.id == role_id {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }

    async fn fetch_member(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
    ) -> DirectoryResult<MemberRecord> {
        let request = self
            .client
            .get(self.url(&format!("/guilds/{guild_id}/members/{member_id}")));
        let response = self.send(request).await?;
        let response = Self::check_status(response, "member", member_id).await?;
        let wire: WireMember = Self::decode(response).await?;
        wire.into_record()
    }

    async fn list_members(
        &self,
        guild_id: GuildId,
        page: PageRequest,
    ) -> DirectoryResult<MemberPage> {
        let limit = page.limit.min(PageRequest::MAX_LIMIT);
        let mut request = self
            .client
            .get(self.url(&format!("/guilds/{guild_id}/members")))
            .query(&[("limit", limit.to_string())]);
        if let Some(after) = page.after {
            request = request.query(&[("after", after.to_string())]);
        }

        let response = self.send(request).await?;
        let response = Self::check_status(response, "guild", guild_id).await?;
        let wire: Vec<WireMember> = Self::decode(response).await?;

        let members = wire
            .into_iter()
            .map(WireMember::into_record)
            .collect::<DirectoryResult<Vec<_>>>()?;

        // A full page means there may be more; the last id is the cursor.
        let next = if members.len() == limit {
            members.last().map(|m| m.id)
        } else {
            None
        };

        debug!(%guild_id, count = members.len(), "listed member page");
        Ok(MemberPage { members, next })
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> DirectoryResult<()> {
        let request = self.client.put(self.url(&format!(
            "/guilds/{guild_id}/members/{member_id}/roles/{role_id}"
        )));
        let response = self.send(request).await?;
        Self::check_status(response, "member", member_id).await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        role_id: RoleId,
    ) -> DirectoryResult<()> {
        let request = self.client.delete(self.url(&format!(
            "/guilds/{guild_id}/members/{member_id}/roles/{role_id}"
        )));
        let response = self.send(request).await?;
        Self::check_status(response, "member", member_id).await?;
        Ok(())
    }
}

// Wire DTOs. The platform serializes snowflakes as JSON strings.

#[derive(Debug, Deserialize)]
struct WireGuild {
    id: String,
    name: String,
}

impl WireGuild {
    fn into_info(self) -> DirectoryResult<GuildInfo> {
        Ok(GuildInfo {
            id: parse_snowflake(&self.id)?.into(),
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireRole {
    id: String,
    name: String,
}

impl WireRole {
    fn into_info(self) -> DirectoryResult<RoleInfo> {
        Ok(RoleInfo {
            id: parse_snowflake(&self.id)?.into(),
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireMember {
    user: WireUser,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
}

impl WireMember {
    fn into_record(self) -> DirectoryResult<MemberRecord> {
        let id = MemberId::new(parse_snowflake(&self.user.id)?);
        let role_ids = self
            .roles
            .iter()
            .map(|r| parse_snowflake(r).map(RoleId::new))
            .collect::<DirectoryResult<_>>()?;
        Ok(MemberRecord { id, role_ids })
    }
}

fn parse_snowflake(raw: &str) -> DirectoryResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| DirectoryError::decode(format!("invalid snowflake: {raw}")))
}
