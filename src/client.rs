use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::ScrapeConfig;
use crate::error::{Result, ScorpionError};
use crate::fetch::PageSource;
use crate::model::PlayerRankingPoint;
use crate::scraper;

/// HTTP access to the scraped sites.
///
/// `ScorpionClient` wraps a [`reqwest::Client`] and is the production
/// [`PageSource`] behind every stage.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> scorpion_scraper::Result<()> {
/// use scorpion_scraper::{ScorpionClient, ScrapeConfig};
///
/// let client = ScorpionClient::from_config(&ScrapeConfig::default())?;
/// let history = client.get_player_ranking(655257).await?;
/// println!("{} months of ranking history", history.len());
/// # Ok(())
/// # }
/// ```
pub struct ScorpionClient {
    http: reqwest::Client,
    timeout: Duration,
    ranking_base_url: String,
}

impl ScorpionClient {
    /// Build a client with the user agent and timeout of `config`.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(ScorpionError::Client)?;
        Ok(Self {
            http,
            timeout: config.timeout,
            ranking_base_url: config.ranking_base_url.clone(),
        })
    }

    /// Create a client using the provided [`reqwest::Client`].
    ///
    /// Use this when you need to configure proxies, headers, etc.
    pub fn with_client(client: reqwest::Client, config: &ScrapeConfig) -> Self {
        Self {
            http: client,
            timeout: config.timeout,
            ranking_base_url: config.ranking_base_url.clone(),
        }
    }

    /// Fetch the monthly ranking history of one player by ITHF id.
    #[instrument(skip(self))]
    pub async fn get_player_ranking(&self, ithf_id: u32) -> Result<Vec<PlayerRankingPoint>> {
        let url = scraper::ranking::player_ranking_url(&self.ranking_base_url, ithf_id);
        let body = self.fetch(&url).await?;
        let document = scraper::parse_document(&body);
        let points: Vec<_> = scraper::ranking::parse_player_ranking(&document)?.collect();
        debug!(count = points.len(), ithf_id, "parsed player ranking");
        Ok(points)
    }
}

#[async_trait]
impl PageSource for ScorpionClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "fetching page");

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScorpionError::Timeout {
                    url: url.to_owned(),
                    after: self.timeout,
                }
            } else {
                ScorpionError::Http {
                    url: url.to_owned(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScorpionError::UnexpectedStatus {
                url: url.to_owned(),
                status,
            });
        }

        response.text().await.map_err(|e| ScorpionError::ResponseBody {
            url: url.to_owned(),
            source: e,
        })
    }
}
