use crate::sanitizer::SanitizedText;
use crate::traits::RemoteQuery;
use crate::types::{ArticleDraft, ClientConfig, GroundingSource, MarketIndex, NewsResponse, PulseError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_SOURCE_TITLE: &str = "Source";

const INDICES_PROMPT: &str = "Get the very latest values for KOSPI, KOSDAQ, S&P 500, NASDAQ, and USD/KRW exchange rate. Return them in a strict JSON array.";

/// [`RemoteQuery`] over the Gemini `generateContent` REST endpoint, with
/// Google Search grounding enabled on every request.
pub struct GeminiClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .build()?;

        // `Url::join` replaces the last path segment unless the base ends in '/'.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("v1beta/models/{}:generateContent", model))?)
    }

    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model)?;
        debug!("Calling {} ({})", model, url.path());

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned HTTP {}", model, status);
            return Err(PulseError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait]
impl RemoteQuery for GeminiClient {
    fn backend_name(&self) -> String {
        format!("Gemini ({})", self.config.news_model)
    }

    fn is_configured(&self) -> bool {
        self.config.has_api_key()
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>> {
        let request = GenerateContentRequest::grounded(INDICES_PROMPT).with_json_schema(indices_schema());
        let response = self.generate_content(&self.config.news_model, &request).await?;
        let indices = parse_indices(&response.text());
        info!("Received {} market indices", indices.len());
        Ok(indices)
    }

    async fn economic_news(&self, search: &str) -> Result<NewsResponse> {
        let prompt = format!(
            "Search for the most recent news: \"{}\".\nTranslate results to {}. Provide a JSON array of articles with reliability scores.",
            search, self.config.response_language
        );
        let request = GenerateContentRequest::grounded(&prompt).with_json_schema(articles_schema());
        let response = self.generate_content(&self.config.news_model, &request).await?;

        let articles = parse_articles(&response.text())?;
        let sources = response.grounding_sources();
        info!("Received {} articles grounded on {} sources", articles.len(), sources.len());

        Ok(NewsResponse { articles, sources })
    }

    async fn deep_insight(&self, topic: &SanitizedText) -> Result<String> {
        let prompt = format!(
            "Write a market insight report on the topic \"{}\" in {}.",
            topic, self.config.response_language
        );
        let request = GenerateContentRequest::grounded(&prompt);
        let response = self.generate_content(&self.config.insight_model, &request).await?;
        Ok(response.text())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn grounded(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: None,
        }
    }

    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Web pages the first candidate was grounded on, in response order.
    pub fn grounding_sources(&self) -> Vec<GroundingSource> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .map(|web| GroundingSource {
                        title: web
                            .title
                            .clone()
                            .filter(|title| !title.is_empty())
                            .unwrap_or_else(|| DEFAULT_SOURCE_TITLE.to_string()),
                        uri: web.uri.clone().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct IndicesEnvelope {
    #[serde(default)]
    indices: Vec<MarketIndex>,
}

#[derive(Debug, Deserialize)]
struct ArticlesEnvelope {
    #[serde(default)]
    articles: Vec<ArticleDraft>,
}

/// Market indices from model output. Unparseable output yields an empty
/// list; the ticker simply shows nothing until the next refresh.
pub fn parse_indices(text: &str) -> Vec<MarketIndex> {
    match serde_json::from_str::<IndicesEnvelope>(strip_code_fence(text)) {
        Ok(envelope) => envelope.indices,
        Err(e) => {
            warn!("Market data parse error: {}", e);
            Vec::new()
        }
    }
}

pub fn parse_articles(text: &str) -> Result<Vec<ArticleDraft>> {
    serde_json::from_str::<ArticlesEnvelope>(strip_code_fence(text))
        .map(|envelope| envelope.articles)
        .map_err(|e| PulseError::Parse(format!("news response: {}", e)))
}

/// Grounded responses sometimes arrive wrapped in a markdown code fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn indices_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "indices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "value": { "type": "STRING" },
                        "change": { "type": "STRING" },
                        "changePercent": { "type": "STRING" },
                        "trend": { "type": "STRING", "enum": ["up", "down", "neutral"] }
                    },
                    "required": ["name", "value", "change", "changePercent", "trend"]
                }
            }
        },
        "required": ["indices"]
    })
}

fn articles_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "articles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "summary": { "type": "STRING" },
                        "source": { "type": "STRING" },
                        "sentiment": { "type": "STRING", "enum": ["positive", "negative", "neutral"] },
                        "reliabilityScore": { "type": "NUMBER" }
                    },
                    "required": ["id", "title", "summary", "source", "sentiment", "reliabilityScore"]
                }
            }
        },
        "required": ["articles"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sentiment, Trend};

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "Hello, " }, { "text": "market" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello, market");
    }

    #[test]
    fn grounding_sources_default_missing_fields() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://example.com/a", "title": "Example" } },
                        { "retrievedContext": {} },
                        { "web": { "title": "" } }
                    ]
                }
            }]
        }))
        .unwrap();

        let sources = response.grounding_sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "Example");
        assert_eq!(sources[1].title, "Source");
        assert_eq!(sources[1].uri, "");
    }

    #[test]
    fn empty_response_has_no_text_or_sources() {
        let response = GenerateContentResponse::default();
        assert!(response.text().is_empty());
        assert!(response.grounding_sources().is_empty());
    }

    #[test]
    fn indices_parse_failure_yields_empty_list() {
        assert!(parse_indices("not json").is_empty());

        let indices = parse_indices(
            "```json\n{\"indices\":[{\"name\":\"NASDAQ\",\"value\":\"17,000\",\"change\":\"-20\",\"changePercent\":\"-0.1%\",\"trend\":\"down\"}]}\n```",
        );
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0].trend, Trend::Down);
    }

    #[test]
    fn article_parse_failure_is_an_error() {
        assert!(matches!(parse_articles("{oops"), Err(PulseError::Parse(_))));

        let articles = parse_articles(
            r#"{"articles":[{"id":"1","title":"Rates hold","summary":"BoK holds","source":"Yonhap","sentiment":"neutral","reliabilityScore":0.9}]}"#,
        )
        .unwrap();
        assert_eq!(articles[0].sentiment, Sentiment::Neutral);
        assert_eq!(parse_articles("{}").unwrap().len(), 0);
    }

    #[test]
    fn request_serializes_grounding_and_schema() {
        let body = serde_json::to_value(GenerateContentRequest::grounded("hi").with_json_schema(indices_schema())).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["tools"][0]["googleSearch"], json!({}));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = GeminiClient::new(ClientConfig {
            base_url: "http://localhost:8080/proxy".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        let url = client.endpoint("gemini-3-flash-preview").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/v1beta/models/gemini-3-flash-preview:generateContent");
    }
}
