// ABOUTME: HTTP client for the TrialGuard backend
// ABOUTME: Streaming analysis, PDF extraction, chat, history and saved analyses

use std::path::Path;

use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use trialguard_core::{AnalysisRequest, AnalysisResult};

use crate::assembler::{AnalysisAssembler, ProgressUpdate};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::normalize::normalize_analysis;
use crate::types::{
    AnalysisLookupResponse, ChatReply, ChatRequest, HistoricalTrial, ParsePdfResponse,
    ProtocolValidation, SavedAnalysisSummary, SavedListResponse, SearchQuery, SearchResponse,
    TrialLookupResponse, TrialQuery,
};

const ANALYSIS_PATH: &str = "/api/analysis";
const ANALYZE_PATH: &str = "/api/analysis/analyze";
const PARSE_PDF_PATH: &str = "/api/protocol/parse-pdf";
const VALIDATE_PATH: &str = "/api/protocol/validate";
const CHAT_PATH: &str = "/api/chat/message";
const HISTORY_PATH: &str = "/api/history";
const SAVE_PATH: &str = "/api/analysis/save";
const SAVED_PATH: &str = "/api/analysis/saved";
const SEARCH_PATH: &str = "/api/analysis/search";

const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF";

/// Reject an upload that is not a PDF or exceeds `max_bytes`.
/// Runs before any bytes leave the machine.
pub fn validate_pdf_upload(file_name: &str, bytes: &[u8], max_bytes: u64) -> ClientResult<()> {
    let has_pdf_extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !has_pdf_extension && !bytes.starts_with(PDF_MAGIC) {
        return Err(ClientError::InvalidUpload(format!(
            "{} is not a PDF file",
            file_name
        )));
    }
    check_upload_size(bytes.len() as u64, max_bytes)
}

fn check_upload_size(size: u64, max_bytes: u64) -> ClientResult<()> {
    if size == 0 {
        return Err(ClientError::InvalidUpload("file is empty".to_string()));
    }
    if size > max_bytes {
        return Err(ClientError::InvalidUpload(format!(
            "file is {:.1} MB, the limit is {:.0} MB",
            size as f64 / (1024.0 * 1024.0),
            max_bytes as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

/// Client for the TrialGuard backend
#[derive(Debug, Clone)]
pub struct TrialGuardClient {
    client: Client,
    config: ClientConfig,
}

impl TrialGuardClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a streaming analysis and return the assembled result
    pub async fn analyze(&self, request: &AnalysisRequest) -> ClientResult<AnalysisResult> {
        self.analyze_with_progress(request, |_| {}).await
    }

    /// Run a streaming analysis, reporting each progress event to `on_progress`
    pub async fn analyze_with_progress<F>(
        &self,
        request: &AnalysisRequest,
        on_progress: F,
    ) -> ClientResult<AnalysisResult>
    where
        F: FnMut(&ProgressUpdate) + Send,
    {
        info!("Starting protocol analysis: {}", self.config.base_url);

        let response = self
            .client
            .post(self.config.url(ANALYZE_PATH))
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Analysis request failed: {}", e);
                ClientError::RequestFailed(e)
            })?;
        let response = check_response(response, "analysis").await?;

        let result = AnalysisAssembler::new()
            .with_progress(on_progress)
            .consume(response.bytes_stream())
            .await?;

        info!(
            "Analysis complete: score={:.1}, level={}, findings={}",
            result.overall_score,
            result.risk_level(),
            result.findings.len()
        );
        Ok(result)
    }

    /// Upload a protocol PDF from disk and return the extracted protocol
    pub async fn parse_pdf(&self, path: &Path) -> ClientResult<Value> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("protocol.pdf")
            .to_string();

        // Size check before reading the whole file into memory
        let metadata = tokio::fs::metadata(path).await?;
        check_upload_size(metadata.len(), self.config.max_upload_bytes)?;

        let bytes = tokio::fs::read(path).await?;
        self.parse_pdf_bytes(&file_name, bytes).await
    }

    pub async fn parse_pdf_bytes(&self, file_name: &str, bytes: Vec<u8>) -> ClientResult<Value> {
        validate_pdf_upload(file_name, &bytes, self.config.max_upload_bytes)?;
        info!("Uploading {} ({} bytes) for extraction", file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.config.url(PARSE_PDF_PATH))
            .multipart(form)
            .send()
            .await?;
        let reply: ParsePdfResponse = read_json(response, "PDF extraction").await?;

        match reply.protocol {
            Some(Value::Object(map)) if !map.is_empty() => {
                debug!(
                    fields = map.len(),
                    file = ?reply.file_name,
                    "Extracted protocol from PDF"
                );
                Ok(Value::Object(map))
            }
            _ => Err(ClientError::EmptyExtraction),
        }
    }

    /// Ask the backend how complete a protocol is. Takes the structured
    /// protocol, e.g. the `protocol` of an analysis request.
    pub async fn validate_protocol(&self, protocol: &Value) -> ClientResult<ProtocolValidation> {
        let response = self
            .client
            .post(self.config.url(VALIDATE_PATH))
            .json(&json!({ "protocol": protocol }))
            .send()
            .await?;
        let report: ProtocolValidation = read_json(response, "protocol validation").await?;
        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            completeness = report.completeness_score,
            "Protocol validated"
        );
        Ok(report)
    }

    /// Fetch an analysis the backend still holds from a recent run
    pub async fn get_analysis(&self, analysis_id: &str) -> ClientResult<AnalysisResult> {
        let response = self
            .client
            .get(self.config.url(&format!("{}/{}", ANALYSIS_PATH, analysis_id)))
            .send()
            .await?;
        let reply: AnalysisLookupResponse = read_json(response, "analysis lookup").await?;
        match reply.analysis {
            Some(analysis) if analysis.is_object() => normalize_analysis(&analysis, Some(analysis_id)),
            _ => Err(ClientError::InvalidResponse(
                "analysis reply has no analysis object".to_string(),
            )),
        }
    }

    pub async fn delete_analysis(&self, analysis_id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.config.url(&format!("{}/{}", ANALYSIS_PATH, analysis_id)))
            .send()
            .await?;
        check_response(response, "delete analysis").await?;
        info!("Deleted analysis {}", analysis_id);
        Ok(())
    }

    /// Send one chat turn and return the assistant's reply
    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<String> {
        debug!(session = %request.session_id, "Sending chat message");
        let response = self
            .client
            .post(self.config.url(CHAT_PATH))
            .json(request)
            .send()
            .await?;
        let reply: ChatReply = read_json(response, "chat").await?;

        reply
            .response
            .or(reply.message)
            .ok_or_else(|| ClientError::InvalidResponse("chat reply has no text".to_string()))
    }

    pub async fn historical_trials(&self, query: &TrialQuery) -> ClientResult<Vec<HistoricalTrial>> {
        let response = self
            .client
            .get(self.config.url(HISTORY_PATH))
            .query(query)
            .send()
            .await?;
        let entries: Vec<Value> = read_json(response, "historical trials").await?;
        Ok(decode_lenient(entries, "historical trial"))
    }

    /// Look up one historical trial; `None` when the backend does not know it
    pub async fn historical_trial(&self, nct_id: &str) -> ClientResult<Option<HistoricalTrial>> {
        let response = self
            .client
            .get(self.config.url(&format!("{}/{}", HISTORY_PATH, nct_id)))
            .send()
            .await?;
        let reply: TrialLookupResponse = read_json(response, "historical trial").await?;
        if reply.status != "success" {
            debug!(nct_id, status = %reply.status, "Historical trial not found");
            return Ok(None);
        }
        Ok(reply.trial)
    }

    /// Persist an analysis. The payload carries a `risk_score` summary so the
    /// backend can index score and level without understanding the rest.
    pub async fn save_analysis(
        &self,
        analysis_id: &str,
        protocol: &Value,
        result: &AnalysisResult,
        trial_name: &str,
    ) -> ClientResult<Value> {
        let mut analysis = serde_json::to_value(result)?;
        if let Value::Object(map) = &mut analysis {
            map.insert(
                "risk_score".to_string(),
                json!({
                    "overall_score": result.overall_score,
                    "risk_level": result.risk_level().as_str(),
                    "confidence": result.confidence,
                }),
            );
        }
        let body = json!({
            "protocol": protocol,
            "analysis": analysis,
            "trial_name": trial_name,
        });

        let response = self
            .client
            .post(self.config.url(&format!("{}/{}", SAVE_PATH, analysis_id)))
            .json(&body)
            .send()
            .await?;
        let reply: Value = read_json(response, "save analysis").await?;
        info!("Saved analysis {}", analysis_id);
        Ok(reply)
    }

    /// Best-effort save: failures are logged, never returned
    pub async fn record_analysis(
        &self,
        protocol: &Value,
        result: &AnalysisResult,
        trial_name: &str,
    ) -> bool {
        let Some(analysis_id) = result.analysis_id.as_deref() else {
            warn!("Analysis has no id, not saving");
            return false;
        };
        match self
            .save_analysis(analysis_id, protocol, result, trial_name)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to save analysis {}: {}", analysis_id, e);
                false
            }
        }
    }

    pub async fn saved_analyses(&self, limit: Option<u32>) -> ClientResult<Vec<SavedAnalysisSummary>> {
        let mut request = self.client.get(self.config.url(&format!("{}/list", SAVED_PATH)));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let reply: SavedListResponse = read_json(request.send().await?, "saved analyses").await?;
        Ok(decode_lenient(reply.analyses, "saved analysis"))
    }

    /// Fetch a saved analysis; accepts both the stored internal shape and
    /// the raw backend shape
    pub async fn saved_analysis(&self, analysis_id: &str) -> ClientResult<AnalysisResult> {
        let response = self
            .client
            .get(self.config.url(&format!("{}/{}", SAVED_PATH, analysis_id)))
            .send()
            .await?;
        let mut reply: Value = read_json(response, "saved analysis").await?;
        let analysis = match reply.get_mut("analysis").map(Value::take) {
            Some(analysis) if analysis.is_object() => analysis,
            _ => {
                return Err(ClientError::InvalidResponse(
                    "saved analysis reply has no analysis object".to_string(),
                ))
            }
        };

        let mut result = match serde_json::from_value::<AnalysisResult>(analysis.clone()) {
            Ok(result) => result,
            Err(_) => normalize_analysis(&analysis, Some(analysis_id))?,
        };
        result.analysis_id.get_or_insert_with(|| analysis_id.to_string());
        Ok(result)
    }

    pub async fn search_analyses(&self, query: &SearchQuery) -> ClientResult<Vec<SavedAnalysisSummary>> {
        let response = self
            .client
            .get(self.config.url(SEARCH_PATH))
            .query(query)
            .send()
            .await?;
        let reply: SearchResponse = read_json(response, "search analyses").await?;
        Ok(decode_lenient(reply.results, "search result"))
    }
}

/// Turn a non-success response into an upstream error
async fn check_response(response: Response, operation: &str) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!("{} failed: {} - {}", operation, status, body);
    Err(ClientError::upstream(status.as_u16(), &body))
}

async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> ClientResult<T> {
    let response = check_response(response, operation).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        error!(
            "Failed to parse {} response: {}. Body: {}",
            operation,
            e,
            text.chars().take(500).collect::<String>()
        );
        ClientError::InvalidResponse(format!("{}: {}", operation, e))
    })
}

/// Decode list entries one by one, skipping malformed ones
fn decode_lenient<T: DeserializeOwned>(entries: Vec<Value>, kind: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed {}: {}", kind, e);
                None
            }
        })
        .collect()
}
