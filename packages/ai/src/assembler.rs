// ABOUTME: Streaming Response Assembler for the analysis endpoint
// ABOUTME: Turns SSE frames into progress callbacks and one normalized AnalysisResult

use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use trialguard_core::AnalysisResult;

use crate::error::{ClientError, ClientResult};
use crate::normalize::normalize_analysis;
use crate::sse::{decode_stream, SseDecoder, SseEvent, SseFrame};

pub const EVENT_PROGRESS: &str = "progress";
pub const EVENT_COMPLETE: &str = "complete";
pub const EVENT_ERROR: &str = "error";

/// Progress notification emitted while the backend works
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressUpdate {
    pub stage: String,
    pub message: String,
    pub progress_percent: Option<f64>,
}

type ProgressCallback<'a> = Box<dyn FnMut(&ProgressUpdate) + Send + 'a>;

/// Accumulates one analysis stream.
///
/// Feed raw body chunks with [`feed`](Self::feed) (or hand the whole byte
/// stream to [`consume`](Self::consume)), then call [`finish`](Self::finish).
/// The last well-formed `complete` event wins.
pub struct AnalysisAssembler<'a> {
    decoder: SseDecoder,
    result: Option<AnalysisResult>,
    on_progress: Option<ProgressCallback<'a>>,
    progress_events: usize,
}

impl<'a> AnalysisAssembler<'a> {
    pub fn new() -> Self {
        Self {
            decoder: SseDecoder::new(),
            result: None,
            on_progress: None,
            progress_events: 0,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ProgressUpdate) + Send + 'a,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn feed(&mut self, chunk: &[u8]) -> ClientResult<()> {
        for frame in self.decoder.feed(chunk) {
            self.handle_frame(frame)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> ClientResult<AnalysisResult> {
        if !self.decoder.is_idle() {
            debug!("Flushing partial SSE data at end of stream");
        }
        for frame in self.decoder.finish() {
            self.handle_frame(frame)?;
        }
        debug!(
            progress_events = self.progress_events,
            "Analysis stream ended"
        );
        self.result.ok_or(ClientError::NoResult)
    }

    /// Drive a whole byte stream through the assembler
    pub async fn consume<S, B, E>(mut self, byte_stream: S) -> ClientResult<AnalysisResult>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        ClientError: From<E>,
    {
        let mut frames = std::pin::pin!(decode_stream(byte_stream));
        while let Some(frame) = frames.next().await {
            self.handle_frame(frame?)?;
        }
        self.finish()
    }

    fn handle_frame(&mut self, frame: SseFrame) -> ClientResult<()> {
        match frame {
            SseFrame::Event(event) => self.handle_event(event),
            SseFrame::Unparsed {
                event,
                data,
                truncated,
            } => {
                if truncated {
                    return Err(ClientError::MalformedStream(format!(
                        "stream ended inside '{}' event ({} bytes pending)",
                        event,
                        data.len()
                    )));
                }
                if event == EVENT_COMPLETE {
                    return Err(ClientError::MalformedStream(
                        "complete event payload is not valid JSON".to_string(),
                    ));
                }
                warn!(event = %event, "Dropping unparseable SSE payload");
                Ok(())
            }
        }
    }

    fn handle_event(&mut self, event: SseEvent) -> ClientResult<()> {
        match event.event.as_str() {
            EVENT_PROGRESS => {
                self.progress_events += 1;
                let update: ProgressUpdate = match serde_json::from_value(event.data) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!("Ignoring malformed progress event: {}", e);
                        return Ok(());
                    }
                };
                debug!(stage = %update.stage, percent = ?update.progress_percent, "Analysis progress");
                if let Some(callback) = self.on_progress.as_mut() {
                    callback(&update);
                }
                Ok(())
            }
            EVENT_COMPLETE => {
                let Some(analysis) = event.data.get("analysis") else {
                    warn!("Complete event without analysis payload ignored");
                    return Ok(());
                };
                let envelope_id = event.data.get("analysis_id").and_then(Value::as_str);
                let result = normalize_analysis(analysis, envelope_id)?;
                debug!(
                    score = result.overall_score,
                    findings = result.findings.len(),
                    "Received analysis result"
                );
                self.result = Some(result);
                Ok(())
            }
            EVENT_ERROR => {
                let message = ["message", "error"]
                    .iter()
                    .find_map(|key| event.data.get(*key).and_then(Value::as_str))
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Analysis failed")
                    .to_string();
                Err(ClientError::AnalysisFailed(message))
            }
            other => {
                debug!(event = other, "Ignoring unknown SSE event");
                Ok(())
            }
        }
    }
}

impl Default for AnalysisAssembler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use trialguard_core::RiskLevel;

    fn complete_block(score: f64) -> String {
        format!(
            "event: complete\r\ndata: {{\"analysis_id\": \"a-1\", \"analysis\": {{\"risk_score\": {{\"overall_score\": {}, \"confidence\": 0.9, \"category_scores\": []}}, \"findings\": [], \"recommendations\": [], \"similar_trials\": [], \"executive_summary\": \"Summary with é\"}}}}\r\n\r\n",
            score
        )
    }

    fn full_stream(score: f64) -> String {
        let mut body = String::new();
        body.push_str("event: progress\r\ndata: {\"stage\": \"parsing\", \"message\": \"Parsing\", \"progress_percent\": 10}\r\n\r\n");
        body.push_str(": keep-alive\r\n\r\n");
        body.push_str("event: progress\r\ndata: {\"stage\": \"scoring\", \"message\": \"Scoring\", \"progress_percent\": 80}\r\n\r\n");
        body.push_str(&complete_block(score));
        body
    }

    fn assemble(chunks: &[&[u8]]) -> ClientResult<AnalysisResult> {
        let mut assembler = AnalysisAssembler::new();
        for chunk in chunks {
            assembler.feed(chunk)?;
        }
        assembler.finish()
    }

    #[rstest]
    #[case(29.0, RiskLevel::Low)]
    #[case(30.0, RiskLevel::Moderate)]
    #[case(69.0, RiskLevel::Moderate)]
    #[case(70.0, RiskLevel::High)]
    fn test_risk_level_follows_score(#[case] score: f64, #[case] expected: RiskLevel) {
        let body = full_stream(score);
        let result = assemble(&[body.as_bytes()]).unwrap();
        assert_eq!(result.overall_score, score);
        assert_eq!(result.risk_level(), expected);
        assert_eq!(result.analysis_id.as_deref(), Some("a-1"));
    }

    #[test]
    fn test_split_at_every_byte_matches_unsplit() {
        let body = full_stream(42.0);
        let bytes = body.as_bytes();
        let expected = assemble(&[bytes]).unwrap();

        for split in 1..bytes.len() {
            let result = assemble(&[&bytes[..split], &bytes[split..]]).unwrap();
            assert_eq!(result, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let body = full_stream(55.0);
        let chunks: Vec<&[u8]> = body.as_bytes().chunks(1).collect();
        let result = assemble(&chunks).unwrap();
        assert_eq!(result.executive_summary, "Summary with é");
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(25)]
    fn test_no_complete_event_is_no_result(#[case] progress_events: usize) {
        let body = "event: progress\ndata: {\"stage\": \"x\"}\n\n".repeat(progress_events);
        let err = assemble(&[body.as_bytes()]).unwrap_err();
        assert!(matches!(err, ClientError::NoResult));
    }

    #[test]
    fn test_progress_callback_receives_updates() {
        let mut seen = Vec::new();
        {
            let mut assembler = AnalysisAssembler::new().with_progress(|update| {
                seen.push((update.stage.clone(), update.progress_percent));
            });
            assembler.feed(full_stream(10.0).as_bytes()).unwrap();
            assembler.finish().unwrap();
        }
        assert_eq!(
            seen,
            vec![
                ("parsing".to_string(), Some(10.0)),
                ("scoring".to_string(), Some(80.0)),
            ]
        );
    }

    #[test]
    fn test_error_event_fails_with_message() {
        let body = "event: error\ndata: {\"error\": \"AnalysisError\", \"message\": \"Model unavailable\"}\n\n";
        let err = assemble(&[body.as_bytes()]).unwrap_err();
        assert!(matches!(err, ClientError::AnalysisFailed(_)));
        assert_eq!(err.to_string(), "Model unavailable");
    }

    #[tokio::test]
    async fn test_consume_error_event_mid_stream() {
        let chunks: Vec<Result<&[u8], ClientError>> = vec![
            Ok(&b"event: progress\ndata: {\"stage\": \"parsing\"}\n\nevent: err"[..]),
            Ok(&b"or\ndata: {\"message\": \"Model unavailable\"}\n\n"[..]),
        ];
        let err = AnalysisAssembler::new()
            .consume(futures::stream::iter(chunks))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AnalysisFailed(ref m) if m == "Model unavailable"));
    }

    #[test]
    fn test_truncated_stream_is_malformed() {
        let body = full_stream(50.0);
        let cut = body.len() - 20;
        let err = assemble(&[&body.as_bytes()[..cut]]).unwrap_err();
        assert!(matches!(err, ClientError::MalformedStream(_)));
    }

    #[test]
    fn test_unparseable_complete_is_malformed() {
        let body = "event: complete\ndata: {not json\n\n";
        let err = assemble(&[body.as_bytes()]).unwrap_err();
        assert!(matches!(err, ClientError::MalformedStream(_)));
    }

    #[test]
    fn test_unparseable_progress_is_skipped() {
        let mut body = "event: progress\ndata: {oops\n\n".to_string();
        body.push_str(&complete_block(12.0));
        let result = assemble(&[body.as_bytes()]).unwrap();
        assert_eq!(result.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn test_last_complete_event_wins() {
        let mut body = complete_block(20.0);
        body.push_str(&complete_block(90.0));
        let result = assemble(&[body.as_bytes()]).unwrap();
        assert_eq!(result.overall_score, 90.0);
    }

    #[test]
    fn test_complete_without_analysis_is_ignored() {
        let body = "event: complete\ndata: {\"analysis_id\": \"x\"}\n\n";
        let err = assemble(&[body.as_bytes()]).unwrap_err();
        assert!(matches!(err, ClientError::NoResult));
    }

    #[tokio::test]
    async fn test_consume_byte_stream() {
        let body = full_stream(75.0);
        let (head, tail) = body.as_bytes().split_at(body.len() / 2);
        let chunks: Vec<Result<Vec<u8>, ClientError>> = vec![Ok(head.to_vec()), Ok(tail.to_vec())];

        let result = AnalysisAssembler::new()
            .consume(futures::stream::iter(chunks))
            .await
            .unwrap();
        assert_eq!(result.risk_level(), RiskLevel::High);
    }

    #[tokio::test]
    async fn test_consume_truncated_stream_is_malformed() {
        let body = full_stream(50.0);
        let cut = body.len() - 20;
        let chunks: Vec<Result<Vec<u8>, ClientError>> = vec![Ok(body.as_bytes()[..cut].to_vec())];
        let err = AnalysisAssembler::new()
            .consume(futures::stream::iter(chunks))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedStream(_)));
    }

    #[tokio::test]
    async fn test_consume_propagates_transport_error() {
        let chunks: Vec<Result<Vec<u8>, ClientError>> = vec![
            Ok(b"event: progress\n".to_vec()),
            Err(ClientError::Cancelled),
        ];
        let err = AnalysisAssembler::new()
            .consume(futures::stream::iter(chunks))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }
}
