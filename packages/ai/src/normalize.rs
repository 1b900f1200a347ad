// ABOUTME: Adapter from the remote analysis schema to the internal AnalysisResult
// ABOUTME: Severity/priority vocabulary mapping, category re-indexing, trial projection

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;
use trialguard_core::{
    AnalysisResult, CategoryBreakdown, Finding, HistoricalComparison, Priority, Recommendation,
    Severity,
};

use crate::error::{ClientError, ClientResult};

/// Similarity assumed for a comparison trial that reports none
const DEFAULT_SIMILARITY: f64 = 0.5;

/// Map a remote severity label onto the internal vocabulary.
///
/// `medium` becomes `moderate` and `critical` becomes `high`; absent or
/// unrecognised labels fall back to `moderate`.
pub fn map_severity(remote: Option<&str>) -> Severity {
    match remote.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("low") => Severity::Low,
        Some("moderate") | Some("medium") => Severity::Moderate,
        Some("high") | Some("critical") => Severity::High,
        _ => Severity::default(),
    }
}

/// Map a remote priority onto the internal vocabulary.
///
/// Integer ranks (1 = highest): rank <= 1 is high, <= 3 medium, else low.
/// Strings pass through; absent or unrecognised values are `medium`.
pub fn map_priority(remote: Option<&Value>) -> Priority {
    match remote {
        Some(Value::Number(n)) => n.as_f64().map(priority_from_rank).unwrap_or_default(),
        Some(Value::String(s)) => {
            let label = s.trim().to_ascii_lowercase();
            match label.as_str() {
                "high" => Priority::High,
                "medium" => Priority::Medium,
                "low" => Priority::Low,
                _ => label
                    .parse::<f64>()
                    .map(priority_from_rank)
                    .unwrap_or_default(),
            }
        }
        _ => Priority::default(),
    }
}

fn priority_from_rank(rank: f64) -> Priority {
    if rank <= 1.0 {
        Priority::High
    } else if rank <= 3.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Accept numbers and numeric strings; anything else reads as absent
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Accept a list of strings, a single string or null
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// Accept a list or null
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteAnalysis {
    analysis_id: Option<String>,
    risk_score: Option<RemoteRiskScore>,
    #[serde(deserialize_with = "lenient_f64")]
    overall_risk_score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    confidence: Option<f64>,
    #[serde(deserialize_with = "lenient_list")]
    category_scores: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    findings: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    recommendations: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    similar_trials: Vec<Value>,
    executive_summary: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    processing_time_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteRiskScore {
    #[serde(deserialize_with = "lenient_f64")]
    overall_score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    confidence: Option<f64>,
    #[serde(deserialize_with = "lenient_list")]
    category_scores: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RemoteCategoryScore {
    category: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteFinding {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    severity: Option<String>,
    recommendation: Option<String>,
    #[serde(deserialize_with = "lenient_strings")]
    evidence: Vec<String>,
    quantified_impact: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteRecommendation {
    priority: Option<Value>,
    title: Option<String>,
    description: Option<String>,
    impact_category: Option<String>,
    category: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    expected_risk_reduction: Option<f64>,
    difficulty: Option<String>,
    estimated_cost: Option<String>,
    implementation_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteTrial {
    nct_id: Option<String>,
    trial_name: Option<String>,
    phase: Option<String>,
    therapeutic_area: Option<String>,
    drug_class: Option<String>,
    outcome: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    similarity_score: Option<f64>,
    #[serde(deserialize_with = "lenient_strings")]
    failure_reasons: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    key_learnings: Vec<String>,
}

/// Decode each entry on its own; a malformed entry is skipped, not fatal
fn decode_entries<T: DeserializeOwned>(entries: Vec<Value>, kind: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed {}: {}", kind, e);
                None
            }
        })
        .collect()
}

/// Build the internal result from the `analysis` object of a `complete` event.
/// `analysis_id` from the event envelope is used when the payload lacks one.
pub fn normalize_analysis(
    payload: &Value,
    envelope_id: Option<&str>,
) -> ClientResult<AnalysisResult> {
    if !payload.is_object() {
        return Err(ClientError::InvalidResponse(
            "analysis payload is not an object".to_string(),
        ));
    }
    let remote: RemoteAnalysis = serde_json::from_value(payload.clone())
        .map_err(|e| ClientError::InvalidResponse(format!("analysis payload: {}", e)))?;

    let risk_score = remote.risk_score.unwrap_or_default();
    let overall_score = risk_score
        .overall_score
        .or(remote.overall_risk_score)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);
    let confidence = risk_score
        .confidence
        .or(remote.confidence)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let findings: Vec<Finding> = decode_entries::<RemoteFinding>(remote.findings, "finding")
        .into_iter()
        .map(|f| Finding {
            severity: map_severity(f.severity.as_deref()),
            title: f.title.unwrap_or_else(|| "Finding".to_string()),
            description: f.description.unwrap_or_default(),
            category: f.category.unwrap_or_default(),
            recommendation: f.recommendation.filter(|r| !r.trim().is_empty()),
            evidence: f.evidence,
            quantified_impact: f.quantified_impact,
        })
        .collect();

    let category_entries = if risk_score.category_scores.is_empty() {
        remote.category_scores
    } else {
        risk_score.category_scores
    };
    let mut categories = BTreeMap::new();
    for entry in decode_entries::<RemoteCategoryScore>(category_entries, "category score") {
        let attached = findings
            .iter()
            .filter(|f| f.category == entry.category)
            .cloned()
            .collect();
        categories.insert(
            entry.category,
            CategoryBreakdown {
                score: entry.score.unwrap_or(0.0).clamp(0.0, 100.0),
                findings: attached,
            },
        );
    }

    let recommendations =
        decode_entries::<RemoteRecommendation>(remote.recommendations, "recommendation")
            .into_iter()
            .map(|r| Recommendation {
                priority: map_priority(r.priority.as_ref()),
                title: r.title.unwrap_or_else(|| "Recommendation".to_string()),
                description: r.description.unwrap_or_default(),
                category: r.impact_category.or(r.category).unwrap_or_default(),
                expected_risk_reduction: r.expected_risk_reduction,
                difficulty: r.difficulty,
                estimated_cost: r.estimated_cost,
                implementation_time: r.implementation_time,
            })
            .collect();

    let comparisons = decode_entries::<RemoteTrial>(remote.similar_trials, "similar trial")
        .into_iter()
        .map(|t| {
            let similarity_score = t
                .similarity_score
                .unwrap_or(DEFAULT_SIMILARITY)
                .clamp(0.0, 1.0);
            HistoricalComparison {
                nct_id: t.nct_id.unwrap_or_else(|| "Unknown".to_string()),
                trial_name: t.trial_name.unwrap_or_else(|| "Unknown Trial".to_string()),
                phase: t.phase.unwrap_or_default(),
                therapeutic_area: t.therapeutic_area.unwrap_or_default(),
                drug_class: t.drug_class.unwrap_or_default(),
                outcome: t.outcome.unwrap_or_else(|| "unknown".to_string()),
                similarity_score,
                comparable_risk_score: similarity_score * 100.0,
                failure_reasons: t.failure_reasons,
                key_learnings: t.key_learnings,
            }
        })
        .collect();

    Ok(AnalysisResult {
        analysis_id: remote.analysis_id.or_else(|| envelope_id.map(str::to_string)),
        overall_score,
        confidence,
        categories,
        findings,
        recommendations,
        comparisons,
        executive_summary: remote.executive_summary.unwrap_or_default(),
        processing_time_seconds: remote.processing_time_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use trialguard_core::RiskLevel;

    #[rstest]
    #[case(Some("medium"), Severity::Moderate)]
    #[case(Some("critical"), Severity::High)]
    #[case(Some("CRITICAL"), Severity::High)]
    #[case(Some("high"), Severity::High)]
    #[case(Some("low"), Severity::Low)]
    #[case(Some("moderate"), Severity::Moderate)]
    #[case(Some("catastrophic"), Severity::Moderate)]
    #[case(None, Severity::Moderate)]
    fn test_map_severity(#[case] remote: Option<&str>, #[case] expected: Severity) {
        assert_eq!(map_severity(remote), expected);
    }

    #[rstest]
    #[case(json!(1), Priority::High)]
    #[case(json!(0), Priority::High)]
    #[case(json!(2), Priority::Medium)]
    #[case(json!(3), Priority::Medium)]
    #[case(json!(4), Priority::Low)]
    #[case(json!(5), Priority::Low)]
    #[case(json!("high"), Priority::High)]
    #[case(json!("Low"), Priority::Low)]
    #[case(json!("2"), Priority::Medium)]
    #[case(json!("urgent"), Priority::Medium)]
    #[case(json!(null), Priority::Medium)]
    fn test_map_priority(#[case] remote: Value, #[case] expected: Priority) {
        assert_eq!(map_priority(Some(&remote)), expected);
    }

    #[test]
    fn test_map_priority_absent() {
        assert_eq!(map_priority(None), Priority::Medium);
    }

    fn remote_payload() -> Value {
        json!({
            "analysis_id": "a-1",
            "risk_score": {
                "overall_score": 72.5,
                "risk_level": "high",
                "confidence": 0.85,
                "category_scores": [
                    {"category": "safety_alignment", "score": 80, "findings_count": 1},
                    {"category": "design_completeness", "score": "55"}
                ]
            },
            "findings": [
                {"title": "No DSMB", "category": "safety_alignment", "severity": "critical",
                 "description": "No independent monitoring", "recommendation": "Add a DSMB"},
                {"title": "Placebo response", "category": "historical_precedent", "severity": "medium",
                 "description": "High placebo response in similar trials", "recommendation": ""},
                "not an object"
            ],
            "recommendations": [
                {"priority": 1, "title": "Add DSMB", "description": "...", "impact_category": "safety_alignment",
                 "expected_risk_reduction": 15, "difficulty": "medium"},
                {"priority": 5, "title": "Extend run-in", "description": "...", "category": "design_completeness"}
            ],
            "similar_trials": [
                {"nct_id": "NCT001", "trial_name": "STAR-D", "outcome": "failed", "similarity_score": 0.82,
                 "failure_reasons": ["High placebo response"]},
                {"nct_id": "NCT002", "trial_name": "EMBARK", "outcome": "success", "failure_reasons": null}
            ],
            "executive_summary": "High risk protocol.",
            "processing_time_seconds": 3.2
        })
    }

    #[test]
    fn test_normalize_full_payload() {
        let result = normalize_analysis(&remote_payload(), None).unwrap();

        assert_eq!(result.analysis_id.as_deref(), Some("a-1"));
        assert_eq!(result.overall_score, 72.5);
        assert_eq!(result.risk_level(), RiskLevel::High);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.executive_summary, "High risk protocol.");
        assert_eq!(result.processing_time_seconds, Some(3.2));

        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.findings[0].severity, Severity::High);
        assert_eq!(result.findings[1].severity, Severity::Moderate);
        assert_eq!(result.findings[1].recommendation, None);

        assert_eq!(result.recommendations[0].priority, Priority::High);
        assert_eq!(result.recommendations[0].category, "safety_alignment");
        assert_eq!(result.recommendations[0].expected_risk_reduction, Some(15.0));
        assert_eq!(result.recommendations[1].priority, Priority::Low);
        assert_eq!(result.recommendations[1].category, "design_completeness");
    }

    #[test]
    fn test_categories_reindexed_with_findings() {
        let result = normalize_analysis(&remote_payload(), None).unwrap();

        let keys: Vec<&str> = result.categories.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["design_completeness", "safety_alignment"]);

        let safety = &result.categories["safety_alignment"];
        assert_eq!(safety.score, 80.0);
        assert_eq!(safety.findings.len(), 1);
        assert_eq!(safety.findings[0].title, "No DSMB");

        let design = &result.categories["design_completeness"];
        assert_eq!(design.score, 55.0);
        assert!(design.findings.is_empty());

        // No bucket for historical_precedent: kept only in the flat list
        assert!(result
            .findings
            .iter()
            .any(|f| f.category == "historical_precedent"));
    }

    #[test]
    fn test_comparisons_projected_to_risk_scale() {
        let result = normalize_analysis(&remote_payload(), None).unwrap();

        assert_eq!(result.comparisons[0].similarity_score, 0.82);
        assert!((result.comparisons[0].comparable_risk_score - 82.0).abs() < 1e-9);
        assert_eq!(result.comparisons[0].failure_reasons, vec!["High placebo response"]);

        assert_eq!(result.comparisons[1].similarity_score, 0.5);
        assert_eq!(result.comparisons[1].comparable_risk_score, 50.0);
        assert!(result.comparisons[1].failure_reasons.is_empty());
    }

    #[test]
    fn test_flat_score_fields_and_envelope_id() {
        let payload = json!({
            "overall_risk_score": 150,
            "confidence": 2.0,
            "findings": null,
            "similar_trials": null
        });
        let result = normalize_analysis(&payload, Some("env-7")).unwrap();

        assert_eq!(result.overall_score, 100.0);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.analysis_id.as_deref(), Some("env-7"));
        assert!(result.categories.is_empty());
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = normalize_analysis(&json!("nope"), None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }
}
