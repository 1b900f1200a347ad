// ABOUTME: Normalized analysis result rendered by the dashboard
// ABOUTME: Risk vocabulary enums and the immutable AnalysisResult shape

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Overall risk band, derived from the overall score only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            RiskLevel::Low
        } else if score < 70.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding severity in the internal vocabulary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation priority in the internal vocabulary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub category: String,
    pub recommendation: Option<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub quantified_impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub category: String,
    pub expected_risk_reduction: Option<f64>,
    pub difficulty: Option<String>,
    pub estimated_cost: Option<String>,
    pub implementation_time: Option<String>,
}

/// Score of one risk dimension plus the findings filed under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub score: f64,
    pub findings: Vec<Finding>,
}

/// A historical trial the protocol was compared against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalComparison {
    pub nct_id: String,
    pub trial_name: String,
    pub phase: String,
    pub therapeutic_area: String,
    pub drug_class: String,
    pub outcome: String,
    /// 0-1
    pub similarity_score: f64,
    /// similarity projected onto 0-100 for charting
    pub comparable_risk_score: f64,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
    #[serde(default)]
    pub key_learnings: Vec<String>,
}

/// Normalized result of one completed analysis.
///
/// The risk level is not stored: [`AnalysisResult::risk_level`] derives it
/// from `overall_score` every time, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: Option<String>,
    /// 0-100
    pub overall_score: f64,
    /// 0-1
    pub confidence: f64,
    pub categories: BTreeMap<String, CategoryBreakdown>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub comparisons: Vec<HistoricalComparison>,
    pub executive_summary: String,
    pub processing_time_seconds: Option<f64>,
}

impl AnalysisResult {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.overall_score)
    }

    pub fn findings_with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Recommendations ordered high -> low, stable within a priority
    pub fn prioritized_recommendations(&self) -> Vec<&Recommendation> {
        let mut recs: Vec<&Recommendation> = self.recommendations.iter().collect();
        recs.sort_by_key(|r| r.priority);
        recs
    }

    /// JSON context handed to the chat service, including the derived level
    pub fn to_context(&self) -> Value {
        let mut context = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut context {
            map.insert(
                "risk_level".to_string(),
                Value::String(self.risk_level().as_str().to_string()),
            );
        }
        context
    }
}
