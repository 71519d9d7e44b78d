use serde::{Deserialize, Serialize};

/// Body returned by `GET {sentiment-base}/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub sentiment_count: SentimentCount,
    pub total_score: f64,
    pub total_sentiment: String,
    #[serde(default)]
    pub keywords: Keywords,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCount {
    pub negative: SentimentDetail,
    pub neutral: SentimentDetail,
    pub positive: SentimentDetail,
}

/// Per-source counts for one polarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDetail {
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub investing: u32,
    #[serde(default)]
    pub news: u32,
}

impl SentimentDetail {
    pub fn total(&self) -> u32 {
        self.comments
            .saturating_add(self.investing)
            .saturating_add(self.news)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub news: Vec<String>,
    #[serde(default)]
    pub total: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_sentiment_body() {
        let v = json!({
            "total_sentiment": "positive",
            "total_score": 0.82,
            "sentiment_count": {
                "positive": {"news": 10, "comments": 3, "investing": 1},
                "neutral": {"news": 2, "comments": 0, "investing": 0},
                "negative": {"news": 1, "comments": 1, "investing": 0}
            },
            "keywords": {
                "positive": ["HBM", "earnings"],
                "negative": ["lawsuit"],
                "neutral": [],
                "news": ["Q3 results"],
                "total": ["HBM"]
            }
        });

        let parsed: SentimentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.total_sentiment, "positive");
        assert_eq!(parsed.total_score, 0.82);
        assert_eq!(parsed.sentiment_count.positive.total(), 14);
        assert_eq!(parsed.keywords.positive, vec!["HBM", "earnings"]);
    }

    #[test]
    fn missing_keywords_default_to_empty_lists() {
        let v = json!({
            "total_sentiment": "neutral",
            "total_score": 0.0,
            "sentiment_count": {
                "positive": {"news": 0},
                "neutral": {},
                "negative": {"comments": 4}
            }
        });

        let parsed: SentimentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.keywords, Keywords::default());
        assert_eq!(parsed.sentiment_count.negative.comments, 4);
    }

    #[test]
    fn detail_total_saturates() {
        let d = SentimentDetail {
            comments: u32::MAX,
            investing: 5,
            news: 1,
        };
        assert_eq!(d.total(), u32::MAX);
    }

    #[test]
    fn rejects_body_without_counts() {
        let v = json!({"total_sentiment": "positive", "total_score": 0.5});
        assert!(serde_json::from_value::<SentimentResponse>(v).is_err());
    }
}
