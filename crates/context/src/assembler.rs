//! Evidence assembly
//!
//! Merges structured rows and ranked passages into the bounded context
//! handed to the generation service. Passages are appended in rank order
//! until the character budget would be exceeded; a passage is never split.

use argonaut_nlu::types::QueryAnalysis;
use argonaut_search::executor::Row;
use argonaut_search::ranker::RetrievalCandidate;
use serde::{Deserialize, Serialize};

/// The assembled evidence context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Rows from the structured path
    pub structured_rows: Vec<Row>,

    /// Passages from the semantic path, rank order preserved
    pub ranked_passages: Vec<RetrievalCandidate>,

    /// The character budget the passages were packed under
    pub total_char_budget: usize,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.structured_rows.is_empty() && self.ranked_passages.is_empty()
    }
}

/// Evidence assembler with a strict passage character budget
pub struct EvidenceAssembler {
    passage_char_budget: usize,
}

impl EvidenceAssembler {
    pub fn new(passage_char_budget: usize) -> Self {
        Self {
            passage_char_budget,
        }
    }

    /// Assemble the evidence bundle for a request
    pub fn assemble(
        &self,
        _analysis: &QueryAnalysis,
        structured_rows: Option<Vec<Row>>,
        ranked_passages: Option<Vec<RetrievalCandidate>>,
    ) -> EvidenceBundle {
        let mut packed = Vec::new();
        let mut used = 0usize;

        for passage in ranked_passages.unwrap_or_default() {
            let cost = passage.content.chars().count();
            if used + cost > self.passage_char_budget {
                break;
            }
            used += cost;
            packed.push(passage);
        }

        EvidenceBundle {
            structured_rows: structured_rows.unwrap_or_default(),
            ranked_passages: packed,
            total_char_budget: self.passage_char_budget,
        }
    }

    /// Render the generation prompt for an assembled bundle
    pub fn build_prompt(&self, analysis: &QueryAnalysis, bundle: &EvidenceBundle) -> String {
        let mut prompt = String::with_capacity(1024);

        prompt.push_str(
            "You are an oceanographic data assistant. Answer the question using ONLY the \
             evidence below. If the evidence is insufficient, say so plainly. \
             Do not invent measurements.\n\n",
        );
        prompt.push_str(&format!("Question: {}\n", analysis.original_query));

        if !bundle.structured_rows.is_empty() {
            prompt.push_str("\nObservations (from the float database):\n");
            for row in &bundle.structured_rows {
                let rendered: Vec<String> = row
                    .iter()
                    .map(|(column, value)| format!("{}={}", column, value))
                    .collect();
                prompt.push_str(&format!("- {}\n", rendered.join(", ")));
            }
        }

        if !bundle.ranked_passages.is_empty() {
            prompt.push_str("\nReference passages:\n");
            for (i, passage) in bundle.ranked_passages.iter().enumerate() {
                prompt.push_str(&format!(
                    "\n[{}] (score {:.2})\n{}\n",
                    i + 1,
                    passage.composite_score,
                    passage.content
                ));
            }
        }

        prompt.push_str("\nAnswer:");
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argonaut_nlu::types::QueryAnalysis;
    use chrono::Utc;
    use uuid::Uuid;

    fn passage(id: u128, content: &str, score: f32) -> RetrievalCandidate {
        RetrievalCandidate {
            id: Uuid::from_u128(id),
            content: content.to_string(),
            metadata: serde_json::json!({}),
            source_timestamp: Utc::now(),
            similarity: score,
            relevance: 0.0,
            metadata_match: 1.0,
            composite_score: score,
        }
    }

    fn analysis() -> QueryAnalysis {
        QueryAnalysis::degraded("test question", "test")
    }

    #[test]
    fn test_budget_never_splits_a_passage() {
        let assembler = EvidenceAssembler::new(25);
        let passages = vec![
            passage(1, "first ten chars", 0.9),  // 15 chars
            passage(2, "this one is too long for the budget", 0.8),
            passage(3, "tiny", 0.7), // would fit the leftover, but order is rank order
        ];

        let bundle = assembler.assemble(&analysis(), None, Some(passages));

        // Packing stops at the first passage that would exceed the budget
        assert_eq!(bundle.ranked_passages.len(), 1);
        assert_eq!(bundle.ranked_passages[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn test_rank_order_preserved() {
        let assembler = EvidenceAssembler::new(1000);
        let passages = vec![passage(1, "a", 0.9), passage(2, "b", 0.8), passage(3, "c", 0.7)];

        let bundle = assembler.assemble(&analysis(), None, Some(passages));
        let ids: Vec<Uuid> = bundle.ranked_passages.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3)]);
    }

    #[test]
    fn test_prompt_contains_rows_and_passages() {
        let assembler = EvidenceAssembler::new(1000);
        let rows: Vec<Row> = vec![vec![
            ("mean_value".to_string(), serde_json::json!(35.2)),
            ("sample_count".to_string(), serde_json::json!(40)),
        ]];

        let bundle = assembler.assemble(&analysis(), Some(rows), Some(vec![passage(1, "salinity context", 0.9)]));
        let prompt = assembler.build_prompt(&analysis(), &bundle);

        assert!(prompt.contains("mean_value=35.2"));
        assert!(prompt.contains("salinity context"));
        assert!(prompt.contains("Question: test question"));
    }

    #[test]
    fn test_empty_bundle() {
        let assembler = EvidenceAssembler::new(1000);
        let bundle = assembler.assemble(&analysis(), None, None);
        assert!(bundle.is_empty());
    }
}
