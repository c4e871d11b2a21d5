//! impact
//!
//! Change-impact analysis over dependent beliefs.
//!
//! # Design
//!
//! Impact analysis estimates the blast radius of a proposed change before
//! it is committed. It classifies the change against the current main
//! head, maps the change type to an impact level, and scores every
//! belief in `depended_by` by keyword overlap: the longest non-stopword
//! keywords of the *current* text are searched for literally in each
//! dependent's text, and dependents are ranked by how many references
//! they carry.
//!
//! Like classification, this is a lexical estimate. A dependent that
//! paraphrases the belief without sharing words scores zero.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use credence::core::config::CoreConfig;
//! use credence::core::types::{BeliefId, BranchName};
//! use credence::graph::DependencyGraph;
//! use credence::impact::{ImpactAnalyzer, ImpactLevel};
//! use credence::storage::MemoryStorage;
//! use credence::store::VersionStore;
//!
//! # tokio_test::block_on(async {
//! let storage = Arc::new(MemoryStorage::new());
//! let store = Arc::new(VersionStore::new(storage.clone(), CoreConfig::default()));
//! let graph = Arc::new(DependencyGraph::new(storage));
//! let analyzer = ImpactAnalyzer::new(store.clone(), graph.clone(), &CoreConfig::default());
//!
//! let b = BeliefId::new("rates").unwrap();
//! let current = "Rates are high.\nGrowth is slow.\nInflation is sticky.\n";
//! store
//!     .commit(&b, &BranchName::main(), current, "u1", None)
//!     .await
//!     .unwrap();
//!
//! let proposed = "Rates are high.\nGrowth is slow.\nInflation is cooling quickly.\n";
//! let report = analyzer.analyze(&b, proposed).await.unwrap();
//! assert_eq!(report.impact_level, ImpactLevel::Medium);
//! # });
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::core::classify::ChangeClassifier;
use crate::core::config::CoreConfig;
use crate::core::types::{BeliefId, BranchName, ChangeType};
use crate::graph::{DependencyGraph, GraphError};
use crate::store::{StoreError, VersionStore};

/// Short function words excluded from keyword extraction. Tokens shorter
/// than the configured minimum never reach this list.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "has", "have", "was",
    "were", "with", "this", "that", "than", "then", "them", "they", "their", "there", "from",
    "will", "would", "could", "should", "what", "when", "which", "your", "been", "being", "into",
    "about", "because", "while", "where", "each", "other", "some", "such", "only", "also", "more",
    "most", "over", "very",
];

/// Errors from impact analysis.
#[derive(Debug, Error)]
pub enum ImpactError {
    /// The belief has no current head to analyze against.
    #[error("no current head for belief: {0}")]
    NotFound(BeliefId),

    /// Version store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Dependency graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Estimated severity of a change for downstream beliefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// Map a change type to its impact level.
    ///
    /// The mapping is exhaustive and intentional: structural rewrites are
    /// high impact, moderate revisions medium, and everything that keeps
    /// or restores existing content low.
    pub fn from_change(change: ChangeType) -> Self {
        match change {
            ChangeType::Major => ImpactLevel::High,
            ChangeType::Minor => ImpactLevel::Medium,
            ChangeType::Patch
            | ChangeType::Creation
            | ChangeType::Rollback
            | ChangeType::Merge => ImpactLevel::Low,
        }
    }
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "low"),
            ImpactLevel::Medium => write!(f, "medium"),
            ImpactLevel::High => write!(f, "high"),
        }
    }
}

/// How strongly one dependent references the changing belief.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentImpact {
    /// The dependent belief.
    pub belief_id: BeliefId,
    /// Keywords of the changing belief found literally in the dependent's
    /// text.
    pub matched_keywords: Vec<String>,
    /// Total occurrences of matched keywords in the dependent's text.
    pub reference_count: usize,
}

/// Full impact assessment for a proposed change.
#[derive(Debug, Clone)]
pub struct ImpactReport {
    /// Belief being changed.
    pub belief_id: BeliefId,
    /// Classified type of the proposed change.
    pub change_type: ChangeType,
    /// Mapped severity.
    pub impact_level: ImpactLevel,
    /// Classifier's description of the change.
    pub summary: String,
    /// Similarity between current and proposed text.
    pub similarity: f64,
    /// Keywords extracted from the current text.
    pub keywords: Vec<String>,
    /// Dependents ranked by reference count, highest first.
    pub dependents: Vec<DependentImpact>,
}

/// Scores proposed changes against the dependency graph.
pub struct ImpactAnalyzer {
    store: Arc<VersionStore>,
    graph: Arc<DependencyGraph>,
    classifier: ChangeClassifier,
    max_keywords: usize,
    min_keyword_length: usize,
}

impl ImpactAnalyzer {
    /// Create an analyzer over the given store and graph.
    pub fn new(store: Arc<VersionStore>, graph: Arc<DependencyGraph>, config: &CoreConfig) -> Self {
        Self {
            store,
            graph,
            classifier: ChangeClassifier::new(config),
            max_keywords: config.max_impact_keywords,
            min_keyword_length: config.min_keyword_length,
        }
    }

    /// Assess the impact of replacing a belief's text with `new_text`.
    ///
    /// Keywords come from the *current* main head: dependents reference
    /// what the belief says today, not what it is about to say.
    ///
    /// # Errors
    ///
    /// Returns [`ImpactError::NotFound`] if the belief has no main head.
    pub async fn analyze(
        &self,
        belief_id: &BeliefId,
        new_text: &str,
    ) -> Result<ImpactReport, ImpactError> {
        let main = BranchName::main();
        let head = self
            .store
            .head(belief_id, &main)
            .await?
            .ok_or_else(|| ImpactError::NotFound(belief_id.clone()))?;

        let classification = self.classifier.classify(&head.text, new_text);
        let impact_level = ImpactLevel::from_change(classification.change_type);
        let keywords = self.extract_keywords(&head.text);

        let links = self.graph.get(belief_id).await?;
        let mut dependents = Vec::with_capacity(links.depended_by.len());
        for dependent in &links.depended_by {
            let text = self
                .store
                .head(dependent, &main)
                .await?
                .map(|record| record.text)
                .unwrap_or_default();
            dependents.push(score_dependent(dependent, &keywords, &text));
        }
        dependents.sort_by(|a, b| {
            b.reference_count
                .cmp(&a.reference_count)
                .then_with(|| a.belief_id.cmp(&b.belief_id))
        });

        debug!(
            belief = %belief_id,
            change = %classification.change_type,
            level = %impact_level,
            dependents = dependents.len(),
            "impact analyzed"
        );
        Ok(ImpactReport {
            belief_id: belief_id.clone(),
            change_type: classification.change_type,
            impact_level,
            summary: classification.summary,
            similarity: classification.similarity,
            keywords,
            dependents,
        })
    }

    /// Extract up to `max_keywords` keywords from a text.
    ///
    /// Tokens are maximal alphabetic runs, lowercased, at least
    /// `min_keyword_length` long, deduplicated, with stopwords removed,
    /// sorted by length descending (ties alphabetically for determinism).
    fn extract_keywords(&self, text: &str) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        for token in text.split(|c: char| !c.is_alphabetic()) {
            if token.chars().count() < self.min_keyword_length {
                continue;
            }
            let lowered = token.to_lowercase();
            if STOPWORDS.contains(&lowered.as_str()) {
                continue;
            }
            seen.insert(lowered);
        }
        let mut keywords: Vec<String> = seen.into_iter().collect();
        keywords.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        keywords.truncate(self.max_keywords);
        keywords
    }
}

/// Count literal keyword occurrences in a dependent's text.
fn score_dependent(belief_id: &BeliefId, keywords: &[String], text: &str) -> DependentImpact {
    let haystack = text.to_lowercase();
    let mut matched_keywords = Vec::new();
    let mut reference_count = 0;
    for keyword in keywords {
        let occurrences = haystack.matches(keyword.as_str()).count();
        if occurrences > 0 {
            matched_keywords.push(keyword.clone());
            reference_count += occurrences;
        }
    }
    DependentImpact {
        belief_id: belief_id.clone(),
        matched_keywords,
        reference_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::collections::BTreeSet;

    fn belief(id: &str) -> BeliefId {
        BeliefId::new(id).unwrap()
    }

    fn setup() -> (ImpactAnalyzer, Arc<VersionStore>, Arc<DependencyGraph>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = Arc::new(VersionStore::new(storage.clone(), CoreConfig::default()));
        let graph = Arc::new(DependencyGraph::new(storage));
        let analyzer = ImpactAnalyzer::new(store.clone(), graph.clone(), &CoreConfig::default());
        (analyzer, store, graph)
    }

    mod levels {
        use super::*;

        #[test]
        fn mapping_is_exhaustive() {
            assert_eq!(ImpactLevel::from_change(ChangeType::Major), ImpactLevel::High);
            assert_eq!(
                ImpactLevel::from_change(ChangeType::Minor),
                ImpactLevel::Medium
            );
            for change in [
                ChangeType::Patch,
                ChangeType::Creation,
                ChangeType::Rollback,
                ChangeType::Merge,
            ] {
                assert_eq!(ImpactLevel::from_change(change), ImpactLevel::Low);
            }
        }
    }

    mod keywords {
        use super::*;

        #[test]
        fn extraction_rules() {
            let (analyzer, _, _) = setup();
            let keywords = analyzer.extract_keywords(
                "The observed inflation expectations and the unemployment rate",
            );
            // Longest first, ties alphabetical; stopwords and short tokens dropped.
            assert_eq!(
                keywords,
                vec![
                    "expectations".to_string(),
                    "unemployment".to_string(),
                    "inflation".to_string(),
                    "observed".to_string(),
                    "rate".to_string(),
                ]
            );
        }

        #[test]
        fn deduplicates_case_insensitively() {
            let (analyzer, _, _) = setup();
            let keywords = analyzer.extract_keywords("Inflation INFLATION inflation");
            assert_eq!(keywords, vec!["inflation".to_string()]);
        }

        #[test]
        fn caps_at_configured_maximum() {
            let (analyzer, _, _) = setup();
            let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo lima";
            assert_eq!(analyzer.extract_keywords(text).len(), 10);
        }

        #[test]
        fn splits_on_non_alphabetic() {
            let (analyzer, _, _) = setup();
            let keywords = analyzer.extract_keywords("rate-hike2025 forecast");
            assert_eq!(
                keywords,
                vec!["forecast".to_string(), "hike".to_string(), "rate".to_string()]
            );
        }
    }

    mod analyze {
        use super::*;

        #[tokio::test]
        async fn missing_head_is_not_found() {
            let (analyzer, _, _) = setup();
            let err = analyzer.analyze(&belief("ghost"), "text").await.unwrap_err();
            assert!(matches!(err, ImpactError::NotFound(_)));
        }

        #[tokio::test]
        async fn rewrite_is_high_impact() {
            let (analyzer, store, _) = setup();
            let b = belief("b1");
            store
                .commit(&b, &BranchName::main(), "original claim", "u1", None)
                .await
                .unwrap();

            let report = analyzer
                .analyze(&b, "entirely unrelated replacement body")
                .await
                .unwrap();
            assert_eq!(report.change_type, ChangeType::Major);
            assert_eq!(report.impact_level, ImpactLevel::High);
        }

        #[tokio::test]
        async fn dependents_ranked_by_reference_count() {
            let (analyzer, store, graph) = setup();
            let main = BranchName::main();
            let b = belief("rates");
            store
                .commit(
                    &b,
                    &main,
                    "Central bank interest rates drive mortgage pricing",
                    "u1",
                    None,
                )
                .await
                .unwrap();

            let heavy = belief("heavy");
            store
                .commit(
                    &heavy,
                    &main,
                    "Mortgage rates follow central bank moves; mortgage demand tracks rates",
                    "u1",
                    None,
                )
                .await
                .unwrap();
            let light = belief("light");
            store
                .commit(&light, &main, "Housing supply is constrained", "u1", None)
                .await
                .unwrap();

            graph
                .set_depends_on(&heavy, BTreeSet::from([b.clone()]))
                .await
                .unwrap();
            graph
                .set_depends_on(&light, BTreeSet::from([b.clone()]))
                .await
                .unwrap();

            let report = analyzer
                .analyze(&b, "Central bank interest rates drive mortgage pricing upward")
                .await
                .unwrap();

            assert_eq!(report.dependents.len(), 2);
            assert_eq!(report.dependents[0].belief_id, heavy);
            assert!(report.dependents[0].reference_count > 0);
            assert!(report.dependents[0]
                .matched_keywords
                .contains(&"mortgage".to_string()));
            assert_eq!(report.dependents[1].belief_id, light);
            assert_eq!(report.dependents[1].reference_count, 0);
        }

        #[tokio::test]
        async fn keywords_come_from_current_text() {
            let (analyzer, store, _) = setup();
            let b = belief("b1");
            store
                .commit(
                    &b,
                    &BranchName::main(),
                    "established consensus position",
                    "u1",
                    None,
                )
                .await
                .unwrap();

            let report = analyzer
                .analyze(&b, "radical novel replacement")
                .await
                .unwrap();
            assert!(report.keywords.contains(&"consensus".to_string()));
            assert!(!report.keywords.contains(&"radical".to_string()));
        }

        #[tokio::test]
        async fn dependent_without_head_scores_zero() {
            let (analyzer, store, graph) = setup();
            let b = belief("b1");
            store
                .commit(&b, &BranchName::main(), "substantive content", "u1", None)
                .await
                .unwrap();

            let phantom = belief("phantom");
            graph
                .set_depends_on(&phantom, BTreeSet::from([b.clone()]))
                .await
                .unwrap();

            let report = analyzer.analyze(&b, "substantive content!").await.unwrap();
            assert_eq!(report.dependents.len(), 1);
            assert_eq!(report.dependents[0].reference_count, 0);
        }
    }
}
