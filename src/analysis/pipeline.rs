//! The analysis orchestrator.
//!
//! Runs the stages in a fixed order, each consuming the outputs of its
//! predecessors. Single-threaded within one analysis; reentrant across
//! analyses (no process-wide mutable state). Cancellation is checked
//! between stages only, and a cancelled run never touches the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::character::CharacterAnalyzer;
use crate::analysis::emotion::{EmotionAnalyzer, LexiconSentimentScorer, SentimentScorer};
use crate::analysis::entity::EntityExtractor;
use crate::analysis::event::EventAnalyzer;
use crate::analysis::location::LocationAnalyzer;
use crate::analysis::progress::ProgressReporter;
use crate::analysis::relation::RelationExtractor;
use crate::analysis::state::StateTracker;
use crate::analysis::timeline::{link_strength, TimelineAnalyzer};
use crate::config::AnalysisConfig;
use crate::db::store::GraphStore;
use crate::models::{AnalysisBundle, CausalLink, Novel, Statistics};
use crate::text::{Lexicons, TextProcessor};
use crate::AnalysisError;

/// Cooperative cancellation signal, checked between stages.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The fixed stage sequence over one novel.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    lexicons: Arc<Lexicons>,
    processor: TextProcessor,
    scorer: Arc<dyn SentimentScorer>,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig, lexicons: Arc<Lexicons>) -> Self {
        let scorer = Arc::new(LexiconSentimentScorer::new(Arc::clone(&lexicons)));
        Self {
            config,
            lexicons,
            processor: TextProcessor::new(),
            scorer,
        }
    }

    /// Replace the default sentiment scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the default text processor (e.g. one with a custom dictionary).
    pub fn with_processor(mut self, processor: TextProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full pipeline over one novel and persist the bundle.
    ///
    /// `NoEntitiesFound` from the entity stage terminates successfully with
    /// an empty bundle. A store failure after a successful in-memory run
    /// returns the bundle with `persisted = false`.
    pub async fn analyze(
        &self,
        novel: &Novel,
        store: Option<&dyn GraphStore>,
        progress: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<AnalysisBundle, AnalysisError> {
        info!(novel = %novel.id, chapters = novel.chapters.len(), "analysis started");

        cancel.check()?;
        progress.report(5, "processing text").await;
        let chapters = self.processor.process(novel)?;
        let statistics_base = Statistics {
            chapters: chapters.len(),
            words: novel.total_words(),
            ..Statistics::default()
        };

        cancel.check()?;
        progress.report(15, "extracting entities").await;
        let extractor = EntityExtractor::new(&self.processor, &self.lexicons, &self.config);
        let entities = match extractor.extract(&chapters) {
            Ok(entities) => entities,
            Err(AnalysisError::NoEntitiesFound(reason)) => {
                warn!(%reason, "degenerate input, returning empty bundle");
                let mut bundle = AnalysisBundle::empty(
                    &novel.id,
                    &novel.title,
                    novel.author.clone(),
                    statistics_base,
                );
                bundle.normalize();
                persist(store, novel, &mut bundle).await;
                progress.report(100, "analysis complete (no entities)").await;
                return Ok(bundle);
            }
            Err(e) => return Err(stage_error("entities", e)),
        };

        cancel.check()?;
        progress.report(30, "extracting relations").await;
        let relations = RelationExtractor::new(&self.processor, &self.lexicons, &self.config)
            .extract(&chapters, &entities.characters);

        cancel.check()?;
        progress.report(40, "scoring characters").await;
        let character_analysis = CharacterAnalyzer::new(&self.config)
            .analyze(entities.characters, &relations, chapters.len() as u32)
            .map_err(|e| stage_error("characters", e))?;
        let characters = character_analysis.characters;

        cancel.check()?;
        progress.report(55, "detecting events").await;
        let events = EventAnalyzer::new(&self.processor, &self.lexicons, &self.config)
            .extract(&chapters, &characters, &entities.locations)
            .map_err(|e| stage_error("events", e))?;

        cancel.check()?;
        progress.report(70, "building timeline").await;
        let timeline = TimelineAnalyzer::new(&self.lexicons, &self.config)
            .analyze(events, &characters);

        cancel.check()?;
        progress.report(78, "analyzing locations").await;
        let location_analysis = LocationAnalyzer::analyze(
            &chapters,
            &timeline.events,
            entities.locations,
            &characters,
        );

        cancel.check()?;
        progress.report(88, "analyzing emotions").await;
        let emotion_analysis = EmotionAnalyzer::new(&self.lexicons, &self.config, &*self.scorer)
            .analyze(&chapters, &characters);

        cancel.check()?;
        progress.report(95, "tracking states").await;
        let state_analysis =
            StateTracker::new(&self.lexicons, &self.config).analyze(&chapters, &characters, &timeline.events);

        // State-sharing causal links can only be derived once transitions
        // exist; augment the cue-based links without disturbing the
        // contribution scores already computed.
        let causal_links = augment_causal_links(
            timeline.causal_links,
            &timeline.events,
            &state_analysis.transitions,
            &self.config,
        );

        let statistics = Statistics {
            characters: characters.len(),
            relations: relations.len(),
            events: timeline.events.len(),
            locations: location_analysis.locations.len(),
            main_plot_events: timeline.main_plot_events.len(),
            ..statistics_base
        };

        let chapter_summaries = chapters
            .iter()
            .map(|c| crate::models::ChapterSummary {
                index: c.index,
                title: c.title.clone(),
                word_count: c.word_count,
            })
            .collect();

        let mut bundle = AnalysisBundle {
            novel_id: novel.id.clone(),
            title: novel.title.clone(),
            author: novel.author.clone(),
            chapters: chapter_summaries,
            characters,
            relations,
            events: timeline.events,
            hierarchy: timeline.hierarchy,
            causal_links,
            main_plot_events: timeline.main_plot_events,
            locations: location_analysis.locations,
            visits: location_analysis.visits,
            scene_transitions: location_analysis.transitions,
            chapter_emotions: emotion_analysis.chapter_emotions,
            character_emotions: emotion_analysis.character_emotions,
            emotion_curve: emotion_analysis.curve,
            emotional_peaks: emotion_analysis.peaks,
            states: state_analysis.states,
            state_transitions: state_analysis.transitions,
            communities: character_analysis.communities,
            statistics,
            persisted: false,
        };
        bundle.normalize();

        cancel.check()?;
        persist(store, novel, &mut bundle).await;
        progress.report(100, "analysis complete").await;
        info!(novel = %novel.id, persisted = bundle.persisted, "analysis finished");
        Ok(bundle)
    }
}

/// Write the bundle; a store failure is reported through the `persisted`
/// flag rather than failing the run. The flag is set before the write so
/// the archived copy equals the returned bundle.
async fn persist(store: Option<&dyn GraphStore>, novel: &Novel, bundle: &mut AnalysisBundle) {
    let Some(store) = store else {
        bundle.persisted = false;
        return;
    };
    bundle.persisted = true;
    if let Err(e) = store.upsert_bundle(&novel.id, bundle).await {
        warn!(novel = %novel.id, error = %e, "graph store write failed");
        bundle.persisted = false;
    }
}

fn stage_error(stage: &'static str, err: AnalysisError) -> AnalysisError {
    match err {
        AnalysisError::Cancelled => AnalysisError::Cancelled,
        AnalysisError::StageFailure { stage, cause } => {
            AnalysisError::StageFailure { stage, cause }
        }
        other => AnalysisError::StageFailure {
            stage,
            cause: other.to_string(),
        },
    }
}

/// Add causal links for event pairs that share a state transition across
/// their span, on top of the cue-based links.
fn augment_causal_links(
    mut links: Vec<CausalLink>,
    events: &[crate::models::Event],
    transitions: &[crate::models::StateTransition],
    config: &AnalysisConfig,
) -> Vec<CausalLink> {
    use std::collections::BTreeSet;

    let mut existing: BTreeSet<(String, String)> = links
        .iter()
        .map(|l| (l.cause.clone(), l.effect.clone()))
        .collect();

    for transition in transitions {
        if transition.from_chapter == transition.to_chapter {
            continue;
        }
        for (i, cause) in events.iter().enumerate() {
            if cause.chapter != transition.from_chapter
                || !cause.participants.contains(&transition.character)
                || cause.importance_score < config.causal_importance_floor
            {
                continue;
            }
            for effect in events.iter().skip(i + 1) {
                if effect.chapter != transition.to_chapter
                    || !effect.participants.contains(&transition.character)
                    || effect.importance_score < config.causal_importance_floor
                {
                    continue;
                }
                let shared = cause
                    .participants
                    .intersection(&effect.participants)
                    .count();
                let key = (cause.id.clone(), effect.id.clone());
                if existing.contains(&key) {
                    // A cue link already exists; fold the state signal in.
                    if let Some(link) = links
                        .iter_mut()
                        .find(|l| l.cause == key.0 && l.effect == key.1)
                    {
                        link.strength = link_strength(shared, true, true);
                    }
                    continue;
                }
                links.push(CausalLink {
                    cause: cause.id.clone(),
                    effect: effect.id.clone(),
                    strength: link_strength(shared, false, true),
                });
                existing.insert(key);
            }
        }
    }
    links
}
