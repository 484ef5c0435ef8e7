//! Classify job: labels a batch of images against a trained classifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{DocHeader, DocId, DocType, Document};
use crate::job::{JobDocument, ProcessingState};

/// Classification results keyed by image URL.
pub type ClassifyResults = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyJob {
    #[serde(flatten)]
    pub header: DocHeader,
    #[serde(default)]
    pub processing_state: ProcessingState,
    #[serde(default)]
    pub processing_log: String,
    /// Trained classifier this job runs against. Dereferenced on demand.
    pub classifier_id: DocId,
    /// Image URL to the label assigned to it.
    #[serde(default)]
    pub results: ClassifyResults,
}

impl ClassifyJob {
    /// Create a pending classify job for the given classifier.
    pub fn new(classifier_id: impl Into<DocId>) -> Self {
        Self {
            header: DocHeader::new(Self::DOC_TYPE),
            processing_state: ProcessingState::Pending,
            processing_log: String::new(),
            classifier_id: classifier_id.into(),
            results: ClassifyResults::new(),
        }
    }

    /// Seed the images to classify; labels start empty.
    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.results = images
            .into_iter()
            .map(|url| (url.into(), String::new()))
            .collect();
        self
    }
}

impl Document for ClassifyJob {
    fn header(&self) -> &DocHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut DocHeader {
        &mut self.header
    }
}

impl JobDocument for ClassifyJob {
    const DOC_TYPE: DocType = DocType::CLASSIFY_JOB;

    type Output = ClassifyResults;

    fn processing_state(&self) -> ProcessingState {
        self.processing_state
    }

    fn set_processing_state(&mut self, state: ProcessingState) {
        self.processing_state = state;
    }

    fn processing_log(&self) -> &str {
        &self.processing_log
    }

    fn set_processing_log(&mut self, log: String) {
        self.processing_log = log;
    }

    fn apply_output(&mut self, output: ClassifyResults) {
        self.results = output;
    }
}
