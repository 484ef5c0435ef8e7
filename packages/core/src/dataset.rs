//! Dataset document: splits a raw data file into training and testing sets.

use serde::{Deserialize, Serialize};

use crate::document::{DocHeader, DocId, DocType, Document};
use crate::job::{JobDocument, ProcessingState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(flatten)]
    pub header: DocHeader,
    #[serde(default)]
    pub processing_state: ProcessingState,
    #[serde(default)]
    pub processing_log: String,
    /// Raw data file the split is taken from.
    pub datafile_id: DocId,
    pub training_percentage: f64,
    pub testing_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testing_artifact: Option<String>,
}

/// Locations of the two halves produced by a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub training_artifact: String,
    pub testing_artifact: String,
}

impl Dataset {
    pub fn new(datafile_id: impl Into<DocId>, training_percentage: f64) -> Self {
        Self {
            header: DocHeader::new(Self::DOC_TYPE),
            processing_state: ProcessingState::Pending,
            processing_log: String::new(),
            datafile_id: datafile_id.into(),
            training_percentage,
            testing_percentage: 1.0 - training_percentage,
            training_artifact: None,
            testing_artifact: None,
        }
    }
}

impl Document for Dataset {
    fn header(&self) -> &DocHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut DocHeader {
        &mut self.header
    }
}

impl JobDocument for Dataset {
    const DOC_TYPE: DocType = DocType::DATASET;

    type Output = DatasetSplit;

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

    fn apply_output(&mut self, output: DatasetSplit) {
        self.training_artifact = Some(output.training_artifact);
        self.testing_artifact = Some(output.testing_artifact);
    }
}
