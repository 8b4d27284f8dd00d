//! Canned document source for tests and local development.

use std::collections::VecDeque;

use async_trait::async_trait;
use stratus_core::{FlattenResult, SourceDocument};

use crate::{DocumentSource, FetchError};

/// Serves a fixed queue of documents in order, then reports drained.
#[derive(Debug)]
pub struct FixtureSource {
    name: String,
    documents: VecDeque<SourceDocument>,
}

impl FixtureSource {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self {
            name: "fixture".to_string(),
            documents: documents.into(),
        }
    }

    /// Builds the queue from raw response bodies. Text that is not valid
    /// JSON is rejected here, before the run starts.
    pub fn from_texts<'a, I>(texts: I) -> FlattenResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let documents = texts
            .into_iter()
            .map(SourceDocument::from_text)
            .collect::<FlattenResult<Vec<_>>>()?;
        Ok(Self::new(documents))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn push(&mut self, document: SourceDocument) {
        self.documents.push_back(document);
    }

    pub fn remaining(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl DocumentSource for FixtureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&mut self) -> Result<SourceDocument, FetchError> {
        self.documents.pop_front().ok_or(FetchError::NoDocument)
    }
}
