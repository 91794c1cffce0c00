//! Silent fallback engine, used when no speech backend is installed

use super::{SpeechEngine, UtteranceRequest};
use crate::voice::Voice;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug)]
pub struct SilentEngine;

impl Default for SilentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SilentEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechEngine for SilentEngine {
    async fn speak(&self, request: &UtteranceRequest) -> Result<()> {
        debug!("Silent engine dropping utterance {}", request.id);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        Ok(())
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "silent"
    }
}
