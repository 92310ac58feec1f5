// ABOUTME: Scripted LLM provider for route tests without network access
// ABOUTME: Replays queued setup failures, then streams fixed deltas, and records every request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use course_chat::llm::{
    ChatRequest, ChatResponse, ChatStream, LlmProvider, StreamChunk, UpstreamError,
};
use futures_util::stream;

/// Provider whose behaviour is fixed up front
pub struct FakeProvider {
    deltas: Vec<String>,
    mid_stream_error: Option<UpstreamError>,
    setup_failures: Mutex<VecDeque<UpstreamError>>,
    health: Result<Vec<String>, UpstreamError>,
    calls: AtomicU32,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeProvider {
    /// Stream the given deltas and report the default model as available
    pub fn replying(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| (*d).to_owned()).collect(),
            mid_stream_error: None,
            setup_failures: Mutex::new(VecDeque::new()),
            health: Ok(vec![
                "llama-3.3-70b-versatile".to_owned(),
                "llama-3.1-8b-instant".to_owned(),
            ]),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next setup attempts with these errors, in order
    pub fn with_setup_failures(self, failures: Vec<UpstreamError>) -> Self {
        *self.setup_failures.lock().unwrap() = failures.into();
        self
    }

    /// End the stream with an error after the deltas
    pub fn with_mid_stream_error(mut self, error: UpstreamError) -> Self {
        self.mid_stream_error = Some(error);
        self
    }

    /// Result returned by the health probe
    pub fn with_health(mut self, health: Result<Vec<String>, UpstreamError>) -> Self {
        self.health = health;
        self
    }

    /// Number of setup attempts made so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn begin(&self, request: &ChatRequest) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.setup_failures
            .lock()
            .unwrap()
            .pop_front()
            .map_or(Ok(()), Err)
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn display_name(&self) -> &'static str {
        "Scripted test provider"
    }

    fn base_url(&self) -> &str {
        "http://fake.invalid/openai/v1"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, UpstreamError> {
        self.begin(request)?;
        Ok(ChatResponse {
            content: self.deltas.concat(),
            model: request.model.clone(),
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, UpstreamError> {
        self.begin(request)?;

        let mut items: Vec<Result<StreamChunk, UpstreamError>> = self
            .deltas
            .iter()
            .map(|d| Ok(StreamChunk::delta(d.clone())))
            .collect();
        match &self.mid_stream_error {
            Some(error) => items.push(Err(error.clone())),
            None => items.push(Ok(StreamChunk::finished("stop"))),
        }
        Ok(Box::pin(stream::iter(items)))
    }

    async fn health_check(&self) -> Result<Vec<String>, UpstreamError> {
        self.health.clone()
    }
}
