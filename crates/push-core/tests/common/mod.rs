//! Shared test doubles for the push pipeline tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rvoip_push_core::{CallEvent, CallPresenter, Completion, PushError, Result};

/// How the recording presenter responds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    /// Never resolves
    Hang,
}

/// Presenter that records every call it receives
pub struct RecordingPresenter {
    behavior: Behavior,
    pub shown: Mutex<Vec<(CallEvent, bool)>>,
    pub ended: AtomicUsize,
    pub tokens: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            shown: Mutex::new(Vec::new()),
            ended: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(Behavior::Succeed)
    }

    pub fn ended_count(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn shown_count(&self) -> usize {
        self.shown.lock().len()
    }

    async fn respond(&self, what: &str) -> Result<()> {
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(PushError::presenter(format!("{} rejected", what))),
            Behavior::Panic => panic!("presenter crashed during {}", what),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl CallPresenter for RecordingPresenter {
    async fn show_incoming_call(&self, call: CallEvent, triggered_by_push: bool) -> Result<()> {
        self.shown.lock().push((call, triggered_by_push));
        self.respond("show_incoming_call").await
    }

    async fn end_all_calls(&self) -> Result<()> {
        self.ended.fetch_add(1, Ordering::SeqCst);
        self.respond("end_all_calls").await
    }

    async fn set_voip_token(&self, token: &str) -> Result<()> {
        self.tokens.lock().push(token.to_string());
        self.respond("set_voip_token").await
    }
}

/// A completion that counts how many times it fired
pub fn counted_completion() -> (Completion, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let completion = Completion::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (completion, count)
}
