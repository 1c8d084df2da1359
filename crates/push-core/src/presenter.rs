//! Call-UI presenter interface
//!
//! The presenter is the native telephony UI: it shows incoming-call prompts,
//! tears calls down and receives the VoIP push token. It is injected through
//! a [`PresenterSlot`], which may still be empty when the first push
//! arrives; calls made through an empty slot return
//! [`PushError::PresenterUnavailable`] and do nothing else.
//!
//! # Examples
//!
//! ```rust
//! use rvoip_push_core::presenter::{CallPresenter, PresenterSlot};
//! use rvoip_push_core::call_event::CallEvent;
//! use rvoip_push_core::Result;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct ConsolePresenter;
//!
//! #[async_trait]
//! impl CallPresenter for ConsolePresenter {
//!     async fn show_incoming_call(&self, call: CallEvent, triggered_by_push: bool) -> Result<()> {
//!         println!("Ringing: {} (push: {})", call.name_caller(), triggered_by_push);
//!         Ok(())
//!     }
//!     async fn end_all_calls(&self) -> Result<()> {
//!         println!("Ending all calls");
//!         Ok(())
//!     }
//!     async fn set_voip_token(&self, token: &str) -> Result<()> {
//!         println!("Token: {}", token);
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let slot = PresenterSlot::empty();
//! assert!(slot.end_all_calls().await.is_err());
//!
//! slot.install(Arc::new(ConsolePresenter)).await;
//! assert!(slot.end_all_calls().await.is_ok());
//! # });
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::call_event::CallEvent;
use crate::error::{PushError, Result};

/// Native call UI operations driven by the push pipeline
#[async_trait]
pub trait CallPresenter: Send + Sync {
    /// Show the incoming-call prompt for a normalized call
    ///
    /// `triggered_by_push` is true when the prompt was caused by a VoIP push
    /// rather than by an in-app signaling channel.
    async fn show_incoming_call(&self, call: CallEvent, triggered_by_push: bool) -> Result<()>;

    /// Terminate every active call session
    async fn end_all_calls(&self) -> Result<()>;

    /// Register the current VoIP push token; empty means "no valid token"
    async fn set_voip_token(&self, token: &str) -> Result<()>;
}

/// Shared handle to a presenter that may not be initialized yet
#[derive(Clone, Default)]
pub struct PresenterSlot {
    inner: Arc<RwLock<Option<Arc<dyn CallPresenter>>>>,
}

impl PresenterSlot {
    /// A slot with no presenter installed
    pub fn empty() -> Self {
        Self::default()
    }

    /// A slot with `presenter` already installed
    pub fn with_presenter(presenter: Arc<dyn CallPresenter>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(presenter))),
        }
    }

    /// Install a presenter, returning the one it replaces
    pub async fn install(&self, presenter: Arc<dyn CallPresenter>) -> Option<Arc<dyn CallPresenter>> {
        self.inner.write().await.replace(presenter)
    }

    /// Remove the installed presenter
    pub async fn clear(&self) -> Option<Arc<dyn CallPresenter>> {
        self.inner.write().await.take()
    }

    pub async fn is_installed(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// The installed presenter, if any
    pub async fn get(&self) -> Option<Arc<dyn CallPresenter>> {
        self.inner.read().await.clone()
    }

    async fn require(&self) -> Result<Arc<dyn CallPresenter>> {
        self.get().await.ok_or(PushError::PresenterUnavailable)
    }

    pub async fn show_incoming_call(&self, call: CallEvent, triggered_by_push: bool) -> Result<()> {
        // The lock is released before the presenter runs
        let presenter = self.require().await?;
        presenter.show_incoming_call(call, triggered_by_push).await
    }

    pub async fn end_all_calls(&self) -> Result<()> {
        let presenter = self.require().await?;
        presenter.end_all_calls().await
    }

    pub async fn set_voip_token(&self, token: &str) -> Result<()> {
        let presenter = self.require().await?;
        presenter.set_voip_token(token).await
    }
}

impl std::fmt::Debug for PresenterSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenterSlot").finish_non_exhaustive()
    }
}
