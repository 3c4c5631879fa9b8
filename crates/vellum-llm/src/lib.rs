//! LLM provider adapters for Vellum.
//!
//! This crate puts one interface in front of eight hosted and local LLM
//! providers and manages which one is active.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  AdapterRegistry                             │
//! │  - one adapter per provider                  │
//! │  - health records, validated switch          │
//! └──────────────────────────────────────────────┘
//!                      │ ProviderAdapter
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │  HttpAdapter<P: WireProtocol>                │
//! │  - readiness, model resolution, timeouts     │
//! │  - error reporting, ResponseValidator        │
//! └──────────────────────────────────────────────┘
//!                      │ build_request / extract_content
//!     ┌────────┬───────┼────────┬──────────┬────────┐
//!     ▼        ▼       ▼        ▼          ▼        ▼
//! ┌───────┐┌─────────┐┌──────┐┌───────┐┌──────────┐┌─────┐
//! │OpenAI ││Anthropic││Gemini││Mistral││Perplexity││Local│ ...
//! └───────┘└─────────┘└──────┘└───────┘└──────────┘└─────┘
//! ```
//!
//! Settings come from a [`vellum_config::SettingsSource`]; registry state is
//! pushed into a [`StateSink`] such as [`ProviderStore`].

pub mod adapter;
pub mod catalog;
pub mod error;
pub mod mock;
pub mod notify;
pub mod protocol;
pub mod providers;
pub mod registry;
pub mod state;
pub mod types;
pub mod validator;

pub use adapter::{
    AdapterContext, CONNECTION_TEST_PROMPT, HttpAdapter, ProviderAdapter, SharedAdapter,
};
pub use catalog::{ModelCapabilities, ModelDescriptor};
pub use error::{LlmError, Result};
pub use mock::MockAdapter;
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use protocol::{
    ExtractedContent, PreparedRequest, RequestContext, UnknownModelPolicy, WireProtocol,
};
pub use providers::{HttpAdapterFactory, create_adapter};
pub use registry::{AdapterFactory, AdapterRegistry, RegistryLifecycle};
pub use state::{NullSink, ProviderStore, RegistrySnapshot, StateSink, SubscriptionId};
pub use types::{
    AdapterHealthStatus, GenerationOptions, GenerationRequest, GenerationResult,
    ResponsePayload,
};
pub use validator::ResponseValidator;

pub use vellum_config::Provider;
