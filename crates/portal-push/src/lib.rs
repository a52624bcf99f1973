//! # portal-push
//!
//! Push-notification transport for the portal backend.
//!
//! Provides the HTTP gateway client used in production plus a mock transport
//! for tests. Both implement [`portal_core::PushTransport`].

pub mod gateway;
pub mod mock;

pub use gateway::GatewayPushClient;
pub use mock::MockPushTransport;
