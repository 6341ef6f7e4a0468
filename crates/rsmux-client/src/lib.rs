//! Reconnecting RSocket client.
//!
//! A [`Client`] multiplexes request-response, request-stream, channel and
//! fire-and-forget interactions over one connection. Each call returns an
//! [`Interaction`] whose [`ValueCell`] fills in as responses arrive. Calls made
//! before the connection is up are queued and dispatched in order once it is;
//! a lost connection cancels active interactions and is retried a bounded
//! number of times with a fixed delay.
//!
//! Every request carries composite metadata: a routing entry for the route,
//! then a bearer entry when a token resolves.
//!
//! ```no_run
//! # async fn demo() -> rsmux_client::Result<()> {
//! use rsmux_client::{connect, ClientConfig};
//! use serde_json::{json, Value};
//!
//! let client = connect(ClientConfig::new("ws://localhost:7000/rsocket").with_token("jwt"))?;
//! let echo = client.request_response::<Value>("echo", &json!({"msg": "hi"}), None)?;
//! echo.settled().await;
//! println!("{:?}", echo.get());
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod client;
pub mod config;
pub mod connector;
pub mod decoder;
pub mod error;
pub mod interaction;
pub mod metadata;
pub mod reconnect;
pub mod serializer;
pub mod token;

mod multiplexer;
mod session;

pub use cell::{CellSubscription, ValueCell};
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_KEEP_ALIVE, DEFAULT_LIFETIME};
pub use connector::{connect, connect_with};
pub use decoder::{decode, DecodeError};
pub use error::{ClientError, Result};
pub use interaction::{Interaction, InteractionState};
pub use reconnect::{ReconnectPolicy, ReconnectState};
pub use serializer::{
    DataValue, IdentitySerializer, JsonSerializer, MetadataSerializer, Serializer,
};
pub use token::TokenSource;
