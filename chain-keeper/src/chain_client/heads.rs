//! New head notifications over a websocket subscription

use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use futures_util::{stream::BoxStream, StreamExt};
use tracing::info;

use crate::chain_client::error::ChainClientError;

/// A subscription to new block headers
pub struct HeadSubscription {
    /// The websocket provider, held so the subscription stays open
    _provider: DynProvider,
    /// The stream of new head block numbers
    heads: BoxStream<'static, u64>,
}

impl HeadSubscription {
    /// Connect to the websocket endpoint and subscribe to new heads
    pub async fn connect(ws_url: &str) -> Result<Self, ChainClientError> {
        let conn = WsConnect::new(ws_url);
        let provider = ProviderBuilder::new().connect_ws(conn).await?;
        let provider = DynProvider::new(provider);

        let subscription = provider.subscribe_blocks().await?;
        let heads = subscription.into_stream().map(|header| header.number).boxed();
        info!("listening for blocks via websocket");

        Ok(Self { _provider: provider, heads })
    }

    /// Await the next head block number
    ///
    /// Returns `None` once the subscription has ended
    pub async fn next_head(&mut self) -> Option<u64> {
        self.heads.next().await
    }
}
