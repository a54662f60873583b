//! Bot main loop.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::channels::ChannelManager;
use crate::dialogue::Flow;
use crate::error::Error;
use crate::registration::Registrar;

use super::dispatcher::Dispatcher;

/// Ties channels to the dispatcher and runs until Ctrl+C or until every
/// channel stream ends.
pub struct Bot {
    channels: Arc<ChannelManager>,
    dispatcher: Dispatcher,
}

impl Bot {
    pub fn new(
        channels: ChannelManager,
        flow: Arc<dyn Flow>,
        registrar: Arc<dyn Registrar>,
        session_idle_timeout: Duration,
    ) -> Self {
        let channels = Arc::new(channels);
        let dispatcher = Dispatcher::new(
            flow,
            registrar,
            Arc::clone(&channels),
            session_idle_timeout,
        );
        Self {
            channels,
            dispatcher,
        }
    }

    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        tracing::info!(channels = ?self.channels.names(), "Signup bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            tracing::debug!(
                id = %message.id,
                channel = %message.channel,
                user_id = %message.user_id,
                user_name = message.user_name.as_deref().unwrap_or("-"),
                kind = ?message.kind,
                "Received message"
            );
            self.dispatcher.dispatch(message);
        }

        self.dispatcher.shutdown().await;
        self.channels.shutdown_all().await?;
        Ok(())
    }
}
