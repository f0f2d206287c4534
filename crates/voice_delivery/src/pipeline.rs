//! Voice delivery pipeline
//!
//! Drives one group's voice session through
//! `Disconnected -> Connecting -> Idle -> Playing -> Draining -> Idle`,
//! with `Leaving -> Disconnected` reachable from any connected state.
//!
//! Each delivery runs inside the group's scheduler slot, so at most one task
//! touches a session at a time. Every transport wait and the transcode step
//! are bounded. Joining and readiness share one deadline; a connect that
//! misses it is destroyed, a playback that stalls fails the task but keeps the
//! connection for the next one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use speech_synthesis::{AudioData, SynthesisError};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, instrument, warn};

use crate::config::DeliveryConfig;
use crate::error::{DeliveryError, TransportError, WaitStage};
use crate::scheduler::{PlaybackHandle, PlaybackScheduler};
use crate::session::{DeliveryState, SessionRegistry};
use crate::transcoder::Transcoder;
use crate::transport::{
    AudioPlayer, Destination, GroupId, PlaybackSource, VoiceConnection, VoiceTransport,
};

/// Result of an explicit leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// A connection existed and was destroyed
    Left,
    /// Nothing to leave
    NotConnected,
}

/// Schedules deliveries per group and runs the connection state machine
pub struct VoiceDeliveryPipeline {
    scheduler: PlaybackScheduler<GroupId>,
    delivery: Arc<Delivery>,
}

struct Delivery {
    transport: Arc<dyn VoiceTransport>,
    transcoder: Arc<dyn Transcoder>,
    sessions: SessionRegistry,
    config: DeliveryConfig,
}

impl std::fmt::Debug for VoiceDeliveryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceDeliveryPipeline")
            .field("scheduler", &self.scheduler)
            .field("sessions", &self.delivery.sessions)
            .field("config", &self.delivery.config)
            .finish_non_exhaustive()
    }
}

impl VoiceDeliveryPipeline {
    #[must_use]
    pub fn new(
        transport: Arc<dyn VoiceTransport>,
        transcoder: Arc<dyn Transcoder>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            scheduler: PlaybackScheduler::new(),
            delivery: Arc::new(Delivery {
                transport,
                transcoder,
                sessions: SessionRegistry::new(),
                config,
            }),
        }
    }

    /// Queue a delivery of `audio` to `destination`
    ///
    /// `audio` is awaited only once the group's earlier deliveries have
    /// finished, so playback follows submission order even when synthesis
    /// latencies differ.
    pub fn deliver<F>(
        &self,
        destination: Destination,
        audio: F,
    ) -> PlaybackHandle<Result<(), DeliveryError>>
    where
        F: Future<Output = Result<AudioData, SynthesisError>> + Send + 'static,
    {
        let delivery = Arc::clone(&self.delivery);
        self.scheduler
            .enqueue(destination.group, async move { delivery.run(destination, audio).await })
    }

    /// Destroy the group's connection, bypassing the queue
    ///
    /// A delivery in flight for the group fails at its next transport wait.
    pub fn leave(&self, group: GroupId) -> LeaveOutcome {
        match self.delivery.sessions.take(group) {
            Some(connection) => {
                connection.destroy();
                info!(%group, channel = %connection.channel(), "Left voice channel");
                LeaveOutcome::Left
            },
            None => {
                debug!(%group, "Leave requested without a connection");
                LeaveOutcome::NotConnected
            },
        }
    }

    #[must_use]
    pub fn state(&self, group: GroupId) -> DeliveryState {
        self.delivery.sessions.state(group)
    }

    /// Groups with a live or pending connection
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.delivery.sessions.len()
    }

    /// Whether deliveries are running or queued for `group`
    #[must_use]
    pub fn is_busy(&self, group: GroupId) -> bool {
        !self.scheduler.is_idle(&group)
    }
}

impl Delivery {
    #[instrument(skip(self, audio), fields(destination = %destination))]
    async fn run<F>(&self, destination: Destination, audio: F) -> Result<(), DeliveryError>
    where
        F: Future<Output = Result<AudioData, SynthesisError>> + Send,
    {
        let audio = audio.await?;
        debug!(format = %audio.format(), size = audio.size_bytes(), "Audio ready for delivery");

        let connection = self.connect(destination).await?;
        let result = self.play(destination.group, &connection, &audio).await;

        if let Err(err) = &result {
            warn!(error = %err, "Delivery failed");
        }
        result
    }

    /// Reuse the group's connection or build one for the requested channel
    async fn connect(
        &self,
        destination: Destination,
    ) -> Result<Arc<dyn VoiceConnection>, DeliveryError> {
        let group = destination.group;

        if let Some(existing) = self.sessions.connection(group) {
            if existing.channel() == destination.channel && !existing.is_destroyed() {
                debug!("Reusing voice connection");
                return Ok(existing);
            }
            info!(from = %existing.channel(), to = %destination.channel, "Rebinding voice session");
            if let Some(old) = self.sessions.take(group) {
                old.destroy();
            }
        }

        self.sessions.begin_connect(group);

        let limit = self.config.ready_timeout();
        let deadline = Instant::now() + limit;

        let joined = within(
            WaitStage::Ready,
            limit,
            deadline,
            self.transport.join(&destination),
        )
        .await;
        let connection = match joined {
            Ok(connection) => connection,
            Err(err) => {
                self.sessions.abandon_connect(group);
                return Err(err);
            },
        };

        if let Err(err) = within(WaitStage::Ready, limit, deadline, connection.wait_ready()).await {
            connection.destroy();
            self.sessions.abandon_connect(group);
            return Err(err);
        }

        self.sessions.bind(group, Arc::clone(&connection));
        Ok(connection)
    }

    async fn play(
        &self,
        group: GroupId,
        connection: &Arc<dyn VoiceConnection>,
        audio: &AudioData,
    ) -> Result<(), DeliveryError> {
        self.sessions
            .transition(group, connection, DeliveryState::Playing);

        let limit = self.config.transcode_timeout();
        let transcoded = timeout(limit, self.transcoder.to_stream_codec(audio))
            .await
            .unwrap_or_else(|_| {
                Err(DeliveryError::Transcode(format!(
                    "conversion did not finish within {limit:?}"
                )))
            });
        let source = match transcoded {
            Ok(source) => source,
            Err(err) => {
                self.sessions.transition(group, connection, DeliveryState::Idle);
                return Err(err);
            },
        };

        let player = self.transport.create_player();
        if let Err(err) = connection.subscribe(Arc::clone(&player)) {
            warn!(error = %err, "Player subscription failed, destroying connection");
            player.stop();
            connection.destroy();
            self.sessions.release(group, connection);
            return Err(DeliveryError::Subscription(err.to_string()));
        }

        let outcome = self
            .stream(group, connection, player.as_ref(), source)
            .await;

        connection.unsubscribe();
        player.stop();

        let unrecoverable = outcome
            .as_ref()
            .err()
            .is_some_and(DeliveryError::is_unrecoverable)
            || connection.is_destroyed();
        if unrecoverable {
            connection.destroy();
            self.sessions.release(group, connection);
        } else {
            self.sessions.transition(group, connection, DeliveryState::Idle);
        }

        outcome
    }

    async fn stream(
        &self,
        group: GroupId,
        connection: &Arc<dyn VoiceConnection>,
        player: &dyn AudioPlayer,
        source: PlaybackSource,
    ) -> Result<(), DeliveryError> {
        player.play(source)?;
        bounded(
            WaitStage::Started,
            self.config.start_timeout(),
            player.wait_started(),
        )
        .await?;
        bounded(
            WaitStage::Finished,
            self.config.finish_timeout(),
            player.wait_finished(),
        )
        .await?;

        if self.config.silence_frames > 0 {
            self.sessions
                .transition(group, connection, DeliveryState::Draining);
            if let Err(err) = self.drain(player).await {
                // The clip itself already played
                warn!(error = %err, "Silence flush failed");
            }
        }

        Ok(())
    }

    /// Push trailing silence so the transport emits its buffered frames
    async fn drain(&self, player: &dyn AudioPlayer) -> Result<(), DeliveryError> {
        player.play(PlaybackSource::silence(self.config.silence_frames))?;
        bounded(
            WaitStage::DrainStarted,
            self.config.drain_start_timeout(),
            player.wait_started(),
        )
        .await?;
        bounded(
            WaitStage::DrainFinished,
            self.config.drain_finish_timeout(),
            player.wait_finished(),
        )
        .await
    }
}

/// Await a transport wait for at most `limit`
async fn bounded<F>(stage: WaitStage, limit: Duration, wait: F) -> Result<(), DeliveryError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    within(stage, limit, Instant::now() + limit, wait).await
}

/// Await a transport call until `deadline`; `limit` is the budget reported on timeout
async fn within<T, F>(
    stage: WaitStage,
    limit: Duration,
    deadline: Instant,
    wait: F,
) -> Result<T, DeliveryError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match timeout_at(deadline, wait).await {
        Ok(result) => result.map_err(DeliveryError::from),
        Err(_) => {
            warn!(%stage, ?limit, "Transport wait timed out");
            Err(DeliveryError::TransportTimeout {
                stage,
                after: limit,
            })
        },
    }
}
