//! Event loop wiring
//!
//! Three dispatchers share one task: the world driver (fixed-rate stepping
//! and snapshot fan-out), the control connector and the chat connector. The
//! host feeds inbound bus messages through a `BusRouter` and subscribes to
//! the shared outbound channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval};

use crate::bus::{BusInbound, BusOutbound, OUTBOUND_CAPACITY};
use crate::chat::{ChatCommand, ChatConnector, ChatInbox, ChatMessage, ChatSource};
use crate::consts::SIM_HZ;
use crate::control::{BroadcastConnector, ControlCommand, ControlInbox, ControlTransport};
use crate::error::WorldError;
use crate::lucky::LuckyLog;
use crate::settings::Settings;
use crate::sim::{FixedStepper, World, WorldCommand, WorldEvent};
use crate::transform::{Viewport, ViewportSize, project};

/// Non-world requests for the driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    ResizeSpectator(ViewportSize),
    ReplayLuckyLog,
    Shutdown,
}

#[derive(Debug)]
pub struct WorldInbox {
    pub commands: mpsc::UnboundedReceiver<WorldCommand>,
    pub driver: mpsc::UnboundedReceiver<DriverCommand>,
}

/// Owns the world; steps it on a fixed clock and publishes projections
pub struct WorldDriver {
    world: World,
    stepper: FixedStepper,
    viewports: Vec<Viewport>,
    lucky: LuckyLog,
    commands: mpsc::UnboundedSender<WorldCommand>,
    driver: mpsc::UnboundedSender<DriverCommand>,
    outbox: broadcast::Sender<BusOutbound>,
}

impl WorldDriver {
    pub fn new(world: World, outbox: broadcast::Sender<BusOutbound>) -> (Self, WorldInbox) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (driver, driver_rx) = mpsc::unbounded_channel();
        let this = Self {
            world,
            stepper: FixedStepper::default(),
            viewports: vec![Viewport::Broadcast],
            lucky: LuckyLog::new(),
            commands,
            driver,
            outbox,
        };
        let inbox = WorldInbox {
            commands: command_rx,
            driver: driver_rx,
        };
        (this, inbox)
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewports.push(viewport);
        self
    }

    pub fn command_sender(&self) -> mpsc::UnboundedSender<WorldCommand> {
        self.commands.clone()
    }

    pub fn driver_sender(&self) -> mpsc::UnboundedSender<DriverCommand> {
        self.driver.clone()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn viewports(&self) -> &[Viewport] {
        &self.viewports
    }

    pub fn lucky_log(&self) -> &LuckyLog {
        &self.lucky
    }

    /// Apply a mutation between steps; rejected commands are logged
    pub fn apply(&mut self, command: WorldCommand) {
        if let Err(e) = self.world.apply(command) {
            log::warn!("World command rejected: {e}");
        }
    }

    /// Advance by wall-clock `elapsed_ms`; publishes only if a step ran
    pub fn frame(&mut self, elapsed_ms: f32) -> u32 {
        let outcome = self.stepper.advance(&mut self.world, elapsed_ms);
        for event in outcome.events {
            match event {
                WorldEvent::LuckyHit { body_id, payload } => {
                    log::info!("Lucky hit: {:?} by {}", body_id, payload.author_name);
                    self.lucky
                        .record(body_id, Arc::clone(&payload), self.world.time_ms());
                    self.send(BusOutbound::LuckyHit { payload });
                }
            }
        }
        if outcome.steps > 0 {
            self.publish();
        }
        outcome.steps
    }

    /// Send one projected snapshot per viewport
    pub fn publish(&self) {
        let snapshot = self.world.snapshot();
        for viewport in &self.viewports {
            self.send(BusOutbound::PhysicsSnapshot {
                viewport: viewport.kind(),
                step: snapshot.step,
                bodies: Arc::new(project(&snapshot, viewport)),
            });
        }
    }

    /// Returns false on shutdown
    pub fn handle_driver_command(&mut self, command: DriverCommand) -> bool {
        match command {
            DriverCommand::ResizeSpectator(size) => {
                if !(size.width.is_finite() && size.height.is_finite())
                    || size.width <= 0.0
                    || size.height <= 0.0
                {
                    log::warn!("Ignoring spectator resize to {}x{}", size.width, size.height);
                    return true;
                }
                for viewport in &mut self.viewports {
                    if let Viewport::Spectator { size: current, .. } = viewport {
                        *current = size;
                    }
                }
                log::debug!("Spectator viewport is now {}x{}", size.width, size.height);
            }
            DriverCommand::ReplayLuckyLog => self.send(BusOutbound::LuckyLog {
                entries: self.lucky.to_vec(),
            }),
            DriverCommand::Shutdown => return false,
        }
        true
    }

    pub async fn run(mut self, mut inbox: WorldInbox) {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / SIM_HZ as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("World loop started at {} Hz", SIM_HZ);
        let mut last = Instant::now();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last);
                    last = now;
                    self.frame(elapsed.as_secs_f32() * 1000.0);
                }
                Some(command) = inbox.commands.recv() => self.apply(command),
                Some(command) = inbox.driver.recv() => {
                    if !self.handle_driver_command(command) {
                        break;
                    }
                }
            }
        }
        log::info!(
            "World loop stopped after {} steps",
            self.world.step_count()
        );
    }

    fn send(&self, message: BusOutbound) {
        if self.outbox.send(message).is_err() {
            log::trace!("No bus subscribers for world output");
        }
    }
}

/// Routes inbound bus messages to the component that owns them
#[derive(Debug, Clone)]
pub struct BusRouter {
    world: mpsc::UnboundedSender<WorldCommand>,
    driver: mpsc::UnboundedSender<DriverCommand>,
    control: mpsc::UnboundedSender<ControlCommand>,
    chat: mpsc::UnboundedSender<ChatCommand>,
    outbox: broadcast::Sender<BusOutbound>,
    injected: u64,
}

impl BusRouter {
    pub fn dispatch(&mut self, message: BusInbound) {
        match message {
            BusInbound::SpawnComment { payload, ttl_ms } => {
                if let Err(e) = payload.validate() {
                    log::warn!("Dropping injected comment: {e}");
                    return;
                }
                self.injected += 1;
                let echo = ChatMessage::from_payload(format!("manual-{}", self.injected), &payload);
                forward(&self.world, WorldCommand::SpawnComment { payload, ttl_ms });
                if self
                    .outbox
                    .send(BusOutbound::NewMessage {
                        message: Arc::new(echo),
                    })
                    .is_err()
                {
                    log::debug!("No bus subscribers for injected comment");
                }
            }
            BusInbound::SetGravity { x, y } => forward(&self.world, WorldCommand::SetGravity { x, y }),
            BusInbound::ClearWorld => forward(&self.world, WorldCommand::ClearWorld),
            BusInbound::SetConfig(config) => forward(&self.control, ControlCommand::SetConfig(config)),
            BusInbound::SetStreaming { enabled } => {
                forward(&self.control, ControlCommand::SetStreaming(enabled))
            }
            BusInbound::SetMuted { muted } => forward(&self.control, ControlCommand::SetMuted(muted)),
            BusInbound::ChatConnect { channel_id } => {
                forward(&self.chat, ChatCommand::Connect { channel_id })
            }
            BusInbound::ChatDisconnect => forward(&self.chat, ChatCommand::Disconnect),
            BusInbound::SetCommentTtl { ttl_ms } => {
                forward(&self.chat, ChatCommand::SetCommentTtl(ttl_ms))
            }
            BusInbound::ViewportResized { width, height } => forward(
                &self.driver,
                DriverCommand::ResizeSpectator(ViewportSize::new(width, height)),
            ),
            BusInbound::RequestStatus => {
                forward(&self.control, ControlCommand::Announce);
                forward(&self.chat, ChatCommand::Announce);
            }
            BusInbound::RequestLuckyLog => forward(&self.driver, DriverCommand::ReplayLuckyLog),
        }
    }

    /// Parse and dispatch one JSON message
    pub fn dispatch_json(&mut self, text: &str) -> Result<(), serde_json::Error> {
        let message = BusInbound::from_json(text)?;
        self.dispatch(message);
        Ok(())
    }

    /// Ask every dispatcher to stop
    pub fn shutdown(&self) {
        forward(&self.driver, DriverCommand::Shutdown);
        forward(&self.control, ControlCommand::Shutdown);
        forward(&self.chat, ChatCommand::Shutdown);
    }
}

fn forward<T: std::fmt::Debug>(queue: &mpsc::UnboundedSender<T>, message: T) {
    if let Err(e) = queue.send(message) {
        log::warn!("Dropping {:?}: component stopped", e.0);
    }
}

/// The three components, wired and ready to run
pub struct Overlay<T, S> {
    driver: WorldDriver,
    driver_inbox: WorldInbox,
    control: BroadcastConnector<T>,
    control_inbox: ControlInbox,
    chat: ChatConnector<S>,
    chat_inbox: ChatInbox,
    router: BusRouter,
    outbox: broadcast::Sender<BusOutbound>,
}

impl<T: ControlTransport, S: ChatSource> Overlay<T, S> {
    pub fn new(settings: &Settings, transport: T, source: S) -> Result<Self, WorldError> {
        let (outbox, _) = broadcast::channel(OUTBOUND_CAPACITY);

        let mut world = World::new(settings.seed);
        world.initialize(settings.game_area)?;
        let (driver, driver_inbox) = WorldDriver::new(world, outbox.clone());
        let driver = driver.with_viewport(Viewport::Spectator {
            capture: settings.game_area,
            size: settings.spectator_viewport,
        });

        let (control, control_inbox) =
            BroadcastConnector::new(transport, outbox.clone(), settings.retry_delay());
        let (chat, chat_inbox) = ChatConnector::new(
            source,
            driver.command_sender(),
            outbox.clone(),
            settings.retry_delay(),
        );
        let chat = chat
            .with_comment_ttl(settings.comment_ttl_ms)
            .with_seed(settings.seed.rotate_left(32));

        let router = BusRouter {
            world: driver.command_sender(),
            driver: driver.driver_sender(),
            control: control.command_sender(),
            chat: chat.command_sender(),
            outbox: outbox.clone(),
            injected: 0,
        };

        if settings.control.endpoint.is_empty() {
            log::info!("No broadcast control endpoint configured");
        } else {
            forward(&router.control, ControlCommand::SetConfig(settings.control.clone()));
        }
        if !settings.chat.channel_id.is_empty() {
            forward(
                &router.chat,
                ChatCommand::Connect {
                    channel_id: settings.chat.channel_id.clone(),
                },
            );
        }

        Ok(Self {
            driver,
            driver_inbox,
            control,
            control_inbox,
            chat,
            chat_inbox,
            router,
            outbox,
        })
    }

    pub fn router(&self) -> BusRouter {
        self.router.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusOutbound> {
        self.outbox.subscribe()
    }

    /// Run all dispatchers until `BusRouter::shutdown`
    pub async fn run(self) {
        let Self {
            driver,
            driver_inbox,
            control,
            control_inbox,
            chat,
            chat_inbox,
            ..
        } = self;
        tokio::join!(
            driver.run(driver_inbox),
            control.run(control_inbox),
            chat.run(chat_inbox),
        );
    }
}
