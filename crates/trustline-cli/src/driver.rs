//! Terminal driver: stdin commands, stdout notices, WebSocket transport.

use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
    task::AbortHandle,
    time::{Interval, MissedTickBehavior},
};
use trustline_app::{Command, CommandError, Delivery, Driver, Input, Notice};
use trustline_client::{
    Environment, Identity, Session, SystemEnv,
    transport::{self, TransportConfig, TransportEvent},
};

use crate::render::Renderer;

/// How often connection timeouts are checked.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Outbound frames buffered while the socket is busy.
const OUTBOUND_CAPACITY: usize = 32;

/// Driver errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Live transport: the outbound queue and the task pumping the socket.
struct Link {
    outbound: mpsc::Sender<String>,
    pump: AbortHandle,
}

/// Driver for an interactive terminal session.
pub struct CliDriver {
    env: SystemEnv,
    config: TransportConfig,
    stdin: Lines<BufReader<Stdin>>,
    stdout: io::Stdout,
    renderer: Renderer,
    ticks: Interval,
    /// Transport lifecycle and frames, posted by the pump task.
    inputs_tx: mpsc::UnboundedSender<Input<Instant>>,
    inputs_rx: mpsc::UnboundedReceiver<Input<Instant>>,
    link: Option<Link>,
}

impl CliDriver {
    /// Create a driver. The first input it delivers is a connect command.
    pub fn new(env: SystemEnv, config: TransportConfig) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        // Receiver is held by self, so this cannot fail.
        let _ = inputs_tx.send(Input::Command(Command::Connect));

        let mut ticks = tokio::time::interval(TICK_INTERVAL);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            env,
            config,
            stdin: BufReader::new(tokio::io::stdin()).lines(),
            stdout: io::stdout(),
            renderer: Renderer::default(),
            ticks,
            inputs_tx,
            inputs_rx,
            link: None,
        }
    }

    fn complain(&self, error: &CommandError) -> io::Result<()> {
        let mut out = self.stdout.lock();
        writeln!(out, "! {error}")
    }
}

impl Driver for CliDriver {
    type Error = CliError;
    type Instant = Instant;

    async fn next_input(&mut self) -> Result<Option<Input<Instant>>, CliError> {
        loop {
            tokio::select! {
                Some(input) = self.inputs_rx.recv() => return Ok(Some(input)),
                _ = self.ticks.tick() => return Ok(Some(Input::Tick(self.env.now()))),
                line = self.stdin.next_line() => {
                    let Some(line) = line? else {
                        return Ok(None);
                    };
                    match Command::parse(&line) {
                        Ok(command) => return Ok(Some(Input::Command(command))),
                        Err(CommandError::Empty) => {},
                        Err(e) => self.complain(&e)?,
                    }
                },
            }
        }
    }

    fn open(&mut self, identity: &Identity, attempt: u64) -> Result<(), CliError> {
        self.close();

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let pump = tokio::spawn(pump(
            self.config.clone(),
            identity.clone(),
            attempt,
            outbound_rx,
            self.inputs_tx.clone(),
        ));
        self.link = Some(Link { outbound: outbound_tx, pump: pump.abort_handle() });
        Ok(())
    }

    fn transmit(&mut self, frame: String) -> Result<Delivery, CliError> {
        let Some(link) = &self.link else {
            tracing::warn!("transmit without a transport");
            return Ok(Delivery::Dropped);
        };
        match link.outbound.try_send(frame) {
            Ok(()) => Ok(Delivery::Queued),
            Err(e) => {
                tracing::warn!(error = %e, "outbound frame dropped");
                Ok(Delivery::Dropped)
            },
        }
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            // Dropping the outbound sender lets the pump close the socket
            // gracefully; the abort covers a pump still connecting.
            drop(link.outbound);
            link.pump.abort();
        }
    }

    fn notify<E>(&mut self, session: &Session<E>, notice: Notice) -> Result<(), CliError>
    where
        E: Environment<Instant = Instant>,
    {
        let mut out = self.stdout.lock();
        self.renderer.render(&mut out, session, &notice)?;
        Ok(())
    }
}

/// Connect, then shuttle frames between the socket and the driver until
/// either side closes. Every lifecycle report carries `attempt`.
async fn pump(
    config: TransportConfig,
    identity: Identity,
    attempt: u64,
    mut outbound: mpsc::Receiver<String>,
    inputs: mpsc::UnboundedSender<Input<Instant>>,
) {
    let closed = |reason: String| Input::Closed { attempt, reason };

    let mut socket = match transport::connect(&config, &identity).await {
        Ok(socket) => socket,
        Err(e) => {
            if e.is_transient() {
                tracing::warn!(error = %e, attempt, "connect failed, /connect to retry");
            } else {
                tracing::error!(error = %e, attempt, "connect rejected");
            }
            let _ = inputs.send(closed(e.to_string()));
            return;
        },
    };
    let _ = inputs.send(Input::Opened { attempt });

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if socket.to_server.send(frame).await.is_err() {
                        let _ = inputs.send(closed("socket task ended".to_string()));
                        return;
                    }
                },
                // Driver closed the link; dropping the socket closes it.
                None => return,
            },
            event = socket.from_server.recv() => match event {
                Some(TransportEvent::Frame(text)) => {
                    let _ = inputs.send(Input::Frame(text));
                },
                Some(TransportEvent::Closed { reason }) => {
                    let _ = inputs.send(closed(reason));
                    return;
                },
                None => {
                    let _ = inputs.send(closed("socket task ended".to_string()));
                    return;
                },
            },
        }
    }
}
