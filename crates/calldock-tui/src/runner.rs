//! Main TUI runner - entry point and event loop

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use calldock_app::{config_dir, load_settings, CallWidget, HookEvent, Settings, WidgetInput};
use calldock_core::prelude::*;
use calldock_core::types::{AppId, Peer, UserId};
use calldock_rtc::{CallClient, LoopbackSwitch, MediaDeviceRegistry, SdkEvent, WsTransport};

use crate::event::{self, TermEvent};
use crate::{render, terminal};

/// How the host wants the widget brought up.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Application id; overrides the configured one.
    pub app_id: Option<String>,
    /// Local identity for the signaling connection.
    pub user_id: Option<String>,
    /// Signaling endpoint; overrides the configured one.
    pub endpoint: Option<String>,
    /// Run against an in-process switchboard instead of a real service.
    pub demo: bool,
    /// Peer registered on the demo switchboard that auto-answers calls.
    pub demo_peer: Option<String>,
    /// Directory whose `.calldock/` holds the config.
    pub project_dir: Option<PathBuf>,
}

/// Run the widget host until the user quits.
pub async fn run(options: RunOptions) -> Result<()> {
    let dir = config_dir(options.project_dir.as_deref());
    let mut settings = load_settings(&dir);
    if let Some(app_id) = &options.app_id {
        settings.app_id = app_id.clone();
    }
    if settings.app_id.is_empty() {
        settings.app_id = "calldock-demo".to_string();
    }
    if let Some(endpoint) = &options.endpoint {
        settings.endpoint = Some(endpoint.clone());
    }

    let app_id = AppId::new(settings.app_id.clone());
    let (client, events, demo_task) = if options.demo {
        connect_demo(&app_id, &options)
    } else {
        connect_remote(&app_id, &settings, &options).await?
    };

    let (mut widget, input_rx, hook_rx) = CallWidget::new(
        client,
        events,
        MediaDeviceRegistry::with_defaults(),
        settings,
        dir,
    )?;

    terminal::install_panic_hook();
    let mut term = ratatui::init();
    let result = run_loop(&mut term, &mut widget, input_rx, hook_rx);
    ratatui::restore();

    widget.shutdown();
    if let Some(task) = demo_task {
        task.abort();
    }
    result
}

type Connection = (
    CallClient,
    mpsc::UnboundedReceiver<SdkEvent>,
    Option<tokio::task::JoinHandle<()>>,
);

/// Demo mode: an in-process switchboard with an auto-answering peer.
fn connect_demo(app_id: &AppId, options: &RunOptions) -> Connection {
    let switch = LoopbackSwitch::new();
    let local = options.user_id.clone().unwrap_or_else(|| "you".to_string());
    let bot = options
        .demo_peer
        .clone()
        .unwrap_or_else(|| "demo-bot".to_string());
    info!(user = %local, peer = %bot, "demo switchboard up");

    let transport = switch.register(Peer::new(local.as_str()));
    let bot_task = spawn_demo_peer(&switch, app_id.clone(), &bot);
    let (client, events) = CallClient::connect(app_id.clone(), transport);
    (client, events, Some(bot_task))
}

async fn connect_remote(
    app_id: &AppId,
    settings: &Settings,
    options: &RunOptions,
) -> Result<Connection> {
    let endpoint = settings
        .endpoint
        .clone()
        .ok_or_else(|| Error::config_invalid("no signaling endpoint configured"))?;
    let user_id = options
        .user_id
        .clone()
        .or_else(|| settings.auto_login.as_ref().map(|l| l.user_id.clone()))
        .ok_or_else(|| Error::config_invalid("no user identity configured"))?;

    let transport = WsTransport::connect(&endpoint, app_id, &UserId::new(user_id)).await?;
    let (client, events) = CallClient::connect(app_id.clone(), transport);
    Ok((client, events, None))
}

/// A second client on the switchboard that answers every call after a short
/// ring.
fn spawn_demo_peer(
    switch: &LoopbackSwitch,
    app_id: AppId,
    name: &str,
) -> tokio::task::JoinHandle<()> {
    let transport = switch.register(Peer::new(name).with_nickname("Demo Bot"));
    let user = UserId::new(name);
    tokio::spawn(async move {
        let (client, mut events) = CallClient::connect(app_id, transport);
        if let Err(e) = client.authenticate(user, None).await {
            warn!("demo peer could not authenticate: {e}");
            return;
        }
        while let Some(event) = events.recv().await {
            if let SdkEvent::Ringing(call) = event {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                if let Err(e) = call.accept() {
                    debug!("demo peer accept failed: {e}");
                }
            }
        }
    })
}

/// Main event loop: drain widget inputs, draw, poll the terminal.
fn run_loop(
    term: &mut ratatui::DefaultTerminal,
    widget: &mut CallWidget,
    mut input_rx: mpsc::UnboundedReceiver<WidgetInput>,
    mut hook_rx: mpsc::UnboundedReceiver<HookEvent>,
) -> Result<()> {
    loop {
        // Timer ticks, SDK events, and async completions.
        while let Ok(input) = input_rx.try_recv() {
            widget.handle(input);
        }

        // A real host would react to these; this one just records them.
        while let Ok(event) = hook_rx.try_recv() {
            log_hook(&event);
        }

        term.draw(|frame| render::view(frame, widget))?;

        match event::poll()? {
            TermEvent::Quit => return Ok(()),
            TermEvent::Gesture(gesture) => widget.handle(WidgetInput::Gesture(gesture)),
            TermEvent::Tick => {}
        }
    }
}

fn log_hook(event: &HookEvent) {
    match event {
        HookEvent::PageChanged(page) => debug!(%page, "page changed"),
        HookEvent::LoginSucceeded(peer) => info!(user = %peer.user_id, "logged in"),
        HookEvent::LoginFailed { message } => warn!(%message, "login failed"),
        HookEvent::LoggedOut => info!("logged out"),
        HookEvent::WidgetOpened { reason } => debug!(?reason, "widget opened"),
        HookEvent::WidgetClosed => debug!("widget closed"),
        HookEvent::CallStarted(call_id) => info!(call = %call_id, "call started"),
        HookEvent::CallEnded(call_id) => info!(call = %call_id, "call ended"),
    }
}
