use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crowdguess::api::HttpSessionApi;
use crowdguess::broadcaster::{BroadcasterEvent, BroadcasterHandle};
use crowdguess::channel::WsChannelConnector;
use crowdguess::config::ClientConfig;
use crowdguess::platform::ManualPlatform;
use crowdguess::session::SessionState;
use crowdguess::status;
use crowdguess::types::*;
use crowdguess::viewer::{ViewerEvent, ViewerHandle};

const HELP: &str = "\
commands:
  auth <token> [user] [channel]   deliver an identity
  broadcast <PAYLOAD>             inject a broadcast message (viewer)
  theme <light|dark>              change the platform theme
  visible <true|false>            change visibility (viewer)
  pick <lat> <lng>                select a coordinate (viewer)
  submit                          submit the selection (viewer)
  start | stop                    start or stop the round (broadcaster)
  help
  quit";

/// One line of rig input
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Auth(Authorization),
    Broadcast(String),
    Theme(Theme),
    Visible(bool),
    Pick(LatLng),
    Submit,
    Start,
    Stop,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match (name, args.as_slice()) {
        ("auth", [token, rest @ ..]) if rest.len() <= 2 => Command::Auth(Authorization {
            token: token.to_string(),
            identity_id: rest.first().unwrap_or(&"rig-user").to_string(),
            channel_id: rest.get(1).map(|c| c.to_string()),
        }),
        ("broadcast", [payload]) => Command::Broadcast(payload.to_string()),
        ("theme", ["light"]) => Command::Theme(Theme::Light),
        ("theme", ["dark"]) => Command::Theme(Theme::Dark),
        ("visible", [flag]) => Command::Visible(
            flag.parse()
                .map_err(|_| format!("Expected true or false, got {}", flag))?,
        ),
        ("pick", [lat, lng]) => {
            let lat: f64 = lat.parse().map_err(|_| format!("Invalid latitude {}", lat))?;
            let lng: f64 = lng.parse().map_err(|_| format!("Invalid longitude {}", lng))?;
            Command::Pick(LatLng::new(lat, lng))
        }
        ("submit", []) => Command::Submit,
        ("start", []) => Command::Start,
        ("stop", []) => Command::Stop,
        ("help", []) => Command::Help,
        ("quit", []) | ("exit", []) => Command::Quit,
        _ => return Err(format!("Unrecognized command: {}", line.trim())),
    };
    Ok(Some(command))
}

fn theme_context(theme: Theme) -> (PlatformContext, Vec<String>) {
    let context = PlatformContext {
        theme: Some(theme),
        ..Default::default()
    };
    (context, vec!["theme".to_string()])
}

/// Whichever controller this run drives
enum Rig {
    Viewer(ViewerHandle),
    Broadcaster(BroadcasterHandle),
}

impl Rig {
    fn start(config: &ClientConfig) -> Result<Self, String> {
        let platform = Arc::new(ManualPlatform::new());
        match config.role {
            Role::Viewer => {
                let api = HttpSessionApi::from_config(config).map_err(|e| e.to_string())?;
                tracing::info!("Viewer rig using {}", api.base_url());
                Ok(Rig::Viewer(ViewerHandle::spawn(platform, Arc::new(api))))
            }
            Role::Broadcaster => {
                let connector = WsChannelConnector::new(config.channel_url.clone());
                tracing::info!("Broadcaster rig using {}", connector.url());
                Ok(Rig::Broadcaster(BroadcasterHandle::spawn(
                    platform,
                    Arc::new(connector),
                )))
            }
        }
    }

    fn watch(&self) -> watch::Receiver<SessionState> {
        match self {
            Rig::Viewer(handle) => handle.watch(),
            Rig::Broadcaster(handle) => handle.watch(),
        }
    }

    fn identity_ready(&self, auth: Authorization) {
        match self {
            Rig::Viewer(handle) => handle.identity_ready(auth),
            Rig::Broadcaster(handle) => handle.identity_ready(auth),
        }
    }

    fn shutdown(&self) {
        match self {
            Rig::Viewer(handle) => handle.shutdown(),
            Rig::Broadcaster(handle) => handle.shutdown(),
        }
    }

    fn apply(&self, command: Command) {
        match (self, command) {
            (_, Command::Auth(auth)) => self.identity_ready(auth),
            (Rig::Viewer(h), Command::Theme(theme)) => {
                let (context, changed_keys) = theme_context(theme);
                h.send(ViewerEvent::ContextChanged {
                    context,
                    changed_keys,
                });
            }
            (Rig::Broadcaster(h), Command::Theme(theme)) => {
                let (context, changed_keys) = theme_context(theme);
                h.send(BroadcasterEvent::ContextChanged {
                    context,
                    changed_keys,
                });
            }
            (Rig::Viewer(h), Command::Broadcast(payload)) => h.broadcast(payload),
            (Rig::Broadcaster(h), Command::Broadcast(payload)) => {
                h.send(BroadcasterEvent::Broadcast(payload))
            }
            (Rig::Viewer(h), Command::Visible(visible)) => {
                h.send(ViewerEvent::VisibilityChanged(visible))
            }
            (Rig::Viewer(h), Command::Pick(coordinate)) => h.select_coordinate(coordinate),
            (Rig::Viewer(h), Command::Submit) => h.submit(),
            (Rig::Broadcaster(h), Command::Start) => h.start_round(),
            (Rig::Broadcaster(h), Command::Stop) => h.stop_round(),
            (_, Command::Help) => println!("{}", HELP),
            (_, Command::Quit) => self.shutdown(),
            (_, command) => tracing::warn!("{:?} is not available for this role", command),
        }
    }
}

fn render(role: Role, state: &SessionState) -> String {
    match role {
        Role::Viewer => status::viewer_screen(state).to_string(),
        Role::Broadcaster => status::console_screen(state).to_string(),
    }
}

/// Print the screen every time the controller publishes a change
fn spawn_printer(role: Role, mut state: watch::Receiver<SessionState>) {
    tokio::spawn(async move {
        let mut last = String::new();
        while state.changed().await.is_ok() {
            let screen = render(role, &state.borrow_and_update());
            if screen != last {
                println!("----\n{}", screen);
                last = screen;
            }
        }
    });
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crowdguess=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(role = ?config.role, "Starting CrowdGuess rig...");

    let rig = match Rig::start(&config) {
        Ok(rig) => rig,
        Err(e) => {
            tracing::error!("Failed to start rig: {}", e);
            std::process::exit(1);
        }
    };

    let mut state = rig.watch();
    spawn_printer(config.role, state.clone());

    if let Some(auth) = config.identity.clone() {
        tracing::info!(identity = %auth.identity_id, "Authorizing from environment");
        rig.identity_ready(auth);
    } else {
        println!("{}", HELP);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => rig.apply(command),
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    rig.shutdown();

    // The snapshot sender goes away once the controller task has finished
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while state.changed().await.is_ok() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Controller did not stop in time");
    }
    tracing::info!("Rig stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_variants() {
        assert_eq!(
            parse_command("auth tok").unwrap(),
            Some(Command::Auth(Authorization {
                token: "tok".to_string(),
                identity_id: "rig-user".to_string(),
                channel_id: None,
            }))
        );
        assert_eq!(
            parse_command("auth tok U1 C9").unwrap(),
            Some(Command::Auth(Authorization {
                token: "tok".to_string(),
                identity_id: "U1".to_string(),
                channel_id: Some("C9".to_string()),
            }))
        );
        assert!(parse_command("auth").is_err());
    }

    #[test]
    fn test_parse_viewer_commands() {
        assert_eq!(
            parse_command("pick 48.85 2.35").unwrap(),
            Some(Command::Pick(LatLng::new(48.85, 2.35)))
        );
        assert_eq!(
            parse_command("broadcast START").unwrap(),
            Some(Command::Broadcast("START".to_string()))
        );
        assert_eq!(
            parse_command("visible false").unwrap(),
            Some(Command::Visible(false))
        );
        assert_eq!(
            parse_command("theme dark").unwrap(),
            Some(Command::Theme(Theme::Dark))
        );
        assert_eq!(parse_command("  submit ").unwrap(), Some(Command::Submit));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert!(parse_command("pick north 2").is_err());
        assert!(parse_command("theme sepia").is_err());
        assert!(parse_command("launch").is_err());
    }
}
