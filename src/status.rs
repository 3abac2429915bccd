//! Presentation model derived from session state.
//!
//! Pure functions over `SessionState`. Renderers (the extension UI, the rig)
//! read these instead of inspecting flags themselves.

use std::fmt;

use crate::classify::RequestOutcome;
use crate::session::SessionState;
use crate::types::*;

pub const KEEP_OPEN_NOTICE: &str = "Don't close this page! Viewer submissions are recorded only when this page is open (minimizing is ok!)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Check,
    Close,
    Hourglass,
}

impl StatusIcon {
    /// Material icon name
    pub fn name(&self) -> &'static str {
        match self {
            StatusIcon::Check => "check",
            StatusIcon::Close => "close",
            StatusIcon::Hourglass => "hourglass_empty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    pub icon: StatusIcon,
    pub text: &'static str,
}

impl StatusLine {
    const fn new(icon: StatusIcon, text: &'static str) -> Self {
        Self { icon, text }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.icon.name(), self.text)
    }
}

/// The one status line shown for a stored outcome
pub fn outcome_status(outcome: RequestOutcome) -> StatusLine {
    use StatusIcon::*;
    match outcome {
        RequestOutcome::Success => StatusLine::new(Check, "Voted!"),
        RequestOutcome::Unknown => StatusLine::new(Close, "Failed"),
        RequestOutcome::AuthFailed => StatusLine::new(Close, "Auth failed."),
        RequestOutcome::AlreadyVoted => StatusLine::new(Close, "You've already voted this round."),
        RequestOutcome::RoundNotActive => StatusLine::new(Hourglass, "A round hasn't started yet."),
        RequestOutcome::StreamerNotActive => {
            StatusLine::new(Hourglass, "The broadcaster hasn't started yet.")
        }
    }
}

/// Waiting notice above the viewer's controls, if any
pub fn viewer_notice(state: &SessionState) -> Option<StatusLine> {
    if !state.channel_active {
        Some(StatusLine::new(
            StatusIcon::Hourglass,
            "Hang tight! The broadcaster hasn't started yet.",
        ))
    } else if !state.round_active {
        Some(StatusLine::new(
            StatusIcon::Hourglass,
            "Hang tight! A round hasn't started yet.",
        ))
    } else {
        None
    }
}

/// Whether the submit control is enabled
pub fn submit_enabled(state: &SessionState) -> bool {
    state.submittable_coordinate().is_some()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPanel {
    pub theme: Theme,
    pub notice: Option<StatusLine>,
    pub submit_enabled: bool,
    pub outcome: Option<StatusLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerScreen {
    Loading,
    Hidden,
    Ready(ViewerPanel),
}

pub fn viewer_screen(state: &SessionState) -> ViewerScreen {
    if !state.initialized {
        return ViewerScreen::Loading;
    }
    if !state.visible {
        return ViewerScreen::Hidden;
    }
    ViewerScreen::Ready(ViewerPanel {
        theme: state.theme,
        notice: viewer_notice(state),
        submit_enabled: submit_enabled(state),
        outcome: state.request_outcome.map(outcome_status),
    })
}

impl fmt::Display for ViewerScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerScreen::Loading => write!(f, "Loading..."),
            ViewerScreen::Hidden => write!(f, "(hidden)"),
            ViewerScreen::Ready(panel) => {
                writeln!(f, "theme: {}", panel.theme.class_suffix())?;
                if let Some(notice) = &panel.notice {
                    writeln!(f, "{}", notice)?;
                }
                let submit = if panel.submit_enabled { "enabled" } else { "disabled" };
                write!(f, "Submit! ({})", submit)?;
                if let Some(outcome) = &panel.outcome {
                    write!(f, "  {}", outcome)?;
                }
                Ok(())
            }
        }
    }
}

/// The single round button, toggled by `round_active`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundControl {
    Start,
    Stop,
}

impl RoundControl {
    pub fn label(&self) -> &'static str {
        match self {
            RoundControl::Start => "Start Round",
            RoundControl::Stop => "Stop Round",
        }
    }
}

pub fn round_control(state: &SessionState) -> RoundControl {
    if state.round_active {
        RoundControl::Stop
    } else {
        RoundControl::Start
    }
}

pub fn connection_status(connection: ConnectionState) -> StatusLine {
    match connection {
        ConnectionState::Connecting => StatusLine::new(StatusIcon::Hourglass, "Connecting..."),
        ConnectionState::Connected => StatusLine::new(StatusIcon::Check, "Connected!"),
        ConnectionState::Disconnected => StatusLine::new(
            StatusIcon::Close,
            "Disconnected! Try refreshing the page.",
        ),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolePanel {
    pub theme: Theme,
    pub connection: StatusLine,
    pub round_control: RoundControl,
    pub submission_count: u64,
    /// Fixed marker for the map collaborator
    pub marker: Option<LatLng>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleScreen {
    Loading,
    Ready(ConsolePanel),
}

pub fn console_screen(state: &SessionState) -> ConsoleScreen {
    if !state.initialized {
        return ConsoleScreen::Loading;
    }
    ConsoleScreen::Ready(ConsolePanel {
        theme: state.theme,
        connection: connection_status(state.connection_state),
        round_control: round_control(state),
        submission_count: state.submission_count,
        marker: state.current_aggregate,
    })
}

impl fmt::Display for ConsoleScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleScreen::Loading => write!(f, "Loading..."),
            ConsoleScreen::Ready(panel) => {
                writeln!(f, "{}", KEEP_OPEN_NOTICE)?;
                writeln!(f, "{}", panel.connection)?;
                writeln!(
                    f,
                    "[{}]  Total submissions: {}",
                    panel.round_control.label(),
                    panel.submission_count
                )?;
                match panel.marker {
                    Some(m) => write!(f, "marker: ({}, {})", m.lat, m.lng),
                    None => write!(f, "marker: none"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BroadcastSignal;

    fn viewer() -> SessionState {
        let mut state = SessionState::new(Role::Viewer);
        state.initialized = true;
        state
    }

    #[test]
    fn test_viewer_loading_until_initialized() {
        let state = SessionState::new(Role::Viewer);
        assert_eq!(viewer_screen(&state), ViewerScreen::Loading);
    }

    #[test]
    fn test_viewer_hidden_keeps_state() {
        let mut state = viewer();
        state.visible = false;
        state.channel_active = true;
        assert_eq!(viewer_screen(&state), ViewerScreen::Hidden);
        assert!(state.channel_active);
    }

    #[test]
    fn test_viewer_notices() {
        let mut state = viewer();
        assert_eq!(
            viewer_notice(&state).unwrap().text,
            "Hang tight! The broadcaster hasn't started yet."
        );

        state.apply_signal(BroadcastSignal::Activate);
        assert_eq!(
            viewer_notice(&state).unwrap().text,
            "Hang tight! A round hasn't started yet."
        );

        state.apply_signal(BroadcastSignal::Start);
        assert_eq!(viewer_notice(&state), None);
    }

    #[test]
    fn test_submit_enabled_predicate() {
        let mut state = viewer();
        state.channel_active = true;
        state.round_active = true;
        assert!(!submit_enabled(&state));

        state.selected_coordinate = Some(LatLng::new(0.0, 0.0));
        assert!(submit_enabled(&state));

        state.round_active = false;
        assert!(!submit_enabled(&state));
    }

    #[test]
    fn test_each_outcome_has_distinct_status() {
        let outcomes = [
            RequestOutcome::Success,
            RequestOutcome::Unknown,
            RequestOutcome::AuthFailed,
            RequestOutcome::StreamerNotActive,
            RequestOutcome::RoundNotActive,
            RequestOutcome::AlreadyVoted,
        ];
        let texts: std::collections::HashSet<_> =
            outcomes.iter().map(|o| outcome_status(*o).text).collect();
        assert_eq!(texts.len(), outcomes.len());
        assert_eq!(outcome_status(RequestOutcome::Success).icon, StatusIcon::Check);
    }

    #[test]
    fn test_no_outcome_no_status() {
        let state = viewer();
        match viewer_screen(&state) {
            ViewerScreen::Ready(panel) => assert_eq!(panel.outcome, None),
            other => panic!("Expected ready screen, got {:?}", other),
        }
    }

    #[test]
    fn test_console_panel() {
        let mut state = SessionState::new(Role::Broadcaster);
        assert_eq!(console_screen(&state), ConsoleScreen::Loading);

        state.initialized = true;
        state.connection_state = ConnectionState::Connected;
        state.submission_count = 7;
        state.current_aggregate = Some(LatLng::new(10.5, -3.2));

        let ConsoleScreen::Ready(panel) = console_screen(&state) else {
            panic!("Expected ready console");
        };
        assert_eq!(panel.connection.text, "Connected!");
        assert_eq!(panel.round_control, RoundControl::Start);
        assert_eq!(panel.submission_count, 7);
        assert_eq!(panel.marker, Some(LatLng::new(10.5, -3.2)));

        state.round_active = true;
        assert_eq!(round_control(&state), RoundControl::Stop);
    }

    #[test]
    fn test_console_text_rendering() {
        let mut state = SessionState::new(Role::Broadcaster);
        state.initialized = true;
        state.connection_state = ConnectionState::Disconnected;

        let text = console_screen(&state).to_string();
        assert!(text.contains("Disconnected! Try refreshing the page."));
        assert!(text.contains("Start Round"));
        assert!(text.contains("marker: none"));
    }
}
