use super::dispatch::{ActionDispatcher, DispatchOutcome};
use super::mode::{ModalStateMachine, Mode, ShortcutEffect, Transition};
use super::shortcuts::{ShortcutDescriptor, ShortcutFilter, ShortcutSuppressionSet};
use super::window::{CaretColor, EditorWindow, KeyEvent};
use crate::config::RouterConfig;
use crate::ipc::Message;
use crate::keys::KeyStroke;
use crate::router::{EventRouter, RouterError};
use crate::{log_debug, log_debug_content};

/// Nested `sequence` actions deeper than this are dropped.
const MAX_SEQUENCE_DEPTH: usize = 8;

/// Whether the host should still run its own handling for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Consumed,
    PassThrough,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub insert_triggers: Vec<KeyStroke>,
    pub reserved_shortcuts: Vec<ShortcutDescriptor>,
    pub max_query_rounds: usize,
    pub caret_color: CaretColor,
}

impl ControllerSettings {
    pub fn from_config(config: &RouterConfig) -> anyhow::Result<Self> {
        Ok(Self {
            insert_triggers: config.insert_triggers()?,
            reserved_shortcuts: config.reserved_shortcuts()?,
            max_query_rounds: config.max_query_rounds,
            caret_color: CaretColor::default(),
        })
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            insert_triggers: vec![KeyStroke::new("\u{1b}", [])],
            reserved_shortcuts: Vec::new(),
            max_query_rounds: crate::config::DEFAULT_MAX_QUERY_ROUNDS,
            caret_color: CaretColor::default(),
        }
    }
}

enum Step {
    Done(EventDisposition),
    Query(Message),
}

/// Pre-dispatch hook for one editor window.
///
/// Owns the mode, the shortcut suppression set and the router. In command mode
/// every key goes to the engine; in insert mode only the configured triggers do.
/// Failures never reach the host: a failed call drops the window back to insert
/// mode, and `RouterUnavailable` also latches full passthrough until
/// [`ModalWindowController::restart_router`] succeeds.
pub struct ModalWindowController<R: EventRouter> {
    router: R,
    machine: ModalStateMachine,
    shortcuts: ShortcutFilter,
    dispatcher: ActionDispatcher,
    insert_triggers: Vec<KeyStroke>,
    max_query_rounds: usize,
    caret_color: CaretColor,
    passthrough: bool,
}

impl<R: EventRouter> ModalWindowController<R> {
    pub fn new(router: R, settings: ControllerSettings) -> Self {
        Self {
            router,
            machine: ModalStateMachine::new(),
            shortcuts: ShortcutFilter::new(settings.reserved_shortcuts),
            dispatcher: ActionDispatcher::new(),
            insert_triggers: settings.insert_triggers,
            max_query_rounds: settings.max_query_rounds.max(1),
            caret_color: settings.caret_color,
            passthrough: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn suppressed_shortcuts(&self) -> &ShortcutSuppressionSet {
        self.shortcuts.suppressed()
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    /// Push the initial overlay state to a freshly adopted window.
    pub fn attach<W: EditorWindow + ?Sized>(&mut self, window: &mut W) {
        window.overlay().set_color(self.caret_color);
        let mode = self.machine.mode();
        self.enter_mode(window, mode);
    }

    pub fn set_caret_color<W: EditorWindow + ?Sized>(&mut self, window: &mut W, color: CaretColor) {
        self.caret_color = color;
        window.overlay().set_color(color);
    }

    /// Start the engine. Returns 0 on success and 1 on failure.
    pub fn start_router(&mut self) -> i32 {
        match self.router.start() {
            Ok(pid) => {
                log_debug(&format!("router started (pid {pid})"));
                0
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "router failed to start");
                1
            }
        }
    }

    /// Manual restart; clears passthrough when the engine comes back.
    pub fn restart_router(&mut self) -> Result<u32, RouterError> {
        let pid = self.router.restart()?;
        if self.passthrough {
            tracing::info!(pid, "modal routing resumed");
        }
        self.passthrough = false;
        Ok(pid)
    }

    /// Raw synchronous call for integration code.
    pub fn send_message(&mut self, message: &Message) -> Result<Message, RouterError> {
        self.router.call(message)
    }

    /// Apply a mode request and its side effects to `window`.
    pub fn enter_mode<W: EditorWindow + ?Sized>(&mut self, window: &mut W, mode: Mode) -> Transition {
        let transition = self.machine.enter(mode);
        match transition.shortcuts {
            ShortcutEffect::Suppress => {
                self.shortcuts.suppress(window.menu_mut());
            }
            ShortcutEffect::Restore => {
                self.shortcuts.restore(window.menu_mut());
            }
        }
        window.overlay().set_mode(mode.as_str());
        if transition.changed() {
            tracing::debug!(from = transition.from.as_str(), to = mode.as_str(), "mode changed");
            log_debug(&format!("mode -> {}", mode.as_str()));
        }
        transition
    }

    pub fn handle_key_event<W: EditorWindow + ?Sized>(
        &mut self,
        window: &mut W,
        event: &KeyEvent,
    ) -> EventDisposition {
        if self.passthrough {
            return EventDisposition::PassThrough;
        }
        let mode = self.machine.mode();
        if mode == Mode::Insert && !self.is_insert_trigger(event) {
            return EventDisposition::PassThrough;
        }

        let mut request = key_event_request(event, mode, window);
        log_debug_content(&format!("key event: {request:?}"));
        let mut rounds = 0;
        loop {
            let response = match self.router.call(&request) {
                Ok(response) => response,
                Err(err) => return self.fall_back(window, err),
            };
            match self.apply(window, &response, 0) {
                Step::Done(disposition) => return disposition,
                Step::Query(reply) => {
                    rounds += 1;
                    if rounds > self.max_query_rounds {
                        log_debug(&format!(
                            "query limit ({}) reached; ending event",
                            self.max_query_rounds
                        ));
                        return EventDisposition::Consumed;
                    }
                    request = reply;
                }
            }
        }
    }

    fn is_insert_trigger(&self, event: &KeyEvent) -> bool {
        KeyStroke::from_event(&event.characters, &event.modifiers)
            .is_some_and(|stroke| self.insert_triggers.contains(&stroke))
    }

    fn apply<W: EditorWindow + ?Sized>(
        &mut self,
        window: &mut W,
        response: &Message,
        depth: usize,
    ) -> Step {
        match self.dispatcher.dispatch(window, response) {
            DispatchOutcome::Applied | DispatchOutcome::Noop => {
                Step::Done(EventDisposition::Consumed)
            }
            DispatchOutcome::Reply(reply) => Step::Query(reply),
            DispatchOutcome::EnterMode(mode) => {
                self.enter_mode(window, mode);
                Step::Done(EventDisposition::Consumed)
            }
            DispatchOutcome::PassThrough => Step::Done(EventDisposition::PassThrough),
            DispatchOutcome::Sequence(_) if depth >= MAX_SEQUENCE_DEPTH => {
                log_debug("sequence nested too deeply; ignored");
                Step::Done(EventDisposition::Consumed)
            }
            DispatchOutcome::Sequence(steps) => {
                let mut disposition = EventDisposition::Consumed;
                for step in &steps {
                    match self.apply(window, step, depth + 1) {
                        Step::Query(reply) => return Step::Query(reply),
                        Step::Done(EventDisposition::PassThrough) => {
                            disposition = EventDisposition::PassThrough;
                        }
                        Step::Done(EventDisposition::Consumed) => {}
                    }
                }
                Step::Done(disposition)
            }
        }
    }

    fn fall_back<W: EditorWindow + ?Sized>(
        &mut self,
        window: &mut W,
        err: RouterError,
    ) -> EventDisposition {
        log_debug(&format!("router call failed: {err}"));
        if matches!(err, RouterError::RouterUnavailable) {
            tracing::warn!("router unavailable; passing events through until restart");
            self.passthrough = true;
        } else {
            tracing::warn!(kind = err.kind(), error = %err, "router call failed");
        }
        self.enter_mode(window, Mode::Insert);
        EventDisposition::PassThrough
    }
}

/// Build the `keyEvent` request for one key press.
pub fn key_event_request<W: EditorWindow + ?Sized>(
    event: &KeyEvent,
    mode: Mode,
    window: &W,
) -> Message {
    let modifiers: Vec<&str> = event.modifiers.iter().map(|m| m.as_str()).collect();
    Message::action("keyEvent")
        .with("keyCode", i64::from(event.key_code))
        .with("characters", event.characters.as_str())
        .with("modifiers", modifiers)
        .with("mode", mode.as_str())
        .with("hasSelection", window.has_selection())
        .with("scroll", window.scroll_position().to_message())
}
