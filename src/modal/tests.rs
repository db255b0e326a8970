use super::*;
use crate::host::sim::{default_menu_bar, SimWindow};
use crate::ipc::{Message, Value};
use crate::keys::{KeyStroke, Modifier, Modifiers};
use crate::router::{EventRouter, RouterError};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Default)]
struct ScriptedRouter {
    responses: VecDeque<Result<Message, RouterError>>,
    requests: Vec<Message>,
    down: bool,
    restarts: usize,
}

impl ScriptedRouter {
    fn replying(responses: Vec<Result<Message, RouterError>>) -> Self {
        Self {
            responses: responses.into(),
            ..Self::default()
        }
    }
}

impl EventRouter for ScriptedRouter {
    fn start(&mut self) -> Result<u32, RouterError> {
        if self.down {
            return Err(RouterError::RouterUnavailable);
        }
        Ok(100)
    }

    fn call(&mut self, request: &Message) -> Result<Message, RouterError> {
        self.requests.push(request.clone());
        if self.down {
            return Err(RouterError::RouterUnavailable);
        }
        let next = self
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(Message::action("noop")));
        if matches!(next, Err(RouterError::RouterUnavailable)) {
            self.down = true;
        }
        next
    }

    fn restart(&mut self) -> Result<u32, RouterError> {
        self.down = false;
        self.restarts += 1;
        Ok(101)
    }

    fn is_available(&self) -> bool {
        !self.down
    }
}

fn settings() -> ControllerSettings {
    ControllerSettings {
        insert_triggers: vec![KeyStroke::new("\u{1b}", [])],
        reserved_shortcuts: vec![
            KeyStroke::new("d", [Modifier::Control]),
            KeyStroke::new("u", [Modifier::Control]),
        ],
        max_query_rounds: 4,
        caret_color: CaretColor::default(),
    }
}

fn controller(
    responses: Vec<Result<Message, RouterError>>,
) -> ModalWindowController<ScriptedRouter> {
    ModalWindowController::new(ScriptedRouter::replying(responses), settings())
}

fn esc() -> KeyEvent {
    KeyEvent::new(27, "\u{1b}", Modifiers::new())
}

fn key(ch: &str) -> KeyEvent {
    KeyEvent::new(0, ch, Modifiers::new())
}

fn shortcut_of(window: &SimWindow, id: u64) -> Option<KeyStroke> {
    find_item(window.menu(), MenuItemId(id)).and_then(|item| item.shortcut.clone())
}

/// Drive a controller into command mode with an `enterCommand` reply.
fn in_command_mode(
    responses: Vec<Result<Message, RouterError>>,
) -> (ModalWindowController<ScriptedRouter>, SimWindow) {
    let mut all = vec![Ok(Message::action("enterCommand"))];
    all.extend(responses);
    let mut ctrl = controller(all);
    let mut window = SimWindow::new("hello world\nsecond line\n");
    ctrl.attach(&mut window);
    ctrl.handle_key_event(&mut window, &esc());
    assert_eq!(ctrl.mode(), Mode::Command);
    (ctrl, window)
}

// -------------------------------------------------------------------------
// State machine
// -------------------------------------------------------------------------

#[test]
fn state_machine_starts_in_insert() {
    assert_eq!(ModalStateMachine::new().mode(), Mode::Insert);
}

#[test]
fn transitions_carry_their_side_effects() {
    let mut machine = ModalStateMachine::new();
    let t = machine.enter_command();
    assert_eq!((t.from, t.to), (Mode::Insert, Mode::Command));
    assert_eq!(t.cursor, CursorStyle::Block);
    assert_eq!(t.shortcuts, ShortcutEffect::Suppress);
    assert!(t.changed());

    let again = machine.enter_command();
    assert!(!again.changed());
    assert_eq!(again.shortcuts, ShortcutEffect::Suppress);

    let back = machine.enter_insert();
    assert_eq!(back.cursor, CursorStyle::Bar);
    assert_eq!(back.shortcuts, ShortcutEffect::Restore);
    assert_eq!(machine.mode(), Mode::Insert);
}

// -------------------------------------------------------------------------
// Menu tree and shortcut filter
// -------------------------------------------------------------------------

#[test]
fn flatten_lists_leaves_depth_first_with_paths() {
    let titles: Vec<String> = flatten(&default_menu_bar())
        .iter()
        .map(MenuItemDescriptor::qualified_title)
        .collect();
    assert_eq!(titles[0], "File > New");
    assert!(titles.contains(&"Text > Convert > to Uppercase".to_string()));
    assert_eq!(titles.last().map(String::as_str), Some("Navigation > Previous File Tab"));
}

#[test]
fn title_paths_accept_both_separators() {
    assert_eq!(parse_title_path("Edit/Copy"), vec!["Edit", "Copy"]);
    assert_eq!(
        parse_title_path("Navigation > Next File Tab"),
        vec!["Navigation", "Next File Tab"]
    );
    let menu = default_menu_bar();
    assert_eq!(resolve_path(&menu, "Edit/Copy").map(|i| i.id), Some(MenuItemId(12)));
    assert!(resolve_path(&menu, "Edit/Nope").is_none());
    assert!(resolve_path(&menu, "Copy").is_none());
    assert!(resolve_path(&menu, "").is_none());
}

#[test]
fn titles_containing_a_slash_resolve_through_angle_separators() {
    let menu = vec![MenuNode::submenu(
        "File",
        vec![MenuItem::new(40, "Open/Save Panel", "showPanel:").into()],
    )];
    let descriptor = &flatten(&menu)[0];
    assert_eq!(descriptor.qualified_title(), "File > Open/Save Panel");
    assert_eq!(
        resolve_path(&menu, &descriptor.qualified_title()).map(|i| i.id),
        Some(MenuItemId(40))
    );
    assert!(resolve_path(&menu, "File/Open/Save Panel").is_none());
}

#[test]
fn suppress_is_idempotent() {
    let mut menu = default_menu_bar();
    let mut filter = ShortcutFilter::new(settings().reserved_shortcuts);
    assert_eq!(filter.suppress(&mut menu), 2);
    let first = filter.suppressed().clone();
    assert_eq!(filter.suppress(&mut menu), 0);
    assert_eq!(filter.suppressed(), &first);
    assert!(find_item(&menu, MenuItemId(20)).unwrap().shortcut.is_none());
    // <C-U> differs from <C-u> by shift and stays.
    assert!(find_item(&menu, MenuItemId(22)).unwrap().shortcut.is_some());
}

#[test]
fn restore_returns_the_original_tree() {
    let original = default_menu_bar();
    let mut menu = original.clone();
    let mut filter = ShortcutFilter::new(settings().reserved_shortcuts);
    filter.suppress(&mut menu);
    filter.suppress(&mut menu);
    assert_eq!(filter.restore(&mut menu), 2);
    assert_eq!(menu, original);
    assert!(filter.suppressed().is_empty());
    assert_eq!(filter.restore(&mut menu), 0);
}

#[test]
fn restore_skips_items_removed_from_the_tree() {
    let mut menu = default_menu_bar();
    let mut filter = ShortcutFilter::new(settings().reserved_shortcuts);
    filter.suppress(&mut menu);

    // Drop the whole Text > Convert submenu.
    if let MenuNode::SubMenu { children, .. } = &mut menu[2] {
        children.truncate(1);
    }
    assert_eq!(filter.restore(&mut menu), 1);
    assert_eq!(
        find_item(&menu, MenuItemId(20)).unwrap().shortcut,
        Some(KeyStroke::new("d", [Modifier::Control]))
    );
    assert!(find_item(&menu, MenuItemId(21)).is_none());
}

// -------------------------------------------------------------------------
// Dispatcher
// -------------------------------------------------------------------------

#[test]
fn parses_action_payloads() {
    assert_eq!(
        Action::from_message(&Message::action("enterMode").with("mode", "command")),
        Action::EnterMode(Mode::Command)
    );
    assert_eq!(
        Action::from_message(&Message::action("moveCursor").with("motion", "moveDown:")),
        Action::MoveCursor {
            motion: "moveDown:".to_string(),
            count: 1
        }
    );
    assert_eq!(
        Action::from_message(
            &Message::action("moveCursor")
                .with("motion", "moveDown:")
                .with("count", 1_000_000)
        ),
        Action::MoveCursor {
            motion: "moveDown:".to_string(),
            count: MAX_MOTION_COUNT as usize
        }
    );
    assert!(matches!(
        Action::from_message(&Message::action("enterMode").with("mode", "visual")),
        Action::Invalid(_)
    ));
    assert!(matches!(
        Action::from_message(&Message::action("switchTab").with("tabDirection", "up")),
        Action::Invalid(_)
    ));
    assert!(matches!(Action::from_message(&Message::new()), Action::Invalid(_)));
}

#[test]
fn unknown_and_invalid_actions_are_noop() {
    let dispatcher = ActionDispatcher::new();
    let mut window = SimWindow::new("abc");
    assert_eq!(
        dispatcher.dispatch(&mut window, &Message::action("frobnicate")),
        DispatchOutcome::Noop
    );
    let negative = Message::action("setSelection")
        .with("range", Message::new().with("start", -1).with("end", 2));
    assert_eq!(dispatcher.dispatch(&mut window, &negative), DispatchOutcome::Noop);
    assert_eq!(window.selection(), TextRange::caret(0));
}

#[test]
fn missing_menu_item_is_noop_without_side_effects() {
    let dispatcher = ActionDispatcher::new();
    let mut window = SimWindow::new("abc").with_menu(Vec::new());
    let before = window.snapshot();
    let outcome = dispatcher.dispatch(
        &mut window,
        &Message::action("invokeMenuItem").with("menuItemTitle", "Edit/Copy"),
    );
    assert_eq!(outcome, DispatchOutcome::Noop);
    assert_eq!(window.snapshot(), before);
    assert!(window.performed_actions().is_empty());
}

#[test]
fn invoke_menu_item_resolves_against_live_tree() {
    let dispatcher = ActionDispatcher::new();
    let mut window = SimWindow::new("").with_tabs(&["a.rs", "b.rs"]);
    let outcome = dispatcher.dispatch(
        &mut window,
        &Message::action("invokeMenuItem").with("menuItemTitle", "Navigation > Next File Tab"),
    );
    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(window.active_tab(), "b.rs");

    window.menu_mut().clear();
    let outcome = dispatcher.dispatch(
        &mut window,
        &Message::action("invokeMenuItem").with("menuItemTitle", "Navigation > Next File Tab"),
    );
    assert_eq!(outcome, DispatchOutcome::Noop);
    assert_eq!(window.active_tab(), "b.rs");
}

#[test]
fn queries_produce_replies() {
    let dispatcher = ActionDispatcher::new();
    let mut window = SimWindow::new("hello world");
    window.set_selection(TextRange::new(0, 5));
    window.scroll_to(Point::new(3, 40));

    let DispatchOutcome::Reply(selection) =
        dispatcher.dispatch(&mut window, &Message::action("getSelection"))
    else {
        panic!("expected a reply");
    };
    assert_eq!(selection.action_name(), Some("selection"));
    assert_eq!(selection.get_str("text"), Some("hello"));
    assert_eq!(
        selection.get_map("range").and_then(TextRange::from_message),
        Some(TextRange::new(0, 5))
    );

    let DispatchOutcome::Reply(scroll) =
        dispatcher.dispatch(&mut window, &Message::action("getScrollPosition"))
    else {
        panic!("expected a reply");
    };
    assert_eq!(
        scroll.get_map("point").and_then(Point::from_message),
        Some(Point::new(3, 40))
    );
}

#[test]
fn window_mutations_apply() {
    let dispatcher = ActionDispatcher::new();
    let mut window = SimWindow::new("one two\nthree");
    dispatcher.dispatch(
        &mut window,
        &Message::action("moveCursor").with("motion", "moveWordForward:"),
    );
    assert_eq!(window.cursor(), 4);
    dispatcher.dispatch(&mut window, &Message::action("insertNewline"));
    assert_eq!(window.text(), "one \ntwo\nthree");
    dispatcher.dispatch(
        &mut window,
        &Message::action("scrollTo").with("point", Point::new(0, 12).to_message()),
    );
    assert_eq!(window.scroll_position(), Point::new(0, 12));
    dispatcher.dispatch(
        &mut window,
        &Message::action("setSelection").with("range", TextRange::new(9, 4).to_message()),
    );
    assert_eq!(window.selected_text(), "\ntwo\n");
}

// -------------------------------------------------------------------------
// Controller
// -------------------------------------------------------------------------

#[test]
fn escape_in_insert_enters_command_mode() {
    let mut ctrl = controller(vec![Ok(Message::action("enterCommand"))]);
    let mut window = SimWindow::new("text");
    ctrl.attach(&mut window);
    assert_eq!(window.overlay_state().mode.as_deref(), Some("insert"));

    let disposition = ctrl.handle_key_event(&mut window, &esc());
    assert_eq!(disposition, EventDisposition::Consumed);
    assert_eq!(ctrl.mode(), Mode::Command);
    assert_eq!(window.overlay_state().cursor_style(), Some(CursorStyle::Block));
    assert_eq!(shortcut_of(&window, 20), None);
    assert_eq!(shortcut_of(&window, 21), None);
    assert_eq!(ctrl.suppressed_shortcuts().len(), 2);

    let request = &ctrl.router().requests[0];
    assert_eq!(request.action_name(), Some("keyEvent"));
    assert_eq!(request.get_int("keyCode"), Some(27));
    assert_eq!(request.get_str("mode"), Some("insert"));
    assert_eq!(request.get_bool("hasSelection"), Some(false));
}

#[test]
fn insert_in_command_mode_restores_shortcuts_exactly() {
    let (mut ctrl, mut window) = in_command_mode(vec![Ok(Message::action("enterInsert"))]);
    let disposition = ctrl.handle_key_event(&mut window, &key("i"));
    assert_eq!(disposition, EventDisposition::Consumed);
    assert_eq!(ctrl.mode(), Mode::Insert);
    assert_eq!(window.menu(), default_menu_bar().as_slice());
    assert!(ctrl.suppressed_shortcuts().is_empty());
    assert_eq!(window.overlay_state().cursor_style(), Some(CursorStyle::Bar));
    assert_eq!(ctrl.router().requests[1].get_str("mode"), Some("command"));
}

#[test]
fn repeated_enter_command_heals_external_menu_changes() {
    let (mut ctrl, mut window) = in_command_mode(Vec::new());
    let before = ctrl.suppressed_shortcuts().clone();

    // Host re-adds a reserved shortcut behind our back.
    if let Some(item) = find_item_mut(window.menu_mut(), MenuItemId(20)) {
        item.shortcut = Some(KeyStroke::new("d", [Modifier::Control]));
    }
    ctrl.enter_mode(&mut window, Mode::Command);
    assert_eq!(shortcut_of(&window, 20), None);
    assert_eq!(ctrl.suppressed_shortcuts(), &before);
}

#[test]
fn insert_mode_forwards_only_triggers() {
    let mut ctrl = controller(Vec::new());
    let mut window = SimWindow::new("");
    assert_eq!(
        ctrl.handle_key_event(&mut window, &key("j")),
        EventDisposition::PassThrough
    );
    assert!(ctrl.router().requests.is_empty());
}

#[test]
fn command_mode_forwards_every_key() {
    let (mut ctrl, mut window) = in_command_mode(vec![Ok(Message::action("moveCursor")
        .with("motion", "moveForward:")
        .with("count", 3))]);
    let disposition = ctrl.handle_key_event(&mut window, &key("l"));
    assert_eq!(disposition, EventDisposition::Consumed);
    assert_eq!(window.cursor(), 3);
}

#[test]
fn explicit_pass_through_reaches_the_host() {
    let (mut ctrl, mut window) = in_command_mode(vec![Ok(Message::action("passThrough"))]);
    assert_eq!(
        ctrl.handle_key_event(&mut window, &key("q")),
        EventDisposition::PassThrough
    );
    assert_eq!(ctrl.mode(), Mode::Command);
}

#[test]
fn sequence_steps_run_in_order() {
    let steps = vec![
        Value::Map(Message::action("moveCursor").with("motion", "moveToEndOfLine:")),
        Value::Map(Message::action("insertNewline")),
        Value::Map(Message::action("enterInsert")),
    ];
    let (mut ctrl, mut window) =
        in_command_mode(vec![Ok(Message::action("sequence").with("steps", steps))]);
    ctrl.handle_key_event(&mut window, &key("o"));
    assert_eq!(window.text(), "hello world\n\nsecond line\n");
    assert_eq!(window.cursor(), 12);
    assert_eq!(ctrl.mode(), Mode::Insert);
}

#[test]
fn query_replies_are_routed_back() {
    let (mut ctrl, mut window) = in_command_mode(vec![
        Ok(Message::action("getSelection")),
        Ok(Message::action("moveCursor").with("motion", "moveDown:")),
    ]);
    ctrl.handle_key_event(&mut window, &key("j"));
    let requests = &ctrl.router().requests;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].action_name(), Some("selection"));
    assert_eq!(requests[2].get_str("text"), Some(""));
    assert_eq!(window.cursor(), 12);
}

#[test]
fn query_loop_is_bounded() {
    let endless: Vec<_> = (0..20)
        .map(|_| Ok(Message::action("getScrollPosition")))
        .collect();
    let (mut ctrl, mut window) = in_command_mode(endless);
    let disposition = ctrl.handle_key_event(&mut window, &key("z"));
    assert_eq!(disposition, EventDisposition::Consumed);
    // One enterCommand call, then the key event plus four replies.
    assert_eq!(ctrl.router().requests.len(), 1 + 1 + 4);
}

#[test]
fn timeout_falls_back_to_insert_but_keeps_routing() {
    let (mut ctrl, mut window) =
        in_command_mode(vec![Err(RouterError::Timeout(Duration::from_millis(50)))]);
    let disposition = ctrl.handle_key_event(&mut window, &key("j"));
    assert_eq!(disposition, EventDisposition::PassThrough);
    assert_eq!(ctrl.mode(), Mode::Insert);
    assert!(!ctrl.is_passthrough());
    assert_eq!(window.menu(), default_menu_bar().as_slice());

    ctrl.router_mut()
        .responses
        .push_back(Ok(Message::action("enterCommand")));
    ctrl.handle_key_event(&mut window, &esc());
    assert_eq!(ctrl.mode(), Mode::Command);
}

#[test]
fn unavailable_router_latches_passthrough_until_restart() {
    let (mut ctrl, mut window) = in_command_mode(vec![Err(RouterError::RouterUnavailable)]);
    assert_eq!(
        ctrl.handle_key_event(&mut window, &key("j")),
        EventDisposition::PassThrough
    );
    assert_eq!(ctrl.mode(), Mode::Insert);
    assert!(ctrl.is_passthrough());

    let calls = ctrl.router().requests.len();
    for _ in 0..3 {
        assert_eq!(
            ctrl.handle_key_event(&mut window, &esc()),
            EventDisposition::PassThrough
        );
    }
    assert_eq!(ctrl.router().requests.len(), calls);

    ctrl.restart_router().expect("restart");
    assert!(!ctrl.is_passthrough());
    ctrl.router_mut()
        .responses
        .push_back(Ok(Message::action("enterCommand")));
    assert_eq!(
        ctrl.handle_key_event(&mut window, &esc()),
        EventDisposition::Consumed
    );
    assert_eq!(ctrl.mode(), Mode::Command);
}

#[test]
fn start_router_reports_status_code() {
    let mut ctrl = controller(Vec::new());
    assert_eq!(ctrl.start_router(), 0);
    ctrl.router_mut().down = true;
    assert_eq!(ctrl.start_router(), 1);
}

#[test]
fn send_message_is_a_raw_call() {
    let mut ctrl = controller(vec![Ok(Message::action("pong"))]);
    let reply = ctrl.send_message(&Message::action("ping")).expect("reply");
    assert_eq!(reply.action_name(), Some("pong"));
    assert_eq!(ctrl.mode(), Mode::Insert);
}

#[test]
fn key_event_request_carries_window_state() {
    let mut window = SimWindow::new("abc");
    window.set_selection(TextRange::new(0, 2));
    window.scroll_to(Point::new(0, -5));
    let event = KeyEvent::new(2, "d", [Modifier::Control].into_iter().collect());
    let request = key_event_request(&event, Mode::Command, &window);
    assert_eq!(request.get_str("characters"), Some("d"));
    assert_eq!(
        request.get_array("modifiers"),
        Some([Value::from("C")].as_slice())
    );
    assert_eq!(request.get_bool("hasSelection"), Some(true));
    assert_eq!(
        request.get_map("scroll").and_then(|m| m.get_int("y")),
        Some(-5)
    );
}
