use modalmate::host::sim::{SimWindow, WindowSnapshot};
use modalmate::host::{is_eligible_window, EventFilterChain};
use modalmate::keys::{KeyStroke, Modifier};
use modalmate::modal::{EventDisposition, KeyEvent, ModalWindowController};
use modalmate::router::EventRouter;
use serde::Serialize;

/// Virtual key codes the host reports for keys without a printable form.
const KEY_CODES: &[(&str, u16)] = &[
    ("\r", 36),
    ("\t", 48),
    (" ", 49),
    ("\u{8}", 51),
    ("\u{1b}", 53),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplayReport {
    #[serde(flatten)]
    pub(crate) window: WindowSnapshot,
    pub(crate) eligible: bool,
    pub(crate) passthrough: bool,
    pub(crate) consumed: usize,
    pub(crate) passed_through: usize,
}

/// Build the host event for one parsed keystroke.
pub(crate) fn key_event(stroke: &KeyStroke) -> KeyEvent {
    let key_code = KEY_CODES
        .iter()
        .find(|(key, _)| *key == stroke.key)
        .map_or(0, |(_, code)| *code);
    let is_letter = {
        let mut chars = stroke.key.chars();
        matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_alphabetic())
    };
    let characters = if is_letter && stroke.has_modifier(Modifier::Shift) {
        stroke.key.to_uppercase()
    } else {
        stroke.key.clone()
    };
    KeyEvent::new(key_code, characters, stroke.modifiers.clone())
}

/// Feed every keystroke through the window's filter chain.
pub(crate) fn replay<R: EventRouter>(
    window: &mut SimWindow,
    controller: &mut ModalWindowController<R>,
    strokes: &[KeyStroke],
    eligible_classes: &[String],
) -> ReplayReport {
    let eligible = is_eligible_window(window, eligible_classes);
    let mut consumed = 0;
    let mut passed_through = 0;
    {
        let mut chain = EventFilterChain::new(|window: &mut SimWindow, event: &KeyEvent| {
            window.handle_key_default(event)
        });
        if eligible {
            controller.attach(window);
            chain.push(&mut *controller);
        }
        for stroke in strokes {
            match chain.send_event(window, &key_event(stroke)) {
                EventDisposition::Consumed => consumed += 1,
                EventDisposition::PassThrough => passed_through += 1,
            }
        }
    }
    ReplayReport {
        window: window.snapshot(),
        eligible,
        passthrough: controller.is_passthrough(),
        consumed,
        passed_through,
    }
}
