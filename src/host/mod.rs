//! Host-side glue: the pre-dispatch filter chain and window classification.

pub mod sim;

use crate::modal::{EditorWindow, EventDisposition, KeyEvent, ModalWindowController};
use crate::router::EventRouter;

/// A pre-dispatch hook. Returning `Consumed` stops the event from reaching the host.
pub trait EventFilter<W: ?Sized> {
    fn filter(&mut self, window: &mut W, event: &KeyEvent) -> EventDisposition;
}

impl<W, R> EventFilter<W> for ModalWindowController<R>
where
    W: EditorWindow + ?Sized,
    R: EventRouter,
{
    fn filter(&mut self, window: &mut W, event: &KeyEvent) -> EventDisposition {
        self.handle_key_event(window, event)
    }
}

impl<W: ?Sized, F: EventFilter<W> + ?Sized> EventFilter<W> for &mut F {
    fn filter(&mut self, window: &mut W, event: &KeyEvent) -> EventDisposition {
        (**self).filter(window, event)
    }
}

/// Ordered filters in front of the host's own key handler.
///
/// The host handler is called explicitly once every filter has let the event
/// through; nothing relies on overriding the host's dispatch method.
pub struct EventFilterChain<'a, W: ?Sized> {
    filters: Vec<Box<dyn EventFilter<W> + 'a>>,
    original: Box<dyn FnMut(&mut W, &KeyEvent) + 'a>,
}

impl<'a, W: ?Sized> EventFilterChain<'a, W> {
    pub fn new(original: impl FnMut(&mut W, &KeyEvent) + 'a) -> Self {
        Self {
            filters: Vec::new(),
            original: Box::new(original),
        }
    }

    pub fn push(&mut self, filter: impl EventFilter<W> + 'a) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the filters in order; fall through to the host handler if none consumed.
    pub fn send_event(&mut self, window: &mut W, event: &KeyEvent) -> EventDisposition {
        for filter in &mut self.filters {
            if filter.filter(window, event) == EventDisposition::Consumed {
                return EventDisposition::Consumed;
            }
        }
        (self.original)(window, event);
        EventDisposition::PassThrough
    }
}

/// Whether a window gets a modal controller at all.
pub fn is_eligible_window<W: EditorWindow + ?Sized>(window: &W, eligible_classes: &[String]) -> bool {
    let class = window.window_class();
    eligible_classes.iter().any(|eligible| eligible == class)
}
