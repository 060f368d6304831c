//! Backend console: the operator's command line into the framework.

use std::sync::Arc;

use crate::chat::tokenize;
use crate::handler::{HandlerId, HandlerList};
use crate::logger::LineDst;
use crate::menu::{BackendCallback, BackendMenuEntry, MenuOutcome, MenuRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOutcome {
    Empty,
    Intercepted,
    Menu(MenuOutcome),
}

/// Routes console lines through interceptors and then the backend menu.
pub struct Backend {
    display: Arc<dyn LineDst>,
    menu: Arc<MenuRegistry>,
    interceptors: HandlerList<BackendCallback>,
}

impl Backend {
    pub fn new(display: Arc<dyn LineDst>, menu: Arc<MenuRegistry>) -> Self {
        Self {
            display,
            menu,
            interceptors: HandlerList::new(),
        }
    }

    pub fn display(&self) -> Arc<dyn LineDst> {
        Arc::clone(&self.display)
    }

    pub fn add_menu_entry(&self, entry: BackendMenuEntry) -> HandlerId {
        self.menu.add_backend_entry(entry)
    }

    pub fn add_interceptor(&self, cb: Box<BackendCallback>) -> HandlerId {
        self.interceptors.push(Arc::from(cb))
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        self.interceptors.remove(id)
    }

    pub fn handle_line(&self, line: &str) -> BackendOutcome {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return BackendOutcome::Empty;
        }

        for cb in self.interceptors.snapshot() {
            if cb(&tokens) {
                return BackendOutcome::Intercepted;
            }
        }

        let outcome = self.menu.dispatch_backend(&tokens);
        if !outcome.matched {
            self.display
                .write_line(&format!("Unknown command '{}', try 'help'", tokens[0]));
        }
        BackendOutcome::Menu(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuEntry;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl LineDst for Capture {
        fn write_line(&self, line: &str) {
            self.0.lock().push(line.to_string());
        }
    }

    #[test]
    fn test_interceptor_before_menu() {
        let capture = Arc::new(Capture::default());
        let backend = Backend::new(capture.clone(), Arc::new(MenuRegistry::new()));
        let hits = Arc::new(Mutex::new(Vec::new()));

        let h = Arc::clone(&hits);
        backend.add_menu_entry(BackendMenuEntry::new(MenuEntry::new(["stop"]), move |_| {
            h.lock().push("menu");
            true
        }));
        let h = Arc::clone(&hits);
        let id = backend.add_interceptor(Box::new(move |tokens: &[String]| {
            h.lock().push("interceptor");
            tokens[0] == "stop"
        }));

        assert_eq!(backend.handle_line("stop"), BackendOutcome::Intercepted);
        assert!(backend.remove(id));
        assert_eq!(
            backend.handle_line("stop now"),
            BackendOutcome::Menu(MenuOutcome { matched: true, stop: true })
        );
        assert_eq!(*hits.lock(), vec!["interceptor", "menu"]);
    }

    #[test]
    fn test_unknown_and_empty_lines() {
        let capture = Arc::new(Capture::default());
        let backend = Backend::new(capture.clone(), Arc::new(MenuRegistry::new()));

        assert_eq!(backend.handle_line("   "), BackendOutcome::Empty);
        assert_eq!(
            backend.handle_line("frobnicate"),
            BackendOutcome::Menu(MenuOutcome::default())
        );
        assert_eq!(capture.0.lock().len(), 1);
        assert!(capture.0.lock()[0].contains("frobnicate"));
    }
}
