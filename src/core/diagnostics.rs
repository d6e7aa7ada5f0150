//! Internal diagnostics
//!
//! A logging pipeline cannot report its own failures through itself, so
//! sink errors, rotation problems, drops and shutdown issues go to stderr
//! with a bracketed severity tag.

use std::any::Any;
use std::fmt;

pub(crate) fn error(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER ERROR] {}", args);
}

pub(crate) fn warning(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER WARNING] {}", args);
}

pub(crate) fn critical(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER CRITICAL] {}", args);
}

/// Extract a readable message from a `catch_unwind` payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("{} items", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "3 items");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u32)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
