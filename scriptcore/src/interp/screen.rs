//! Screen-bound variables
//!
//! A UI host owns the windows; the interpreter only owns the variable
//! slots. Slots are shared with the host, which may read and write them
//! from its event thread while a script runs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Value;
use crate::types::{DataType, TypeError};

/// `None` means "no value yet", distinct from a stored null
pub type ScreenSlot = Arc<Mutex<Option<Value>>>;

/// Capability supplied by a UI host
pub trait ScreenHost: Send + Sync {
    /// A screen variable changed; redraw what depends on it
    fn trigger_refresh(&self, screen: &str);
}

#[derive(Debug, Default)]
struct Screen {
    vars: HashMap<String, (DataType, ScreenSlot)>,
}

#[derive(Default)]
pub struct ScreenRegistry {
    screens: HashMap<String, Screen>,
    host: Option<Arc<dyn ScreenHost>>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        ScreenRegistry::default()
    }

    pub fn set_host(&mut self, host: Option<Arc<dyn ScreenHost>>) {
        self.host = host;
    }

    pub fn define_screen(&mut self, name: &str) {
        self.screens.entry(name.to_ascii_lowercase()).or_default();
    }

    pub fn has_screen(&self, name: &str) -> bool {
        self.screens.contains_key(&name.to_ascii_lowercase())
    }

    /// Declare a variable slot; returns the slot so the host can observe it
    pub fn define_var(
        &mut self,
        screen: &str,
        var: &str,
        ty: DataType,
        initial: Option<Value>,
    ) -> ScreenSlot {
        let slot: ScreenSlot = Arc::new(Mutex::new(initial));
        self.screens
            .entry(screen.to_ascii_lowercase())
            .or_default()
            .vars
            .insert(var.to_ascii_lowercase(), (ty, Arc::clone(&slot)));
        slot
    }

    pub fn slot(&self, screen: &str, var: &str) -> Option<ScreenSlot> {
        self.screens
            .get(&screen.to_ascii_lowercase())?
            .vars
            .get(&var.to_ascii_lowercase())
            .map(|(_, slot)| Arc::clone(slot))
    }

    /// Current value; an unset slot reads as null
    pub fn read(&self, screen: &str, var: &str) -> Option<Value> {
        self.slot(screen, var)
            .map(|slot| slot.lock().clone().unwrap_or(Value::Null))
    }

    /// Convert to the declared type, store, and notify the host.
    /// Returns `Ok(false)` when the variable is unknown.
    pub fn write(&self, screen: &str, var: &str, value: Value) -> Result<bool, TypeError> {
        let Some(screen_def) = self.screens.get(&screen.to_ascii_lowercase()) else {
            return Ok(false);
        };
        let Some((ty, slot)) = screen_def.vars.get(&var.to_ascii_lowercase()) else {
            return Ok(false);
        };
        let converted = ty.convert(value)?;
        *slot.lock() = Some(converted);
        if let Some(host) = &self.host {
            host.trigger_refresh(&screen.to_ascii_lowercase());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        refreshed: Mutex<Vec<String>>,
    }

    impl ScreenHost for RecordingHost {
        fn trigger_refresh(&self, screen: &str) {
            self.refreshed.lock().push(screen.to_string());
        }
    }

    #[test]
    fn test_unset_slot_reads_null() {
        let mut reg = ScreenRegistry::new();
        let slot = reg.define_var("Main", "Name", DataType::String, None);
        assert!(slot.lock().is_none());
        assert_eq!(reg.read("main", "name"), Some(Value::Null));
        assert_eq!(reg.read("main", "other"), None);
    }

    #[test]
    fn test_write_converts_and_notifies() {
        let host = Arc::new(RecordingHost::default());
        let mut reg = ScreenRegistry::new();
        reg.set_host(Some(host.clone()));
        let slot = reg.define_var("main", "count", DataType::Int, None);
        assert!(reg.write("MAIN", "count", Value::from("12")).unwrap());
        assert_eq!(*slot.lock(), Some(Value::Int(12)));
        assert_eq!(*host.refreshed.lock(), vec!["main".to_string()]);
        assert!(!reg.write("main", "missing", Value::Int(1)).unwrap());
    }

    #[test]
    fn test_slot_shared_across_threads() {
        let mut reg = ScreenRegistry::new();
        let slot = reg.define_var("s", "v", DataType::Int, Some(Value::Int(0)));
        let remote = Arc::clone(&slot);
        std::thread::spawn(move || {
            *remote.lock() = Some(Value::Int(5));
        })
        .join()
        .unwrap();
        assert_eq!(reg.read("s", "v"), Some(Value::Int(5)));
    }
}
