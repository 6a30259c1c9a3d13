//! Session options.
//!
//! A fixed registry of typed settings, changed with `set` and listed with
//! `show`. Entries are created once; only their values change.

use crate::ast::{ALL_OPTIONS, OptionValue};
use crate::error::{OdsqlError, OdsqlResult};

pub const DEBUG: &str = "debug";
pub const FORCE_RECORDS: &str = "force_records";
pub const TIMEZONE: &str = "timezone";

pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Int,
    String,
}

impl OptionType {
    fn describe(self) -> &'static str {
        match self {
            OptionType::Int => "an integer",
            OptionType::String => "a string",
        }
    }

    /// Convert `raw` to this type. Integers render as strings; strings
    /// must parse as a base-10 `i64` to become integers.
    fn coerce(self, name: &str, raw: OptionValue) -> OdsqlResult<OptionValue> {
        match (self, raw) {
            (OptionType::Int, OptionValue::Int(n)) => Ok(OptionValue::Int(n)),
            (OptionType::Int, OptionValue::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(OptionValue::Int(n)),
                Err(_) => Err(OdsqlError::TypeMismatch {
                    name: name.to_string(),
                    expected: self.describe(),
                    value: s,
                }),
            },
            (OptionType::String, OptionValue::Int(n)) => Ok(OptionValue::String(n.to_string())),
            (OptionType::String, OptionValue::String(s)) => Ok(OptionValue::String(s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub name: &'static str,
    pub declared_type: OptionType,
    pub description: &'static str,
    pub current_value: OptionValue,
}

/// The option registry of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionStore {
    entries: Vec<OptionEntry>,
}

impl Default for OptionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionStore {
    pub fn new() -> Self {
        Self {
            entries: vec![
                OptionEntry {
                    name: DEBUG,
                    declared_type: OptionType::Int,
                    description: "Print the request path and parameters before each call",
                    current_value: OptionValue::Int(0),
                },
                OptionEntry {
                    name: FORCE_RECORDS,
                    declared_type: OptionType::Int,
                    description: "Keep queries with bare aggregates on the records endpoints",
                    current_value: OptionValue::Int(0),
                },
                OptionEntry {
                    name: TIMEZONE,
                    declared_type: OptionType::String,
                    description: "Timezone sent with every request",
                    current_value: OptionValue::String(DEFAULT_TIMEZONE.to_string()),
                },
            ],
        }
    }

    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    /// Coerce `raw` to the option's type and store it. On error nothing changes.
    pub fn set(&mut self, name: &str, raw: impl Into<OptionValue>) -> OdsqlResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| OdsqlError::UnknownOption(name.to_string()))?;
        entry.current_value = entry.declared_type.coerce(name, raw.into())?;
        Ok(())
    }

    pub fn try_get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.current_value)
    }

    /// Current value of a registered option.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the registry; use [`Self::try_get`] for
    /// names that come from user input.
    pub fn get(&self, name: &str) -> &OptionValue {
        match self.try_get(name) {
            Some(value) => value,
            None => panic!("option '{}' is not registered", name),
        }
    }

    /// Integer options read as flags: any non-zero value is on.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), OptionValue::Int(n) if *n != 0)
    }

    pub fn debug(&self) -> bool {
        self.flag(DEBUG)
    }

    pub fn force_records(&self) -> bool {
        self.flag(FORCE_RECORDS)
    }

    pub fn timezone(&self) -> String {
        self.get(TIMEZONE).to_string()
    }

    /// `name = value` lines for `all`, or the bare value of one option.
    pub fn describe(&self, name: &str) -> OdsqlResult<String> {
        if name.eq_ignore_ascii_case(ALL_OPTIONS) {
            let lines: Vec<String> = self
                .entries
                .iter()
                .map(|e| format!("{} = {}", e.name, e.current_value))
                .collect();
            return Ok(lines.join("\n"));
        }

        self.try_get(name)
            .map(|v| v.to_string())
            .ok_or_else(|| OdsqlError::UnknownOption(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = OptionStore::new();
        assert!(!store.debug());
        assert!(!store.force_records());
        assert_eq!(store.timezone(), "UTC");
    }

    #[test]
    fn test_string_round_trip() {
        let mut store = OptionStore::new();
        store.set(TIMEZONE, "Europe/Paris").unwrap();
        assert_eq!(store.get(TIMEZONE), &OptionValue::from("Europe/Paris"));
        store.set(TIMEZONE, "UTC").unwrap();
        assert_eq!(store.timezone(), "UTC");
    }

    #[test]
    fn test_type_mismatch_leaves_value() {
        let mut store = OptionStore::new();
        store.set(DEBUG, 1).unwrap();
        let err = store.set(DEBUG, "notanint").unwrap_err();
        assert!(matches!(err, OdsqlError::TypeMismatch { .. }));
        assert_eq!(store.get(DEBUG), &OptionValue::Int(1));
    }

    #[test]
    fn test_numeric_string_coerces_to_int() {
        let mut store = OptionStore::new();
        store.set(FORCE_RECORDS, "1").unwrap();
        assert!(store.force_records());
    }

    #[test]
    fn test_int_coerces_to_string() {
        let mut store = OptionStore::new();
        store.set(TIMEZONE, 2).unwrap();
        assert_eq!(store.timezone(), "2");
    }

    #[test]
    fn test_unknown_option() {
        let mut store = OptionStore::new();
        let before = store.clone();
        let err = store.set("colour", 1).unwrap_err();
        assert!(matches!(err, OdsqlError::UnknownOption(ref n) if n == "colour"));
        assert_eq!(store, before);
        assert!(store.try_get("colour").is_none());
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_get_unknown_panics() {
        OptionStore::new().get("colour");
    }

    #[test]
    fn test_describe() {
        let mut store = OptionStore::new();
        store.set(DEBUG, 1).unwrap();
        assert_eq!(
            store.describe("all").unwrap(),
            "debug = 1\nforce_records = 0\ntimezone = UTC"
        );
        assert_eq!(store.describe(TIMEZONE).unwrap(), "UTC");
        assert!(store.describe("nope").is_err());
    }

    #[test]
    fn test_entries_are_fixed() {
        let mut store = OptionStore::new();
        store.set(DEBUG, 3).unwrap();
        let names: Vec<&str> = store.entries().iter().map(|e| e.name).collect();
        assert_eq!(names, vec![DEBUG, FORCE_RECORDS, TIMEZONE]);
    }
}
