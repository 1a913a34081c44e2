//! Parameter state store.
//!
//! Holds one [`Entry`] per declared parameter: its definition, the raw string
//! it came from, the converted value, and any conversion error. Positional
//! arguments are reachable both by name and by a `list[N]` alias; the two keys
//! share a slot, so `set_val` through either one is seen through both.
//!
//! All access goes through an internal `RwLock`, so a store can be shared
//! between threads by reference.

use std::fmt::{Display, Formatter};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use log::debug;

use crate::command_definitions::ParameterDefinition;
use crate::error::{Error, Result};
use crate::interpolation::{env_name, substitute, EnvVar};
use crate::types::TypeRegistry;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Args,
    Flags,
}

impl Scope {
    /// Placeholder and JSON scope name.
    pub fn key(&self) -> &'static str {
        match self {
            Scope::Args => "args",
            Scope::Flags => "flags",
        }
    }

    pub fn env_prefix(&self) -> &'static str {
        match self {
            Scope::Args => "ARGS_",
            Scope::Flags => "FLAGS_",
        }
    }
}

impl Display for Scope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Scope::Args => "argument",
            Scope::Flags => "flag",
        })
    }
}

/// Where an entry's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Supplied by the caller.
    Input,
    /// The definition's `default`.
    Default,
    /// The type's zero value.
    Zero,
    /// Set programmatically, with no definition behind it.
    Synthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryError {
    Conversion { type_name: String, reason: String },
    MissingRequired,
}

impl EntryError {
    pub fn to_error(&self, scope: Scope, name: &str, raw: &str) -> Error {
        match self {
            EntryError::Conversion { type_name, reason } => Error::Conversion {
                scope,
                name: name.to_string(),
                type_name: type_name.clone(),
                raw: raw.to_string(),
                reason: reason.clone(),
            },
            EntryError::MissingRequired => Error::MissingRequired {
                scope,
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry<'a> {
    pub position: Option<usize>,
    pub definition: Option<&'a ParameterDefinition>,
    pub raw: String,
    pub value: Value,
    pub source: ValueSource,
    pub error: Option<EntryError>,
}

impl<'a> Entry<'a> {
    /// An entry with no definition, as created by [`ParameterStore::set_val`].
    pub fn synthesized(value: Value) -> Self {
        Self {
            position: None,
            definition: None,
            raw: value.to_string(),
            value,
            source: ValueSource::Synthesized,
            error: None,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.source == ValueSource::Input
    }

    /// False only when the value is a stand-in zero value.
    pub fn has_value(&self) -> bool {
        self.source != ValueSource::Zero
    }

    pub fn is_present(&self) -> bool {
        self.value.is_present()
    }
}

#[derive(Debug, Default)]
struct Slots<'a> {
    entries: Vec<Entry<'a>>,
    keys: IndexMap<String, usize>,
}

impl<'a> Slots<'a> {
    fn insert(&mut self, key: String, entry: Entry<'a>) -> usize {
        self.entries.push(entry);
        let slot = self.entries.len() - 1;
        self.keys.insert(key, slot);
        slot
    }

    fn get(&self, key: &str) -> Option<&Entry<'a>> {
        self.keys.get(key).and_then(|slot| self.entries.get(*slot))
    }
}

#[derive(Debug)]
pub struct ParameterStore<'a> {
    scope: Scope,
    raw: Vec<String>,
    inner: RwLock<Slots<'a>>,
}

fn position_key(index: usize) -> String {
    format!("list[{index}]")
}

fn build_entry<'a>(
    registry: &TypeRegistry,
    definition: &'a ParameterDefinition,
    position: Option<usize>,
    raw: Option<&str>,
) -> Result<Entry<'a>> {
    let parameter_type = registry.lookup(definition.type_name())?;

    let entry = match raw {
        Some(raw) => {
            let (value, error) = match parameter_type.convert(raw) {
                Ok(value) => (value, None),
                Err(reason) => (
                    parameter_type.zero().clone(),
                    Some(EntryError::Conversion {
                        type_name: parameter_type.name().to_string(),
                        reason,
                    }),
                ),
            };
            Entry {
                position,
                definition: Some(definition),
                raw: raw.to_string(),
                value,
                source: ValueSource::Input,
                error,
            }
        }
        None => {
            let (value, source) = match &definition.default {
                Some(default) => (default.clone(), ValueSource::Default),
                None => (parameter_type.zero().clone(), ValueSource::Zero),
            };
            Entry {
                position,
                definition: Some(definition),
                raw: value.to_string(),
                value,
                source,
                error: definition.required.then_some(EntryError::MissingRequired),
            }
        }
    };

    Ok(entry)
}

impl<'a> ParameterStore<'a> {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            raw: Vec::new(),
            inner: RwLock::new(Slots::default()),
        }
    }

    /// Builds the positional argument store: definition `i` takes raw input
    /// `i`. Raw inputs beyond the definitions are kept for counting and JSON
    /// output but get no entry.
    pub fn for_args(
        registry: &TypeRegistry,
        definitions: &'a [ParameterDefinition],
        raw: &[String],
    ) -> Result<Self> {
        debug!("Creating args store from {} raw value(s)", raw.len());
        let mut slots = Slots::default();

        for (index, definition) in definitions.iter().enumerate() {
            let entry = build_entry(
                registry,
                definition,
                Some(index),
                raw.get(index).map(String::as_str),
            )?;
            debug!("Argument `{}` resolved to {:?}", definition.name, entry.value);

            let slot = slots.insert(definition.name.clone(), entry);
            slots.keys.insert(position_key(index), slot);
        }

        Ok(Self {
            scope: Scope::Args,
            raw: raw.to_vec(),
            inner: RwLock::new(slots),
        })
    }

    /// Builds the flag store from the flags supplied on the command line,
    /// keyed by long name.
    pub fn for_flags(
        registry: &TypeRegistry,
        definitions: &'a [ParameterDefinition],
        supplied: &IndexMap<String, String>,
    ) -> Result<Self> {
        debug!("Creating flags store from {} supplied flag(s)", supplied.len());
        let mut slots = Slots::default();

        for definition in definitions {
            let raw = supplied.get(&definition.name).map(String::as_str);
            let entry = build_entry(registry, definition, None, raw)?;
            debug!("Flag `{}` resolved to {:?}", definition.name, entry.value);
            slots.insert(definition.name.clone(), entry);
        }

        Ok(Self {
            scope: Scope::Flags,
            raw: supplied.values().cloned().collect(),
            inner: RwLock::new(slots),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots<'a>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots<'a>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn get(&self, key: &str) -> Option<Entry<'a>> {
        self.read().get(key).cloned()
    }

    pub fn get_at(&self, index: usize) -> Option<Entry<'a>> {
        self.get(&position_key(index))
    }

    pub fn get_val(&self, key: &str) -> Option<Value> {
        self.read().get(key).map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().keys.contains_key(key)
    }

    /// Raw values in the order they were supplied.
    pub fn raw_inputs(&self) -> &[String] {
        &self.raw
    }

    pub fn raw_at(&self, index: usize) -> Option<&str> {
        self.raw.get(index).map(String::as_str)
    }

    /// Stores `entry` under `key`, replacing whatever that key pointed at.
    /// Other keys that shared the old slot keep the old entry.
    pub fn set(&self, key: &str, entry: Entry<'a>) {
        self.write().insert(key.to_string(), entry);
    }

    /// Sets the value under `key`, creating a definition-less entry when the
    /// key is new.
    pub fn set_val(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut slots = self.write();

        match slots.keys.get(key).copied() {
            Some(slot) => {
                if let Some(entry) = slots.entries.get_mut(slot) {
                    entry.raw = value.to_string();
                    entry.value = value;
                    if entry.source == ValueSource::Zero {
                        entry.source = ValueSource::Synthesized;
                    }
                }
            }
            None => {
                slots.insert(key.to_string(), Entry::synthesized(value));
            }
        }
    }

    /// All keys, positional aliases included, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.read().keys.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces `${<scope>.<key>}` placeholders for this store's scope.
    pub fn interpolate(&self, script: &str) -> String {
        let slots = self.read();
        let prefix = format!("{}.", self.scope.key());

        substitute(script, |placeholder| {
            let key = placeholder.strip_prefix(&prefix)?;
            slots.get(key).map(|entry| entry.value.to_string())
        })
    }

    /// One variable per key, scope-prefixed: `ARGS_NAME`, `ARGS_LIST_0`,
    /// `FLAGS_VERBOSE`.
    pub fn env_vars(&self) -> Vec<EnvVar> {
        let slots = self.read();
        slots
            .keys
            .iter()
            .filter_map(|(key, slot)| {
                slots.entries.get(*slot).map(|entry| {
                    EnvVar::new(
                        format!("{}{}", self.scope.env_prefix(), env_name(key)),
                        entry.value.to_string(),
                    )
                })
            })
            .collect()
    }

    /// JSON snapshot. Arguments get a `list` array of every raw input
    /// (typed where an entry exists) plus one key per named entry; flags are
    /// a plain name to value map.
    pub fn to_json(&self) -> serde_json::Value {
        let slots = self.read();
        let mut object = serde_json::Map::new();

        if self.scope == Scope::Args {
            let list = self
                .raw
                .iter()
                .enumerate()
                .map(|(index, raw)| match slots.get(&position_key(index)) {
                    Some(entry) => entry.value.to_json(),
                    None => serde_json::Value::String(raw.clone()),
                })
                .collect();
            object.insert("list".to_string(), serde_json::Value::Array(list));
        }

        for (key, slot) in &slots.keys {
            if key.starts_with("list[") {
                continue;
            }
            if let Some(entry) = slots.entries.get(*slot) {
                object.insert(key.clone(), entry.value.to_json());
            }
        }

        serde_json::Value::Object(object)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.to_json()).unwrap_or_else(|_| "{}".to_string())
    }
}
