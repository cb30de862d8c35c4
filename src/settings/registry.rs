//! Setting storage and the transform/validate/notify pipeline

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::settings::types::{
    SettingDefinition, SettingInfo, SettingKind, SettingListener, SettingSubscription,
    SettingUpdate, SettingValue, SettingsError, TransformFn, ValidateFn,
};
use crate::util::lock;

type SharedListener = Arc<dyn Fn(SettingUpdate) -> futures_util::future::BoxFuture<'static, ()> + Send + Sync>;

struct SettingRecord {
    kind: SettingKind,
    description: String,
    transform: Option<TransformFn>,
    validate: Option<ValidateFn>,
    choices: Vec<SettingValue>,
    value: Option<SettingValue>,
    listeners: Vec<(u64, SharedListener)>,
}

impl SettingRecord {
    /// Run a raw value through transform, validate and the choice allow-list,
    /// storing the transformed value on success.
    fn apply(&mut self, key: &str, raw: SettingValue) -> Result<SettingValue, SettingsError> {
        let value = self.prepare(key, &raw)?;
        self.value = Some(value.clone());
        Ok(value)
    }

    /// The same pipeline without the store, for pre-flight validation.
    fn prepare(&self, key: &str, raw: &SettingValue) -> Result<SettingValue, SettingsError> {
        let validation_failure = || SettingsError::Validation {
            key: key.to_string(),
            raw: raw.to_string(),
        };

        let value = match &self.transform {
            Some(transform) => transform(raw.clone()).map_err(|_| validation_failure())?,
            None => coerce(self.kind, raw.clone()).map_err(|_| validation_failure())?,
        };

        if let Some(validate) = &self.validate {
            if !validate(&value) {
                return Err(validation_failure());
            }
        }

        if !self.choices.is_empty() && !self.choices.contains(&value) {
            return Err(SettingsError::InvalidChoice {
                key: key.to_string(),
                raw: raw.to_string(),
            });
        }

        Ok(value)
    }
}

/// Default transform: coerce a raw value to the declared kind.
fn coerce(kind: SettingKind, raw: SettingValue) -> Result<SettingValue, String> {
    match (kind, raw) {
        (SettingKind::Number, SettingValue::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(SettingValue::Number)
            .map_err(|e| e.to_string()),
        (SettingKind::Text, SettingValue::Number(n)) => Ok(SettingValue::Text(n.to_string())),
        (_, value) => Ok(value),
    }
}

/// Owns every setting record; all access goes through registry methods so
/// the validation contract holds on every mutation path.
#[derive(Default)]
pub struct SettingRegistry {
    records: Mutex<BTreeMap<String, SettingRecord>>,
    next_subscription: AtomicU64,
}

impl SettingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new setting. Fails on the first invalid definition field or
    /// if the key already exists.
    pub fn define(&self, definition: SettingDefinition) -> Result<(), SettingsError> {
        if definition.key.is_empty() {
            return Err(SettingsError::InvalidDefinition("key required".into()));
        }

        if !definition.key.contains('.') {
            return Err(SettingsError::InvalidDefinition(format!(
                "key namespace required: {}",
                definition.key
            )));
        }

        if definition.description.is_empty() {
            return Err(SettingsError::InvalidDefinition(format!(
                "description required: {}",
                definition.key
            )));
        }

        let mut records = lock(&self.records);

        if records.contains_key(&definition.key) {
            return Err(SettingsError::AlreadyDefined(definition.key));
        }

        records.insert(
            definition.key,
            SettingRecord {
                kind: definition.kind,
                description: definition.description,
                transform: definition.transform,
                validate: definition.validate,
                choices: definition.choices,
                value: definition.value,
                listeners: Vec::new(),
            },
        );

        Ok(())
    }

    /// Current value by key; `None` for unknown keys and removed settings.
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        lock(&self.records).get(key).and_then(|r| r.value.clone())
    }

    pub fn info(&self, key: &str) -> Result<SettingInfo, SettingsError> {
        lock(&self.records)
            .get(key)
            .map(|r| SettingInfo {
                key: key.to_string(),
                kind: r.kind,
                description: r.description.clone(),
                choices: r.choices.clone(),
                value: r.value.clone(),
            })
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))
    }

    /// Keys, optionally filtered to a namespace (first `.`-delimited token).
    pub fn list(&self, namespace: Option<&str>) -> Vec<String> {
        lock(&self.records)
            .keys()
            .filter(|key| match namespace {
                Some(ns) => key.split('.').next() == Some(ns),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Pre-flight a value without committing it; returns the validation
    /// failure message, if any.
    pub fn validate_value(
        &self,
        key: &str,
        raw: &SettingValue,
    ) -> Result<Option<String>, SettingsError> {
        let records = lock(&self.records);
        let record = records
            .get(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        match record.prepare(key, raw) {
            Ok(_) => Ok(None),
            Err(e) => Ok(Some(e.to_string())),
        }
    }

    /// Update a setting; the stored value is left untouched on any failure.
    /// Subscribers are awaited one at a time in subscription order.
    pub async fn set(&self, key: &str, raw: SettingValue) -> Result<SettingValue, SettingsError> {
        let (value, listeners) = {
            let mut records = lock(&self.records);
            let record = records
                .get_mut(key)
                .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

            let value = record.apply(key, raw)?;
            let listeners: Vec<SharedListener> = record
                .listeners
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();
            (value, listeners)
        };

        for listener in listeners {
            listener(SettingUpdate::Value(value.clone())).await;
        }

        Ok(value)
    }

    /// Remove a setting; subscribers see the removal sentinel before the key
    /// becomes unknown.
    pub async fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let listeners = {
            let mut records = lock(&self.records);
            let record = records
                .get_mut(key)
                .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

            record.value = None;
            record
                .listeners
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect::<Vec<_>>()
        };

        for listener in listeners {
            listener(SettingUpdate::Removed).await;
        }

        lock(&self.records).remove(key);
        Ok(())
    }

    /// Remove every setting, notifying subscribers per key.
    pub async fn clear(&self) {
        let keys: Vec<String> = lock(&self.records).keys().cloned().collect();

        for key in keys {
            // keys cannot disappear between collection and removal; a racing
            // remove would surface as UnknownKey, which clear tolerates
            let _ = self.remove(&key).await;
        }
    }

    pub fn subscribe(
        &self,
        key: &str,
        listener: SettingListener,
    ) -> Result<SettingSubscription, SettingsError> {
        let mut records = lock(&self.records);
        let record = records
            .get_mut(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        record.listeners.push((id, Arc::from(listener)));
        Ok(SettingSubscription(id))
    }

    /// No-op if the subscription is not found; fails only on unknown keys.
    pub fn unsubscribe(
        &self,
        key: &str,
        subscription: SettingSubscription,
    ) -> Result<(), SettingsError> {
        let mut records = lock(&self.records);
        let record = records
            .get_mut(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        record.listeners.retain(|(id, _)| *id != subscription.0);
        Ok(())
    }
}
