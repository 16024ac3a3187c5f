// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;
use std::sync::Arc;

use super::error::SamplerError;
use super::settings::{SampleId, SampleSettings, SettingsUpdate};
use super::zero_crossing::ZeroCrossings;

/// Authoritative per-sample settings and zero-crossing tables.
///
/// The engine keeps this in step with its loaded samples: an id is present here
/// only while the sample is loaded.
#[derive(Debug, Default)]
pub struct SettingsStore {
    settings: HashMap<SampleId, SampleSettings>,
    crossings: HashMap<SampleId, Arc<ZeroCrossings>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sample_settings(&mut self, id: SampleId, settings: SampleSettings) {
        self.settings.insert(id, settings);
    }

    pub fn get_sample_settings(&self, id: &SampleId) -> Option<&SampleSettings> {
        self.settings.get(id)
    }

    /// Shallow-merges `update` into the stored record and returns the result.
    pub fn update_sample_settings(
        &mut self,
        id: &SampleId,
        update: &SettingsUpdate,
    ) -> Result<&SampleSettings, SamplerError> {
        let settings = self
            .settings
            .get_mut(id)
            .ok_or_else(|| SamplerError::NotLoaded(id.clone()))?;
        settings.merge(update);
        Ok(settings)
    }

    pub fn remove_sample_settings(&mut self, id: &SampleId) -> Option<SampleSettings> {
        self.settings.remove(id)
    }

    pub fn set_zero_crossings(&mut self, id: SampleId, crossings: ZeroCrossings) {
        self.crossings.insert(id, Arc::new(crossings));
    }

    pub fn get_zero_crossings(&self, id: &SampleId) -> Option<Arc<ZeroCrossings>> {
        self.crossings.get(id).cloned()
    }

    pub fn remove_zero_crossings(&mut self, id: &SampleId) -> Option<Arc<ZeroCrossings>> {
        self.crossings.remove(id)
    }

    pub fn contains(&self, id: &SampleId) -> bool {
        self.settings.contains_key(id)
    }

    /// Ids with registered settings, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &SampleId> {
        self.settings.keys()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Drops everything, for engine teardown.
    pub fn clear(&mut self) {
        self.settings.clear();
        self.crossings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::settings::{
        EnvelopeSettings, EnvelopeUpdate, FilterSettings, VolumeSettings,
    };

    fn settings() -> SampleSettings {
        SampleSettings::with_defaults(
            1.0,
            EnvelopeSettings::default(),
            VolumeSettings::default(),
            FilterSettings::default(),
        )
    }

    #[test]
    fn test_update_merges_into_existing() {
        let mut store = SettingsStore::new();
        let id = SampleId::from("a");
        store.set_sample_settings(id.clone(), settings());

        let updated = store
            .update_sample_settings(
                &id,
                &SettingsUpdate::envelope(EnvelopeUpdate {
                    release_time: Some(1.5),
                    ..Default::default()
                }),
            )
            .unwrap();
        assert_eq!(updated.envelope.release_time, 1.5);
        assert_eq!(updated.envelope.attack_time, 0.02);
        assert_eq!(
            store.get_sample_settings(&id).unwrap().envelope.release_time,
            1.5
        );
    }

    #[test]
    fn test_unknown_id() {
        let mut store = SettingsStore::new();
        let id = SampleId::from("missing");
        assert!(store.get_sample_settings(&id).is_none());
        assert_eq!(
            store.update_sample_settings(&id, &SettingsUpdate::loop_locked(true)),
            Err(SamplerError::NotLoaded(id.clone()))
        );
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_crossings_lifecycle() {
        let mut store = SettingsStore::new();
        let id = SampleId::from("a");
        store.set_sample_settings(id.clone(), settings());
        store.set_zero_crossings(id.clone(), ZeroCrossings::from_sorted(vec![0.1, 0.2]));

        assert_eq!(store.get_zero_crossings(&id).unwrap().len(), 2);
        assert!(store.remove_zero_crossings(&id).is_some());
        assert!(store.remove_sample_settings(&id).is_some());
        assert!(store.is_empty());
        assert!(store.get_zero_crossings(&id).is_none());
    }
}
