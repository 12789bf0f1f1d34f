use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::store::PropertyStore;
use super::{PropertyError, PropertyResult};
use crate::constants::FRAME_TRANSFORM_PROPERTIES;
use crate::model::Action;

static FRAME_TRANSFORM_GROUP: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| FRAME_TRANSFORM_PROPERTIES.into_iter().collect());

/// Override layers, ordered from lowest to highest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    System,
    Action,
    Job,
    Algorithm,
    Media,
}

impl Layer {
    /// Highest priority first.
    pub const TOP_DOWN: [Layer; 5] = [Layer::Media, Layer::Algorithm, Layer::Job, Layer::Action, Layer::System];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::System => "system",
            Layer::Action => "action",
            Layer::Job => "job",
            Layer::Algorithm => "algorithm",
            Layer::Media => "media",
        };
        f.write_str(name)
    }
}

/// A resolved value together with the layer that supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProperty<'a> {
    pub value: &'a str,
    pub layer: Layer,
}

/// The five property maps that apply to one (job, media, action) triple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyLayers {
    maps: [BTreeMap<String, String>; 5],
}

impl PropertyLayers {
    pub fn new(
        system: BTreeMap<String, String>,
        action: BTreeMap<String, String>,
        job: BTreeMap<String, String>,
        algorithm: BTreeMap<String, String>,
        media: BTreeMap<String, String>,
    ) -> Self {
        Self {
            maps: [system, action, job, algorithm, media],
        }
    }

    /// Collects the layers for one medium and action from a property store.
    pub fn gather(
        store: &dyn PropertyStore,
        job_id: i64,
        media_id: i64,
        action: &Action,
    ) -> PropertyResult<Self> {
        Ok(Self::new(
            store.system_properties(),
            store.action_properties(action),
            store.job_properties(job_id)?,
            store.algorithm_properties(job_id, &action.algorithm)?,
            store.media_properties(media_id)?,
        ))
    }

    pub fn layer(&self, layer: Layer) -> &BTreeMap<String, String> {
        &self.maps[layer.index()]
    }

    /// Returns a copy with one property set at the given layer.
    pub fn with(mut self, layer: Layer, name: &str, value: impl Into<String>) -> Self {
        self.maps[layer.index()].insert(name.to_string(), value.into());
        self
    }

    pub fn is_frame_transform_property(name: &str) -> bool {
        FRAME_TRANSFORM_GROUP.contains(name)
    }

    /// The highest layer that sets any member of the frame-transform group.
    pub fn frame_transform_layer(&self) -> Option<Layer> {
        Layer::TOP_DOWN.into_iter().find(|layer| {
            self.layer(*layer)
                .keys()
                .any(|key| FRAME_TRANSFORM_GROUP.contains(key.as_str()))
        })
    }

    /// Resolves one property.
    pub fn resolve(&self, name: &str) -> Option<ResolvedProperty<'_>> {
        if Self::is_frame_transform_property(name) {
            let layer = self.frame_transform_layer()?;
            return self.layer(layer).get(name).map(|value| ResolvedProperty {
                value: value.as_str(),
                layer,
            });
        }
        Layer::TOP_DOWN.into_iter().find_map(|layer| {
            self.layer(layer).get(name).map(|value| ResolvedProperty {
                value: value.as_str(),
                layer,
            })
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.resolve(name).map(|resolved| resolved.value)
    }

    /// Resolves and parses a property. Blank values count as absent.
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> PropertyResult<Option<T>> {
        match self.resolve(name) {
            None => Ok(None),
            Some(resolved) if resolved.value.trim().is_empty() => Ok(None),
            Some(resolved) => resolved
                .value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| PropertyError::InvalidValue {
                    name: name.to_string(),
                    value: resolved.value.to_string(),
                    layer: resolved.layer,
                }),
        }
    }

    /// Case-insensitive boolean lookup; anything but "true" is false.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    /// The effective value of every property defined at any layer.
    pub fn resolve_all(&self) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        for map in &self.maps {
            for (key, value) in map {
                if !Self::is_frame_transform_property(key) {
                    resolved.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(layer) = self.frame_transform_layer() {
            for (key, value) in self.layer(layer) {
                if Self::is_frame_transform_property(key) {
                    resolved.insert(key.clone(), value.clone());
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn higher_layer_wins() {
        let layers = PropertyLayers::new(
            map(&[("QUALITY", "system")]),
            map(&[("QUALITY", "action")]),
            map(&[("QUALITY", "job")]),
            map(&[]),
            map(&[]),
        );
        let resolved = layers.resolve("QUALITY").unwrap();
        assert_eq!(resolved.value, "job");
        assert_eq!(resolved.layer, Layer::Job);

        let layers = layers.with(Layer::Media, "QUALITY", "media");
        assert_eq!(layers.get("QUALITY"), Some("media"));
        assert_eq!(layers.get("MISSING"), None);
    }

    #[test]
    fn transform_group_overrides_as_unit() {
        let layers = PropertyLayers::new(
            map(&[]),
            map(&[(AUTO_ROTATE, "TRUE"), (HORIZONTAL_FLIP, "TRUE")]),
            map(&[(ROTATION, "90")]),
            map(&[]),
            map(&[]),
        );
        assert_eq!(layers.get(ROTATION), Some("90"));
        assert_eq!(layers.get(AUTO_ROTATE), None);
        assert_eq!(layers.get(HORIZONTAL_FLIP), None);
        assert_eq!(layers.frame_transform_layer(), Some(Layer::Job));

        let all = layers.resolve_all();
        assert_eq!(all.get(ROTATION).map(String::as_str), Some("90"));
        assert!(!all.contains_key(AUTO_ROTATE));
    }

    #[test]
    fn transform_group_does_not_affect_other_properties() {
        let layers = PropertyLayers::new(
            map(&[("CONFIDENCE_THRESHOLD", "0.1")]),
            map(&[(AUTO_FLIP, "TRUE"), ("OTHER", "action")]),
            map(&[]),
            map(&[]),
            map(&[(SEARCH_REGION_TOP_LEFT_X_DETECTION, "5")]),
        );
        assert_eq!(layers.get("OTHER"), Some("action"));
        assert_eq!(layers.get("CONFIDENCE_THRESHOLD"), Some("0.1"));
        assert_eq!(layers.get(AUTO_FLIP), None);
        assert_eq!(layers.get(SEARCH_REGION_TOP_LEFT_X_DETECTION), Some("5"));
    }

    #[test]
    fn parse_failure_names_the_layer() {
        let layers = PropertyLayers::default().with(Layer::Algorithm, MIN_TRACK_LENGTH, "ten");
        match layers.get_parsed::<i32>(MIN_TRACK_LENGTH) {
            Err(PropertyError::InvalidValue { layer, .. }) => assert_eq!(layer, Layer::Algorithm),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
