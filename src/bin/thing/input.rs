//! JSON-lines control input.
//!
//! Each line is one object. The file-carrying keys (`soundfile`,
//! `triggerFile`, `triggerVolume`) are turned into their own messages,
//! with files decoded here, off the audio thread. Every other key goes
//! into one parameter batch, in line order.

use std::path::Path;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use serde_json::Value;

use grainfield::{
    control::{ParamValue, ParameterUpdate},
    io::wav::load_wav,
    runtime::ThingMessage,
};

/// A JSON object with its keys in document order.
struct Entries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[derive(Deserialize)]
struct Trigger {
    url: String,
    #[serde(default)]
    volume: f32,
}

pub fn parse_line(line: &str, root: &Path) -> EyreResult<Vec<ThingMessage>> {
    let Entries(entries) = serde_json::from_str(line).wrap_err("not a JSON object")?;

    let play_on_load = entries
        .iter()
        .any(|(key, value)| key == "playOnLoad" && value.as_bool() == Some(true));

    let mut messages = Vec::new();
    let mut update = ParameterUpdate::new();

    for (key, value) in entries {
        match key.as_str() {
            "playOnLoad" => {}
            "soundfile" => {
                let Some(name) = value.as_str() else {
                    continue;
                };
                let buffer = load_wav(root.join(name))
                    .wrap_err_with(|| format!("failed to load soundfile {name}"))?
                    .shared();
                messages.push(ThingMessage::Soundfile {
                    buffer,
                    play_on_load,
                });
            }
            "triggerFile" => {
                let Trigger { url, volume } = serde_json::from_value(value)?;
                let buffer = load_wav(root.join(&url))
                    .wrap_err_with(|| format!("failed to load trigger {url}"))?
                    .shared();
                messages.push(ThingMessage::TriggerFile {
                    url,
                    buffer,
                    volume_db: volume,
                });
            }
            "triggerVolume" => {
                let Trigger { url, volume } = serde_json::from_value(value)?;
                messages.push(ThingMessage::TriggerVolume {
                    url,
                    volume_db: volume,
                });
            }
            _ => {
                let value: ParamValue = serde_json::from_value(value)
                    .wrap_err_with(|| format!("unsupported value for {key}"))?;
                update.push(key, value);
            }
        }
    }

    if !update.is_empty() {
        messages.push(ThingMessage::Update(update));
    }
    Ok(messages)
}
