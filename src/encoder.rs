//! Encoders turning log records into file and console output.
//!
//! Both encoders share an `EncoderConfig` so the file and console sinks agree on
//! key names and timestamp format. The JSON encoder writes one object per line;
//! the console encoder writes tab separated fields followed by any structured
//! key-values as a JSON object.

use std::io::Write as _;

use chrono::Local;
use log::kv::{self, Key, VisitSource};
use log::{Level, Record};
use log4rs::encode::{Color, Encode, Style, Write};
use serde_json::{Map, Value};

/// ISO-8601 timestamp with millisecond precision and numeric UTC offset.
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Key names and timestamp format shared by the encoders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub time_key: String,
    pub level_key: String,
    pub name_key: String,
    pub message_key: String,
    pub time_format: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            time_key: "timestamp".to_string(),
            level_key: "level".to_string(),
            name_key: "logger".to_string(),
            message_key: "msg".to_string(),
            time_format: ISO8601_FORMAT.to_string(),
        }
    }
}

impl EncoderConfig {
    fn timestamp(&self) -> String {
        Local::now().format(&self.time_format).to_string()
    }
}

/// Lowercase level name, e.g. `info`.
pub fn level_name(level: Level) -> String {
    level.as_str().to_ascii_lowercase()
}

/// Collects the structured key-values attached to a record.
#[derive(Default)]
struct FieldCollector(Map<String, Value>);

impl<'kvs> VisitSource<'kvs> for FieldCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        let value = serde_json::to_value(&value).unwrap_or_else(|_| Value::String(value.to_string()));
        self.0.insert(key.as_str().to_string(), value);
        Ok(())
    }
}

fn record_fields(record: &Record) -> anyhow::Result<Map<String, Value>> {
    let mut collector = FieldCollector::default();
    record.key_values().visit(&mut collector)?;
    Ok(collector.0)
}

/// Encodes records as single-line JSON objects.
#[derive(Clone, Debug, Default)]
pub struct JsonEncoder {
    config: EncoderConfig,
}

impl JsonEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        JsonEncoder { config }
    }

    /// Build the JSON object for a record. Structured fields never replace the reserved keys.
    pub fn to_object(&self, record: &Record) -> anyhow::Result<Map<String, Value>> {
        let mut object = Map::new();
        object.insert(self.config.time_key.clone(), Value::String(self.config.timestamp()));
        object.insert(self.config.level_key.clone(), Value::String(level_name(record.level())));
        if !record.target().is_empty() {
            object.insert(self.config.name_key.clone(), Value::String(record.target().to_string()));
        }
        object.insert(self.config.message_key.clone(), Value::String(record.args().to_string()));

        for (key, value) in record_fields(record)? {
            object.entry(key).or_insert(value);
        }

        Ok(object)
    }
}

impl Encode for JsonEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(&self.to_object(record)?)?;
        line.push(b'\n');
        w.write_all(&line)?;
        Ok(())
    }
}

/// Encodes records as human-readable, tab separated lines.
#[derive(Clone, Debug, Default)]
pub struct ConsoleEncoder {
    config: EncoderConfig,
}

impl ConsoleEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        ConsoleEncoder { config }
    }
}

fn level_color(level: Level) -> Option<Color> {
    match level {
        Level::Error => Some(Color::Red),
        Level::Warn => Some(Color::Yellow),
        Level::Info => Some(Color::Green),
        Level::Debug | Level::Trace => None,
    }
}

impl Encode for ConsoleEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        write!(w, "{}\t", self.config.timestamp())?;

        // styles are ignored by writers that are not terminals
        match level_color(record.level()) {
            Some(color) => {
                w.set_style(Style::new().text(color).intense(true))?;
                write!(w, "{}", level_name(record.level()))?;
                w.set_style(&Style::new())?;
            }
            None => write!(w, "{}", level_name(record.level()))?,
        }

        if !record.target().is_empty() {
            write!(w, "\t{}", record.target())?;
        }
        write!(w, "\t{}", record.args())?;

        let fields = record_fields(record)?;
        if !fields.is_empty() {
            write!(w, "\t{}", Value::Object(fields))?;
        }

        writeln!(w)?;
        Ok(())
    }
}
