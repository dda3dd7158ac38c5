pub mod cache;

use chrono::{Local, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use rand::distributions::{Alphanumeric, Uniform};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::dependency::GeneratorKind;
use crate::util::time::format_datetime;

pub use cache::{CacheStats, GeneratorCache, SweeperHandle};

const DEFAULT_STRING_LENGTH: i64 = 8;
const MAX_STRING_LENGTH: i64 = 4096;
const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} generator: invalid `{param}`: {reason}")]
pub struct GeneratorError {
    kind: GeneratorKind,
    param: String,
    reason: String,
}

impl GeneratorError {
    fn new(kind: GeneratorKind, param: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            param: param.to_string(),
            reason: reason.into(),
        }
    }
}

/// Produces synthetic values. Everything except `sequence` is stateless.
#[derive(Debug, Default)]
pub struct Generator {
    sequences: DashMap<String, i64>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(
        &self,
        kind: GeneratorKind,
        params: &Map<String, Value>,
    ) -> Result<Value, GeneratorError> {
        let params = Params { kind, params };
        match kind {
            GeneratorKind::Timestamp => timestamp(&params),
            GeneratorKind::RandomInt => random_int(&params),
            GeneratorKind::RandomString => random_string(&params),
            GeneratorKind::Uuid => uuid(&params),
            GeneratorKind::Sequence => self.sequence(&params),
            GeneratorKind::CurrentTime => current_time(&params),
        }
    }

    /// Next value of the named counter: `start`, then `start + step`, and so on.
    fn sequence(&self, params: &Params<'_>) -> Result<Value, GeneratorError> {
        let name = params.text("name", "default")?.to_string();
        let start = params.integer("start", 1)?;
        let step = params.integer("step", 1)?;

        let next = match self.sequences.entry(name) {
            Entry::Vacant(slot) => *slot.insert(start),
            Entry::Occupied(mut slot) => {
                let next = slot.get().checked_add(step).ok_or_else(|| {
                    GeneratorError::new(params.kind, "step", "sequence overflowed")
                })?;
                *slot.get_mut() = next;
                next
            }
        };
        Ok(Value::Number(Number::from(next)))
    }
}

struct Params<'a> {
    kind: GeneratorKind,
    params: &'a Map<String, Value>,
}

impl Params<'_> {
    fn integer(&self, name: &str, default: i64) -> Result<i64, GeneratorError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| GeneratorError::new(self.kind, name, "must be an integer")),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, GeneratorError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| GeneratorError::new(self.kind, name, "must be a boolean")),
        }
    }

    fn text<'s>(&'s self, name: &str, default: &'s str) -> Result<&'s str, GeneratorError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_str()
                .ok_or_else(|| GeneratorError::new(self.kind, name, "must be a string")),
        }
    }
}

fn timestamp(params: &Params<'_>) -> Result<Value, GeneratorError> {
    let offset = params.integer("offset_secs", 0)?;
    let shifted = TimeDelta::try_seconds(offset)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| GeneratorError::new(params.kind, "offset_secs", "out of range"))?;
    let value = match params.text("unit", "s")? {
        "s" => shifted.timestamp(),
        "ms" => shifted.timestamp_millis(),
        "us" => shifted.timestamp_micros(),
        "ns" => shifted
            .timestamp_nanos_opt()
            .ok_or_else(|| GeneratorError::new(params.kind, "unit", "nanoseconds out of range"))?,
        other => {
            return Err(GeneratorError::new(
                params.kind,
                "unit",
                format!("unknown unit `{other}` (expected s, ms, us or ns)"),
            ));
        }
    };
    Ok(Value::Number(Number::from(value)))
}

fn random_int(params: &Params<'_>) -> Result<Value, GeneratorError> {
    let min = params.integer("min", 0)?;
    let max = params.integer("max", 100)?;
    if min > max {
        return Err(GeneratorError::new(
            params.kind,
            "min",
            format!("{min} is greater than max {max}"),
        ));
    }
    let value = rand::thread_rng().gen_range(min..=max);
    Ok(Value::Number(Number::from(value)))
}

fn random_string(params: &Params<'_>) -> Result<Value, GeneratorError> {
    let length = params.integer("length", DEFAULT_STRING_LENGTH)?;
    if !(0..=MAX_STRING_LENGTH).contains(&length) {
        return Err(GeneratorError::new(
            params.kind,
            "length",
            format!("must be between 0 and {MAX_STRING_LENGTH}"),
        ));
    }
    let length = length as usize;
    let prefix = params.text("prefix", "")?;

    let mut rng = rand::thread_rng();
    let body: String = match params.text("charset", "alphanumeric")? {
        "alphanumeric" => (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect(),
        "alpha" => sample_from(&mut rng, ALPHA, length),
        "numeric" => sample_from(&mut rng, b"0123456789", length),
        "hex" => sample_from(&mut rng, b"0123456789abcdef", length),
        other => {
            return Err(GeneratorError::new(
                params.kind,
                "charset",
                format!("unknown charset `{other}`"),
            ));
        }
    };
    Ok(Value::String(format!("{prefix}{body}")))
}

fn sample_from<R: Rng>(rng: &mut R, alphabet: &[u8], length: usize) -> String {
    let picker = Uniform::from(0..alphabet.len());
    (0..length)
        .map(|_| char::from(alphabet[rng.sample(picker)]))
        .collect()
}

fn uuid(params: &Params<'_>) -> Result<Value, GeneratorError> {
    let id = Uuid::new_v4();
    let mut text = if params.flag("hyphens", true)? {
        id.hyphenated().to_string()
    } else {
        id.simple().to_string()
    };
    if params.flag("uppercase", false)? {
        text.make_ascii_uppercase();
    }
    Ok(Value::String(text))
}

fn current_time(params: &Params<'_>) -> Result<Value, GeneratorError> {
    let format = params.text("format", DEFAULT_TIME_FORMAT)?;
    let rendered = if params.flag("utc", true)? {
        format_datetime(&Utc::now(), Some(format))
    } else {
        format_datetime(&Local::now(), Some(format))
    };
    rendered
        .map(Value::String)
        .ok_or_else(|| GeneratorError::new(params.kind, "format", "invalid strftime format"))
}
