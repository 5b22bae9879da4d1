use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_LOG_DIVISOR, DEFAULT_PORT, DEFAULT_STOP_BITS, DEFAULT_TIMEOUT_SECS,
};
use crate::payload::PAYLOAD_LEN;

/// Value of a `key=value` override after literal parsing
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl OverrideValue {
    /// Parse a raw override as an integer, a float, a boolean or, failing
    /// all of those, plain text. Never fails.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let numeric = trimmed.replace('_', "");

        if !numeric.is_empty() && separators_between_digits(trimmed) {
            if let Ok(value) = numeric.parse::<i64>() {
                return OverrideValue::Int(value);
            }
            if let Ok(value) = numeric.parse::<f64>() {
                if value.is_finite() {
                    return OverrideValue::Float(value);
                }
            }
        }

        match trimmed {
            "true" | "True" => OverrideValue::Bool(true),
            "false" | "False" => OverrideValue::Bool(false),
            _ => OverrideValue::Text(raw.to_owned()),
        }
    }
}

/// `_` is only a digit separator when it sits between two digits
fn separators_between_digits(literal: &str) -> bool {
    let bytes = literal.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    })
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideValue::Int(v) => write!(f, "{v}"),
            OverrideValue::Float(v) => write!(f, "{v}"),
            OverrideValue::Bool(v) => write!(f, "{v}"),
            OverrideValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl Parity {
    /// Accepts the one-letter codes (`N`, `E`, `O`, `M`, `S`) and full names
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "n" | "none" => Some(Parity::None),
            "e" | "even" => Some(Parity::Even),
            "o" | "odd" => Some(Parity::Odd),
            "m" | "mark" => Some(Parity::Mark),
            "s" | "space" => Some(Parity::Space),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }
}

/// Connection parameters plus the tunables of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct PortConfig {
    pub baud_rate: u32,
    pub port: String,
    pub stop_bits: u8,
    pub parity: Parity,
    pub timeout_secs: f64,

    /// Writer byte target, the baud rate when unset
    pub total: Option<u64>,
    /// Bytes between writer progress lines, `total / 25` when unset
    pub granularity: Option<u64>,
    /// Chunks between echoes of a cycle's first chunk on the reader side
    pub wrap_period: u64,
    /// Consecutive read timeouts after which the reader stops, 0 = never
    pub max_idle: u64,
    pub progress: bool,
    /// File the `dump` role writes the payload to, stdout when unset
    pub dump_path: Option<String>,

    /// Overrides that matched no field, kept as given
    pub extras: BTreeMap<String, OverrideValue>,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            port: DEFAULT_PORT.to_owned(),
            stop_bits: DEFAULT_STOP_BITS,
            parity: Parity::Even,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            total: None,
            granularity: None,
            wrap_period: 10 * PAYLOAD_LEN as u64 - 1,
            max_idle: 0,
            progress: false,
            dump_path: None,
            extras: BTreeMap::new(),
        }
    }
}

impl PortConfig {
    /// Apply one `key=value` override. Values that don't fit the named field,
    /// and keys that name no field, end up in `extras`.
    pub fn apply_override(&mut self, key: &str, raw: &str) {
        self.assign(key, OverrideValue::parse(raw));
    }

    /// A bare `key` token is shorthand for `key=true`
    pub fn apply_flag(&mut self, key: &str) {
        self.assign(key, OverrideValue::Bool(true));
    }

    fn assign(&mut self, key: &str, value: OverrideValue) {
        let applied = match (key, &value) {
            ("baudrate", OverrideValue::Int(v)) => match u32::try_from(*v) {
                Ok(baud) if baud > 0 => {
                    self.baud_rate = baud;
                    true
                }
                _ => false,
            },
            ("port", OverrideValue::Text(v)) => {
                self.port = v.clone();
                true
            }
            ("port", OverrideValue::Int(v)) => {
                self.port = v.to_string();
                true
            }
            ("stopbits", OverrideValue::Int(v @ (1 | 2))) => {
                self.stop_bits = *v as u8;
                true
            }
            ("parity", OverrideValue::Text(v)) => match Parity::from_name(v) {
                Some(parity) => {
                    self.parity = parity;
                    true
                }
                None => false,
            },
            ("timeout", OverrideValue::Int(v)) if *v >= 0 => {
                self.timeout_secs = *v as f64;
                true
            }
            ("timeout", OverrideValue::Float(v)) if *v >= 0.0 => {
                self.timeout_secs = *v;
                true
            }
            ("total", OverrideValue::Int(v)) if *v > 0 => {
                self.total = Some(*v as u64);
                true
            }
            ("granularity", OverrideValue::Int(v)) if *v >= 0 => {
                self.granularity = Some(*v as u64);
                true
            }
            ("wrap", OverrideValue::Int(v)) if *v >= 0 => {
                self.wrap_period = *v as u64;
                true
            }
            ("idle", OverrideValue::Int(v)) if *v >= 0 => {
                self.max_idle = *v as u64;
                true
            }
            ("progress", OverrideValue::Bool(v)) => {
                self.progress = *v;
                true
            }
            ("out", OverrideValue::Text(v)) => {
                self.dump_path = Some(v.clone());
                true
            }
            _ => false,
        };

        if applied {
            debug!("Override {}={}", key, value);
            return;
        }

        if Self::is_known_key(key) {
            warn!(
                "Value {} does not fit setting {:?}; keeping default and storing it as passthrough",
                value, key
            );
        } else {
            debug!("Unknown setting {:?}={} stored as passthrough", key, value);
        }
        self.extras.insert(key.to_owned(), value);
    }

    fn is_known_key(key: &str) -> bool {
        matches!(
            key,
            "baudrate"
                | "port"
                | "stopbits"
                | "parity"
                | "timeout"
                | "total"
                | "granularity"
                | "wrap"
                | "idle"
                | "progress"
                | "out"
        )
    }

    /// Bytes the writer sends in one run
    pub fn total_target(&self) -> u64 {
        self.total.unwrap_or(self.baud_rate as u64)
    }

    /// Bytes between writer progress lines
    pub fn log_granularity(&self) -> u64 {
        self.granularity
            .unwrap_or(self.total_target() / DEFAULT_LOG_DIVISOR)
    }

    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::MAX)
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "port={} baudrate={} stopbits={} parity={} timeout={}",
            self.port,
            self.baud_rate,
            self.stop_bits,
            self.parity.code(),
            self.timeout_secs
        )?;
        for (key, value) in &self.extras {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_parse_order() {
        assert_eq!(OverrideValue::parse("9600"), OverrideValue::Int(9600));
        assert_eq!(OverrideValue::parse("-3"), OverrideValue::Int(-3));
        assert_eq!(
            OverrideValue::parse("12_500_000"),
            OverrideValue::Int(12_500_000)
        );
        assert_eq!(OverrideValue::parse("2.5"), OverrideValue::Float(2.5));
        assert_eq!(OverrideValue::parse("1e3"), OverrideValue::Float(1000.0));
        assert_eq!(OverrideValue::parse("True"), OverrideValue::Bool(true));
        assert_eq!(OverrideValue::parse("false"), OverrideValue::Bool(false));
        assert_eq!(
            OverrideValue::parse("/dev/ttyUSB0"),
            OverrideValue::Text("/dev/ttyUSB0".into())
        );
        assert_eq!(OverrideValue::parse("E"), OverrideValue::Text("E".into()));
    }

    #[test]
    fn malformed_numbers_stay_text() {
        assert_eq!(OverrideValue::parse("12a"), OverrideValue::Text("12a".into()));
        assert_eq!(OverrideValue::parse("nan"), OverrideValue::Text("nan".into()));
        assert_eq!(OverrideValue::parse("inf"), OverrideValue::Text("inf".into()));
        assert_eq!(OverrideValue::parse("_1"), OverrideValue::Text("_1".into()));
        for raw in ["1_", "1__0", "96__00", "96__00_", "1_.5", "1._5", "1_e3", "-_1"] {
            assert_eq!(OverrideValue::parse(raw), OverrideValue::Text(raw.into()));
        }
        assert_eq!(OverrideValue::parse("1_000.5"), OverrideValue::Float(1000.5));
        assert_eq!(OverrideValue::parse(""), OverrideValue::Text("".into()));
        assert_eq!(
            OverrideValue::parse("__import__('os')"),
            OverrideValue::Text("__import__('os')".into())
        );
    }

    #[test]
    fn defaults() {
        let config = PortConfig::default();

        assert_eq!(config.baud_rate, 12_500_000);
        assert_eq!(config.stop_bits, 2);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.timeout_secs, 10.0);
        assert_eq!(config.wrap_period, 949);
        assert_eq!(config.total_target(), 12_500_000);
        assert_eq!(config.log_granularity(), 500_000);
        assert!(config.extras.is_empty());
    }

    #[test]
    fn overrides_assign_fields() {
        let mut config = PortConfig::default();
        config.apply_override("baudrate", "115200");
        config.apply_override("port", "/dev/ttyUSB0");
        config.apply_override("stopbits", "1");
        config.apply_override("parity", "none");
        config.apply_override("timeout", "0.5");
        config.apply_override("granularity", "0");
        config.apply_flag("progress");

        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.total_target(), 115_200);
        assert_eq!(config.log_granularity(), 0);
        assert!(config.progress);
        assert!(config.extras.is_empty());
    }

    #[test]
    fn ill_fitting_values_become_passthrough() {
        let mut config = PortConfig::default();
        config.apply_override("baudrate", "fast");
        config.apply_override("baudrate", "0");
        config.apply_override("stopbits", "3");
        config.apply_override("parity", "X");
        config.apply_override("timeout", "1__0");
        config.apply_override("bytesize", "8");

        assert_eq!(config, {
            let mut expected = PortConfig::default();
            expected
                .extras
                .insert("baudrate".into(), OverrideValue::Int(0));
            expected.extras.insert("stopbits".into(), OverrideValue::Int(3));
            expected
                .extras
                .insert("parity".into(), OverrideValue::Text("X".into()));
            expected.extras.insert("bytesize".into(), OverrideValue::Int(8));
            expected
                .extras
                .insert("timeout".into(), OverrideValue::Text("1__0".into()));
            expected
        });
    }

    #[test]
    fn parity_codes() {
        for (name, code) in [("N", 'N'), ("e", 'E'), ("O", 'O'), ("Mark", 'M'), ("space", 'S')] {
            assert_eq!(Parity::from_name(name).map(Parity::code), Some(code));
        }
        assert_eq!(Parity::from_name("Q"), None);
    }

    #[test]
    fn total_drives_default_granularity() {
        let mut config = PortConfig::default();
        config.apply_override("total", "1000");

        assert_eq!(config.total_target(), 1000);
        assert_eq!(config.log_granularity(), 40);
    }
}
