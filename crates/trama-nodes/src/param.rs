//! Parameter metadata for built-in nodes.

/// Unit a parameter value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUnit {
    /// Decibels.
    Decibels,
    /// Hertz.
    Hertz,
    /// Plain ratio, usually 0-1.
    Ratio,
    /// On/off; values at or above 0.5 are on.
    Toggle,
}

impl ParamUnit {
    /// Display suffix.
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Ratio | ParamUnit::Toggle => "",
        }
    }
}

/// Describes one parameter: name, unit and range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Display name.
    pub name: &'static str,
    /// Unit.
    pub unit: ParamUnit,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Value after construction.
    pub default: f32,
}

impl ParamDescriptor {
    /// A gain parameter in dB.
    pub const fn gain_db(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            unit: ParamUnit::Decibels,
            min,
            max,
            default,
        }
    }

    /// A frequency parameter in Hz.
    pub const fn rate_hz(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            unit: ParamUnit::Hertz,
            min,
            max,
            default,
        }
    }

    /// A 0-1 level.
    pub const fn level(name: &'static str, default: f32) -> Self {
        Self {
            name,
            unit: ParamUnit::Ratio,
            min: 0.0,
            max: 1.0,
            default,
        }
    }

    /// An on/off switch.
    pub const fn toggle(name: &'static str, default: bool) -> Self {
        Self {
            name,
            unit: ParamUnit::Toggle,
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
        }
    }

    /// Clamps `value` into range. NaN maps to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Formats a value with its unit.
    pub fn format(&self, value: f32) -> String {
        match self.unit {
            ParamUnit::Toggle => if value >= 0.5 { "on" } else { "off" }.to_string(),
            unit => format!("{value:.2}{}", unit.suffix()),
        }
    }
}
