//! Correction parameters, partial updates and presets
//!
//! Two views of the same settings:
//! - [`CorrectionParameters`] in engine units (fractions, milliseconds, semitones)
//! - [`ControlUpdate`] in control-surface units (key/scale names, 0-100 knobs)
//!
//! Updates merge field by field; anything not present is left untouched.
//! Out-of-range values are clamped, unknown names are ignored.

use crate::scale::{PitchClassSet, Scale, ScaleType, parse_key};
use serde::{Deserialize, Serialize};

/// Maximum ratio smoothing time constant
pub const MAX_SPEED_MS: f32 = 50.0;

/// Formant shift range, in semitones either side
pub const MAX_FORMANT_SEMITONES: f32 = 12.0;

/// Maximum humanize detuning at full amount, in cents
pub const HUMANIZE_MAX_CENTS: f32 = 15.0;

/// Complete correction settings, in engine units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionParameters {
    /// Key root pitch class (0 = C)
    pub key: u8,
    /// Scale type
    pub scale: ScaleType,
    /// 0 = no shift, 1 = full snap
    pub correction_amount: f32,
    /// Ratio smoothing time constant (0-50 ms)
    pub speed_ms: f32,
    /// Random detuning amount (0-1, up to ±15 cents)
    pub humanize_amount: f32,
    /// Formant shift (-12..12 semitones). Stored only, not applied to the signal yet.
    pub formant_shift_semitones: f32,
    /// Dry/wet (0 = dry, 1 = wet)
    pub mix: f32,
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        let mut params = Self {
            key: 0,
            scale: ScaleType::Major,
            correction_amount: 0.0,
            speed_ms: 0.0,
            humanize_amount: 0.0,
            formant_shift_semitones: 0.0,
            mix: 1.0,
        };
        params.apply(&Preset::MODERN.parameter_update());
        params
    }
}

impl CorrectionParameters {
    /// Active scale
    pub fn scale(&self) -> Scale {
        Scale::new(self.key, self.scale)
    }

    /// Absolute pitch classes of the active key and scale
    pub fn pitch_classes(&self) -> PitchClassSet {
        self.scale().pitch_classes()
    }

    /// Merge a partial update, clamping each provided field
    pub fn apply(&mut self, update: &ParameterUpdate) {
        if let Some(key) = update.key {
            self.key = key % 12;
        }
        if let Some(scale) = update.scale {
            self.scale = scale;
        }
        if let Some(v) = update.correction_amount {
            self.correction_amount = clamp_finite(v, 0.0, 1.0, self.correction_amount);
        }
        if let Some(v) = update.speed_ms {
            self.speed_ms = clamp_finite(v, 0.0, MAX_SPEED_MS, self.speed_ms);
        }
        if let Some(v) = update.humanize_amount {
            self.humanize_amount = clamp_finite(v, 0.0, 1.0, self.humanize_amount);
        }
        if let Some(v) = update.formant_shift_semitones {
            self.formant_shift_semitones = clamp_finite(
                v,
                -MAX_FORMANT_SEMITONES,
                MAX_FORMANT_SEMITONES,
                self.formant_shift_semitones,
            );
        }
        if let Some(v) = update.mix {
            self.mix = clamp_finite(v, 0.0, 1.0, self.mix);
        }
    }

    /// Copy with an update applied
    pub fn merged(mut self, update: &ParameterUpdate) -> Self {
        self.apply(update);
        self
    }
}

/// Clamp into `[min, max]`; NaN keeps the previous value
fn clamp_finite(value: f32, min: f32, max: f32, previous: f32) -> f32 {
    if value.is_nan() {
        previous
    } else {
        value.clamp(min, max)
    }
}

/// Partial update in engine units. `None` leaves the field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub key: Option<u8>,
    pub scale: Option<ScaleType>,
    pub correction_amount: Option<f32>,
    pub speed_ms: Option<f32>,
    pub humanize_amount: Option<f32>,
    pub formant_shift_semitones: Option<f32>,
    pub mix: Option<f32>,
}

impl ParameterUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields of `other` override fields of `self`
    pub fn merge(self, other: &ParameterUpdate) -> Self {
        Self {
            key: other.key.or(self.key),
            scale: other.scale.or(self.scale),
            correction_amount: other.correction_amount.or(self.correction_amount),
            speed_ms: other.speed_ms.or(self.speed_ms),
            humanize_amount: other.humanize_amount.or(self.humanize_amount),
            formant_shift_semitones: other
                .formant_shift_semitones
                .or(self.formant_shift_semitones),
            mix: other.mix.or(self.mix),
        }
    }
}

/// Control-surface message: key/scale by name, knobs in 0-100
///
/// ```
/// use tf_pitch::params::ControlUpdate;
///
/// let update = ControlUpdate::from_json(r#"{"key":"D","correction":50,"tilt":3}"#).unwrap();
/// let params = update.to_parameter_update();
/// assert_eq!(params.key, Some(2));
/// assert_eq!(params.correction_amount, Some(0.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlUpdate {
    pub key: Option<String>,
    pub scale: Option<String>,
    pub correction: Option<f32>,
    pub speed: Option<f32>,
    pub humanize: Option<f32>,
    pub formant: Option<f32>,
    pub mix: Option<f32>,
}

impl ControlUpdate {
    /// Parse a JSON control message. Unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Map knob values to engine units
    ///
    /// Unknown key or scale names are logged and dropped; the rest of the
    /// message still applies.
    pub fn to_parameter_update(&self) -> ParameterUpdate {
        let key = self.key.as_deref().and_then(|name| match parse_key(name) {
            Ok(pc) => Some(pc),
            Err(e) => {
                log::warn!("Ignoring control update: {}", e);
                None
            }
        });
        let scale = self.scale.as_deref().and_then(|name| match name.parse() {
            Ok(scale) => Some(scale),
            Err(e) => {
                log::warn!("Ignoring control update: {}", e);
                None
            }
        });

        ParameterUpdate {
            key,
            scale,
            correction_amount: self.correction.map(|v| knob(v) / 100.0),
            speed_ms: self.speed.map(|v| knob(v) * 0.5),
            humanize_amount: self.humanize.map(|v| knob(v) / 100.0),
            formant_shift_semitones: self.formant.map(|v| (knob(v) - 50.0) * 0.24),
            mix: self.mix.map(|v| knob(v) / 100.0),
        }
    }
}

/// Clamp a knob value to 0-100
fn knob(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Named bundle of knob values. Never touches key or scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub correction: f32,
    pub speed: f32,
    pub humanize: f32,
    pub formant: f32,
    pub mix: f32,
}

impl Preset {
    pub const NATURAL: Preset = Preset::new("natural", 40.0, 50.0, 60.0, 50.0, 70.0);
    pub const SOFT: Preset = Preset::new("soft", 65.0, 35.0, 40.0, 50.0, 80.0);
    pub const MODERN: Preset = Preset::new("modern", 75.0, 25.0, 30.0, 50.0, 85.0);
    pub const HARDTUNE: Preset = Preset::new("hardtune", 95.0, 5.0, 5.0, 50.0, 95.0);
    pub const TPAIN: Preset = Preset::new("tpain", 100.0, 0.0, 0.0, 42.0, 100.0);

    /// Presets shipped with the engine
    pub const ALL: [Preset; 5] = [
        Preset::NATURAL,
        Preset::SOFT,
        Preset::MODERN,
        Preset::HARDTUNE,
        Preset::TPAIN,
    ];

    const fn new(
        name: &'static str,
        correction: f32,
        speed: f32,
        humanize: f32,
        formant: f32,
        mix: f32,
    ) -> Self {
        Self {
            name,
            correction,
            speed,
            humanize,
            formant,
            mix,
        }
    }

    /// Look up a preset by name (case-insensitive)
    pub fn by_name(name: &str) -> Option<&'static Preset> {
        let name = name.trim();
        Self::ALL.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Preset as a control message
    pub fn control_update(&self) -> ControlUpdate {
        ControlUpdate {
            key: None,
            scale: None,
            correction: Some(self.correction),
            speed: Some(self.speed),
            humanize: Some(self.humanize),
            formant: Some(self.formant),
            mix: Some(self.mix),
        }
    }

    /// Preset in engine units
    pub fn parameter_update(&self) -> ParameterUpdate {
        self.control_update().to_parameter_update()
    }
}
