//! Envelope time conversion and GUS rate bytes

/// Rate byte used when a segment has no usable duration or level change
pub const RATE_NONE: u8 = 0x3F;

/// Rate byte used when no mantissa/exponent pair fits
pub const RATE_OVERFLOW: u8 = 0xC1;

/// Per-exponent rate multipliers of the GUS volume ramp
const RATE_EXPONENT_SCALE: [i32; 4] = [1, 8, 64, 512];

/// Convert SF2 timecents to milliseconds
pub fn timecents_to_msec(timecents: i32) -> i32 {
    (1000.0 * 2f64.powf(timecents as f64 / 1200.0)) as i32
}

/// Encode a ramp of `delta` volume steps over `msec` milliseconds as a rate byte
///
/// The top two bits select the exponent, the low six the mantissa. The
/// largest exponent that yields a mantissa in 1..=63 wins.
pub fn rate_byte(msec: i32, delta: i32) -> u8 {
    if delta <= 0 {
        return RATE_NONE;
    }
    let t = msec.saturating_mul(32) / delta;
    if t <= 0 {
        return RATE_NONE;
    }
    for exponent in (0..4).rev() {
        let mantissa = (RATE_EXPONENT_SCALE[exponent] * 16 + t / 2) / t;
        if mantissa > 0 && mantissa < 64 {
            return ((exponent as u8) << 6) | mantissa as u8;
        }
    }
    RATE_OVERFLOW
}

/// Envelope segment durations in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeTimes {
    pub attack: i32,
    pub hold: i32,
    pub decay: i32,
    pub release: i32,
}

impl EnvelopeTimes {
    /// Convert the four segment times from timecents
    pub fn from_timecents(attack: i32, hold: i32, decay: i32, release: i32) -> Self {
        Self {
            attack: timecents_to_msec(attack),
            hold: timecents_to_msec(hold),
            decay: timecents_to_msec(decay),
            release: timecents_to_msec(release),
        }
    }
}

/// The six rate and six offset bytes of a GUS envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Envelope {
    pub rates: [u8; 6],
    pub offsets: [u8; 6],
}

impl Envelope {
    /// Build an attack/hold/decay/release envelope peaking at `volume` and
    /// settling at `sustain`
    pub fn new(times: &EnvelopeTimes, volume: i32, sustain: i32) -> Self {
        Self {
            rates: [
                rate_byte(times.attack, volume),
                rate_byte(times.hold, volume - 1),
                rate_byte(times.decay, volume - 1 - sustain),
                rate_byte(times.release, 255),
                RATE_NONE,
                RATE_NONE,
            ],
            // Offsets are stored as their low byte
            offsets: [volume as u8, (volume - 1) as u8, sustain as u8, 0, 0, 0],
        }
    }
}
