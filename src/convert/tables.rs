//! Pitch tables

/// Frequency of each MIDI note in milli-hertz, equal temperament with A4 = 440 Hz
pub const FREQ_TABLE: [u32; 128] = [
    8176, 8662, 9177, 9723, 10301, 10913, 11562, 12250,
    12978, 13750, 14568, 15434, 16352, 17324, 18354, 19445,
    20602, 21827, 23125, 24500, 25957, 27500, 29135, 30868,
    32703, 34648, 36708, 38891, 41203, 43654, 46249, 48999,
    51913, 55000, 58270, 61735, 65406, 69296, 73416, 77782,
    82407, 87307, 92499, 97999, 103826, 110000, 116541, 123471,
    130813, 138591, 146832, 155563, 164814, 174614, 184997, 195998,
    207652, 220000, 233082, 246942, 261626, 277183, 293665, 311127,
    329628, 349228, 369994, 391995, 415305, 440000, 466164, 493883,
    523251, 554365, 587330, 622254, 659255, 698456, 739989, 783991,
    830609, 880000, 932328, 987767, 1046502, 1108731, 1174659, 1244508,
    1318510, 1396913, 1479978, 1567982, 1661219, 1760000, 1864655, 1975533,
    2093005, 2217461, 2349318, 2489016, 2637020, 2793826, 2959955, 3135963,
    3322438, 3520000, 3729310, 3951066, 4186009, 4434922, 4698636, 4978032,
    5274041, 5587652, 5919911, 6271927, 6644875, 7040000, 7458620, 7902133,
    8372018, 8869844, 9397273, 9956063, 10548082, 11175303, 11839822, 12543854,
];

/// Ratio for a fraction of a semitone, in 1/256 semitone steps
pub fn bend_fine(step: usize) -> f64 {
    2f64.powf(step.min(255) as f64 / (256.0 * 12.0))
}

/// Ratio for a whole number of semitones
pub fn bend_coarse(semitones: usize) -> f64 {
    2f64.powf(semitones.min(127) as f64 / 12.0)
}
