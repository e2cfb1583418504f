// Scientific pitch notation codec
// "C4" <-> 60, "F#3" <-> 54, "Bb-1" <-> 10

/// Semitone returned for pitch names that fail to parse.
pub const FALLBACK_SEMITONE: u8 = 60;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Parse a scientific pitch name into a MIDI semitone.
///
/// Accepts `[A-G]`, an optional `#` or `b`, and a (possibly negative) octave:
/// `semitone = 12 * (octave + 1) + pitch_class`. Returns `None` for anything
/// that does not parse or lands outside 0..=127.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars();

    let letter = chars.next()?;
    let natural: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    if octave_str.is_empty() || octave_str.starts_with('+') {
        return None;
    }
    let octave: i32 = octave_str.parse().ok()?;

    let semitone = 12 * (octave + 1) + natural + accidental;
    if (0..=127).contains(&semitone) {
        Some(semitone as u8)
    } else {
        None
    }
}

/// Parse a bare pitch-class name ("C", "F#", "Bb") into 0..=11.
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let natural: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match chars.next() {
        None => 0,
        Some('#') => 1,
        Some('b') => -1,
        Some(_) => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(((natural + accidental).rem_euclid(12)) as u8)
}

/// Resolve a pitch name, falling back to middle C when it does not parse.
///
/// The fallback is flagged via log only; this function never fails.
pub fn semitone_from_name(name: &str) -> u8 {
    match parse_note_name(name) {
        Some(semitone) => semitone,
        None => {
            log::warn!("unparseable pitch name {:?}, using fallback {}", name, FALLBACK_SEMITONE);
            FALLBACK_SEMITONE
        }
    }
}

/// Sharp-spelled name for a MIDI semitone (60 -> "C4").
pub fn note_name(semitone: u8) -> String {
    let octave = (semitone / 12) as i32 - 1;
    let pitch_class = (semitone % 12) as usize;
    format!("{}{}", NOTE_NAMES[pitch_class], octave)
}
