//! Integration tests for tessitura-core.

use std::sync::Arc;
use std::thread;

use tessitura_core::{
    Interval, KeyPosition, Mapping, PITCH_RANGE, Tuning, TuningData, compute_lookup_table,
};

/// 5-limit just intonation, twelve degrees.
fn just_intonation() -> Tuning {
    let ratios = [
        (1, 1),
        (16, 15),
        (9, 8),
        (6, 5),
        (5, 4),
        (4, 3),
        (45, 32),
        (3, 2),
        (8, 5),
        (5, 3),
        (9, 5),
        (15, 8),
    ];
    Tuning {
        root_freq_hz: 261.6256,
        octaves_spanned: 1,
        degrees: ratios.iter().map(|&(n, d)| Interval::Ratio(n, d)).collect(),
        mapping: Mapping::identity(60, 12),
    }
}

#[test]
fn test_just_intonation_octave_above_root() {
    let table = compute_lookup_table(&just_intonation());
    let c5 = table.frequency(72).unwrap();
    assert!((c5 - 523.2512).abs() < 1e-9, "got {c5}");

    let g4 = table.frequency(67).unwrap();
    assert!((g4 - 261.6256 * 1.5).abs() < 1e-9);
    assert_eq!(table.get(67).unwrap().degree, 7);

    let g3 = table.frequency(55).unwrap();
    assert!((g3 - 261.6256 * 0.75).abs() < 1e-9);
}

#[test]
fn test_negative_delta_resolves_to_last_key() {
    let pos = KeyPosition::locate(4, 5, 12).unwrap();
    assert_eq!(pos.key_offset, 11);

    let mut tuning = just_intonation();
    tuning.mapping.root_key = 5;
    let table = compute_lookup_table(&tuning);
    let below_root = table.get(4).unwrap();
    assert_eq!(below_root.degree, 11);
    assert!((below_root.freq_hz - 261.6256 * 15.0 / 8.0 / 2.0).abs() < 1e-9);
}

#[test]
fn test_root_key_outside_range() {
    let mut tuning = just_intonation();
    tuning.mapping.root_key = -7;
    let table = compute_lookup_table(&tuning);
    assert_eq!(table.mapped_count(), PITCH_RANGE);
    // Pitch 5 is one full span above the root key.
    assert!((table.frequency(5).unwrap() - 523.2512).abs() < 1e-9);

    tuning.mapping.root_key = 200;
    let table = compute_lookup_table(&tuning);
    assert_eq!(table.mapped_count(), PITCH_RANGE);
    assert_eq!(table.get(116).unwrap().degree, 0);
}

#[test]
fn test_recompute_is_idempotent() {
    let tuning = just_intonation();
    assert_eq!(compute_lookup_table(&tuning), compute_lookup_table(&tuning));
}

#[test]
fn test_tuning_roundtrips_through_toml() {
    let mut tuning = just_intonation();
    tuning.degrees[3] = Interval::Cents(315.641);
    tuning.mapping.keys[1] = None;

    let text = toml::to_string(&tuning).unwrap();
    assert!(text.contains("-1"), "unmapped key should serialize as -1:\n{text}");
    let back: Tuning = toml::from_str(&text).unwrap();
    assert_eq!(back, tuning);
}

#[test]
fn test_tuning_parses_handwritten_toml() {
    let text = r#"
        root_freq_hz = 440.0
        octaves_spanned = 1
        degrees = [{ ratio = [1, 1] }, { cents = 350.0 }, { ratio = [3, 2] }]

        [mapping]
        root_key = 69
        key_span = 4
        keys = [0, 1, -1, 2]
    "#;
    let tuning: Tuning = toml::from_str(text).unwrap();
    tuning.validate().unwrap();
    assert_eq!(tuning.mapping.keys, vec![Some(0), Some(1), None, Some(2)]);

    let table = compute_lookup_table(&tuning);
    assert!(!table.is_mapped(71));
    assert!((table.frequency(73).unwrap() - 880.0).abs() < 1e-9);
}

#[test]
fn test_readers_see_whole_tables_during_updates() {
    let data = Arc::new(TuningData::default());
    let reader = {
        let data = Arc::clone(&data);
        thread::spawn(move || {
            for _ in 0..2000 {
                let table = data.table();
                // Each snapshot is internally consistent: every pitch mapped.
                assert_eq!(table.mapped_count(), PITCH_RANGE);
            }
        })
    };
    for root in 40..80 {
        let mut tuning = Tuning::twelve_tet();
        tuning.mapping.root_key = root;
        data.update(tuning).unwrap();
    }
    reader.join().unwrap();
    assert_eq!(data.version(), 40);
}
