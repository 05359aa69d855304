// Integration tests for BlendX
use blendx::prelude::*;
use blendx_core::{CommandExtractor, IndexParams};
use blendx_storage::{read_feature_table, write_feature_table};
use std::path::Path;
use std::sync::Arc;

fn track(name: &str, bpm: f64, key: &str, energy: f64, mfcc: &[f64]) -> TrackFeatures {
    TrackFeatures {
        filename: name.to_string(),
        bpm,
        key: key.to_string(),
        energy,
        mfcc: mfcc.to_vec(),
    }
}

fn three_tracks() -> FeatureTable {
    FeatureTable::new(
        FeatureSchema::with_mfcc(2),
        vec![
            track("a.mp3", 120.0, "C_major", 0.20, &[-300.0, 80.0]),
            track("b.mp3", 121.0, "G_major", 0.22, &[-298.0, 82.0]),
            track("c.mp3", 180.0, "A_minor", 0.80, &[-150.0, 20.0]),
        ],
    )
    .unwrap()
}

fn library(n: usize) -> FeatureTable {
    let keys = ["C_major", "A_minor", "G_major", "E_minor", "D_major", "Bb_major"];
    let rows = (0..n)
        .map(|i| {
            let x = i as f64;
            track(
                &format!("track{:03}.mp3", i),
                100.0 + (x * 7.0) % 40.0,
                keys[i % keys.len()],
                (x * 0.37) % 1.0,
                &[(x * 13.0) % 50.0 - 300.0, (x * 3.0) % 17.0, (x * x) % 11.0],
            )
        })
        .collect();
    FeatureTable::new(FeatureSchema::with_mfcc(3), rows).unwrap()
}

#[test]
fn test_harmonic_neighbour_ranks_first() {
    let bundle = ModelBundle::fit(three_tracks(), &IndexParams::default()).unwrap();
    let recs = bundle.recommend("a.mp3", 5).unwrap();

    let names: Vec<&str> = recs.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["b.mp3", "c.mp3"]);
    assert_eq!(recs[0].camelot.to_string(), "9B");
    assert_eq!(recs[1].camelot.to_string(), "8A");
    assert!(recs[0].score > recs[1].score);
}

#[test]
fn test_result_count_and_membership() {
    let table = library(25);
    let bundle = ModelBundle::fit(table.clone(), &IndexParams::default()).unwrap();

    for top_n in [0, 1, 5, 10, 24, 50] {
        let recs = bundle.recommend("track007.mp3", top_n).unwrap();
        assert_eq!(recs.len(), top_n.min(24));
        for rec in &recs {
            assert_ne!(rec.filename, "track007.mp3");
            assert!(table.contains(&rec.filename));
            assert!((0.0..=1.0).contains(&rec.score));
        }
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}

#[test]
fn test_fit_is_deterministic() {
    let first = ModelBundle::fit(library(30), &IndexParams::default()).unwrap();
    let second = ModelBundle::fit(library(30), &IndexParams::default()).unwrap();

    for i in [0, 9, 29] {
        let name = format!("track{:03}.mp3", i);
        assert_eq!(
            first.recommend(&name, 7).unwrap(),
            second.recommend(&name, 7).unwrap()
        );
    }
}

#[test]
fn test_state_errors() {
    let dir = tempfile::tempdir().unwrap();
    let config = BlendConfig::new(dir.path().join("data"), dir.path().join("music"));
    write_feature_table(&config.feature_table_path, &three_tracks()).unwrap();

    let manager = ModelManager::new(config).unwrap();
    assert!(matches!(manager.recommend("a.mp3", None), Err(Error::NotTrained)));

    manager.train(false).unwrap();
    assert!(matches!(
        manager.recommend("zzz.mp3", None),
        Err(Error::TrackNotFound(name)) if name == "zzz.mp3"
    ));
}

#[test]
fn test_retrain_replaces_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = BlendConfig::new(dir.path().join("data"), dir.path().join("music"));
    write_feature_table(&config.feature_table_path, &three_tracks()).unwrap();

    let manager = ModelManager::new(config.clone()).unwrap();
    let first = manager.train(false).unwrap();
    assert_eq!(manager.recommend("a.mp3", None).unwrap().len(), 2);

    write_feature_table(&config.feature_table_path, &library(12)).unwrap();
    let second = manager.train(false).unwrap();
    assert_ne!(first.bundle_id, second.bundle_id);
    assert!(matches!(
        manager.recommend("a.mp3", None),
        Err(Error::TrackNotFound(_))
    ));
    assert_eq!(manager.recommend("track003.mp3", None).unwrap().len(), 5);

    let restarted = ModelManager::new(config).unwrap();
    assert_eq!(restarted.manifest().unwrap().bundle_id, second.bundle_id);
    assert_eq!(
        restarted.recommend("track003.mp3", Some(4)).unwrap(),
        manager.recommend("track003.mp3", Some(4)).unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_end_to_end_with_external_extractor() {
    let dir = tempfile::tempdir().unwrap();
    let music = dir.path().join("music");
    std::fs::create_dir(&music).unwrap();

    // key, bpm and energy are read from the file name: <key>_<mode>-<bpm>-<energy>.<ext>
    let script = dir.path().join("extract.sh");
    std::fs::write(
        &script,
        r#"name=$(basename "$1")
stem=${name%.*}
key=$(echo "$stem" | cut -d- -f1)
bpm=$(echo "$stem" | cut -d- -f2)
energy=$(echo "$stem" | cut -d- -f3)
if [ "$key" = "broken" ]; then echo "cannot decode" >&2; exit 1; fi
echo "{\"bpm\": $bpm, \"energy\": $energy, \"key\": \"$key\", \"mfcc\": [$bpm, $energy]}"
"#,
    )
    .unwrap();

    for name in [
        "C_major-120-0.2.mp3",
        "G_major-121-0.25.wav",
        "A_minor-180-0.9.flac",
        "broken-100-0.1.mp3",
        "cover.jpg",
    ] {
        std::fs::write(music.join(name), b"").unwrap();
    }

    let mut config = BlendConfig::new(dir.path().join("data"), &music);
    config.extraction_attempts = 1;
    let manager = ModelManager::new(config.clone())
        .unwrap()
        .with_extractor(Arc::new(CommandExtractor::new(
            "/bin/sh",
            vec![script.display().to_string()],
        )));

    let summary = manager.train(true).unwrap();
    assert_eq!(summary.rows, 3);
    let build = summary.build.unwrap();
    assert_eq!(build.failures.len(), 1);
    assert_eq!(build.failures[0].file, "broken-100-0.1.mp3");

    let table = read_feature_table(&config.feature_table_path).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get("G_major-121-0.25.wav").unwrap().bpm, 121.0);

    let recs = manager.recommend("C_major-120-0.2.mp3", None).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].filename, "G_major-121-0.25.wav");
    assert_eq!(recs[1].filename, "A_minor-180-0.9.flac");
}

#[test]
fn test_missing_music_dir_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = BlendConfig::new(dir.path().join("data"), Path::new("/nonexistent/music"));
    let manager = ModelManager::new(config)
        .unwrap()
        .with_extractor(Arc::new(CommandExtractor::new("/bin/true", Vec::new())));

    assert!(matches!(manager.build_features(), Err(Error::Data(_))));
    assert!(!manager.is_trained());
}
