use std::path::{Path, PathBuf};

use rusty_cqd::data::collection::MatchPolicy;
use rusty_cqd::data::model::{Channel, SpectrumKind};
use rusty_cqd::{CqdApp, RunConfig, SpectraError};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rusty-cqd-it-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("measurements")).unwrap();
    dir
}

const PLATE_MAP: &str = "\
Plate,1
A,1,W-01,,,ref,reference sample with only water
,2,Q-02,citric acid,urea,7b,
E,1,Q-13,glucose,,8a,spilled a little
";

fn abs_block(label: &str, values: &str) -> String {
    format!(
        "Label: {label}\n\
         Mode,,,,Absorbance\n\
         Start Time:,2024-10-07 10:00:00\n\
         ,\n\
         Wavel.,300,310,320,,\n\
         A1,{values}\n\
         ,\n\
         End Time:,2024-10-07 10:01:00\n\
         ,\n"
    )
}

fn flu_block(label: &str, excitation: u32, gain: u32, values: &str) -> String {
    format!(
        "Label: {label}\n\
         Mode,,,,Fluorescence Top Reading\n\
         Excitation Wavelength,,,,{excitation}\n\
         Gain,,,,{gain}\n\
         Start Time:,2024-10-07 10:02:00\n\
         Wavel.,450,460\n\
         A1,{values}\n\
         B1,{values}\n\
         C1,{values}\n\
         D1,{values}\n\
         ,\n\
         End Time:,2024-10-07 10:03:00\n\
         ,\n"
    )
}

fn write_run(dir: &Path, extra_block: &str) {
    std::fs::write(dir.join("plate_map.csv"), PLATE_MAP).unwrap();

    let mut sheet = String::from("Application: Tecan i-control\n,\n");
    sheet.push_str(&abs_block("1", "0.25,0.25,0.25"));
    sheet.push_str(&abs_block("2", "0.75,OVER,0.5"));
    sheet.push_str(&flu_block("2a", 350, 15, "105,105"));
    sheet.push_str(&flu_block("13b", 400, 50, "500,500"));
    sheet.push_str(&abs_block("13", "0.3,0.3,x"));
    sheet.push_str(extra_block);
    std::fs::write(dir.join("measurements").join("Sheet1.csv"), sheet).unwrap();

    let mut baseline = String::new();
    baseline.push_str(&flu_block("b1", 350, 10, "1,2"));
    baseline.push_str(&flu_block("b2", 350, 20, "3,4"));
    baseline.push_str(&flu_block("b3", 400, 10, "1,1"));
    baseline.push_str(&flu_block("b4", 400, 20, "2,2"));
    std::fs::write(dir.join("fluorescence_baseline.csv"), baseline).unwrap();
}

fn config(dir: &Path) -> RunConfig {
    RunConfig {
        input_dir: dir.to_path_buf(),
        output_dir: dir.join("reports"),
        ..Default::default()
    }
}

#[test]
fn test_non_numeric_cell_aborts_run() {
    let dir = scratch_dir("bad-cell");
    write_run(&dir, "");
    let err = CqdApp::new(config(&dir)).run().unwrap_err();
    let root = err.downcast_ref::<SpectraError>().expect("spectra error at the root");
    assert!(root.is_structural());
    std::fs::remove_dir_all(&dir).ok();
}

fn valid_run(name: &str, extra_block: &str) -> PathBuf {
    let dir = scratch_dir(name);
    write_run(&dir, extra_block);
    // replace the malformed block with a valid one
    let sheet_path = dir.join("measurements").join("Sheet1.csv");
    let sheet = std::fs::read_to_string(&sheet_path)
        .unwrap()
        .replace("A1,0.3,0.3,x", "A1,0.3,0.3,0.3");
    std::fs::write(&sheet_path, sheet).unwrap();
    dir
}

#[test]
fn test_full_run_writes_corrected_reports() {
    let dir = valid_run("full", "");
    let outcome = CqdApp::new(config(&dir)).run().unwrap();
    assert_eq!(outcome.reports.len(), 3);
    assert!(dir.join("reports").join("summary.json").is_file());

    let state = &outcome.state;
    assert_eq!(state.stats.attached, 5);

    // absorbance background is the single water blank
    let bg = state.background.absorbance().ready().unwrap();
    assert_eq!(bg.blank_count, 1);
    assert_eq!(bg.mean, vec![0.25, 0.25, 0.25]);

    let q02 = state.collection.find(1, 2).unwrap();
    let abs = q02.spectrum(SpectrumKind::Abs).unwrap();
    assert!(abs.channel(Channel::Abs).unwrap()[1].is_nan());

    // gain 15 sits halfway between the 350 nm baselines at gains 10 and 20
    let flu = q02.spectrum(SpectrumKind::Ex350).unwrap();
    let corrected = state.background.subtract_channel(flu, Channel::Cu).unwrap();
    assert_eq!(corrected, vec![103.0, 102.0]);
    // stored values untouched
    assert_eq!(flu.channel(Channel::Cu).unwrap(), &[105.0, 105.0]);

    // gain 50 is above every 400 nm baseline: reported uncorrected
    let q13 = state.collection.find(1, 13).unwrap();
    let flu400 = q13.spectrum(SpectrumKind::Ex400).unwrap();
    let out = state.background.subtract(flu400).unwrap();
    assert!(!out.is_applied());
    assert_eq!(out.channels, flu400.channels);

    let report = std::fs::read_to_string(dir.join("reports").join("Q-02.csv")).unwrap();
    assert!(report.contains("Absorbance,0.5,NaN,0.25\n"));
    assert!(report.contains("Gain:,15\n"));
    assert!(report.contains("Copper,103,102\n"));
    assert!(report.contains("No data"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_unknown_mode_does_not_stop_sheet() {
    let lum = "Label: 1\nMode,,,,Luminescence\nStart Time:,bad\nWavel.,1\nA1,1\n,\nEnd Time:,bad\n,\n";
    let dir = valid_run("lum", lum);
    let outcome = CqdApp::new(config(&dir)).run().unwrap();
    assert_eq!(outcome.state.stats.skipped_mode, 1);
    assert_eq!(outcome.state.stats.attached, 5);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_undeclared_well_strict_vs_tolerant() {
    let dir = valid_run("undeclared", &abs_block("24", "0.2,0.2,0.2"));

    let err = CqdApp::new(config(&dir)).run().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SpectraError>(),
        Some(SpectraError::NoSample { plate: 1, well: 24 })
    ));

    let tolerant = RunConfig {
        match_policy: MatchPolicy::Tolerant,
        ..config(&dir)
    };
    let outcome = CqdApp::new(tolerant).run().unwrap();
    assert_eq!(outcome.state.stats.discarded, 1);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_inputs_are_reported() {
    let dir = scratch_dir("missing");
    let err = CqdApp::new(config(&dir)).run().unwrap_err();
    assert!(err.to_string().contains("plate_map.csv"));
    std::fs::remove_dir_all(&dir).ok();
}
