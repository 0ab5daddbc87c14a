use std::{error::Error, fs, path::Path};

use assert_cmd::cargo::cargo_bin_cmd;
use image::{ImageBuffer, Rgb};
use serde_json::Value;
use tempfile::tempdir;

const SEQUENCE_LEN: usize = 500;
const TUMOR_MODEL_REL_PATH: &str = "../models/CNN.onnx";

/// Perceptron that is positive only when the last token index exceeds 10.
fn write_sentiment_artifacts(dir: &Path) -> Result<(), Box<dyn Error>> {
    let mut weights = vec![0.0f32; SEQUENCE_LEN];
    weights[SEQUENCE_LEN - 1] = 1.0;
    fs::write(
        dir.join("imdb_perceptron.json"),
        serde_json::json!({ "weights": weights, "bias": -10.0 }).to_string(),
    )?;
    fs::write(
        dir.join("word_index.json"),
        r#"{"the": 1, "plot": 2, "was": 3, "awful": 5, "brilliant": 530}"#,
    )?;
    Ok(())
}

fn run_sentiment(dir: &Path, text: &str) -> Result<Value, Box<dyn Error>> {
    let output = cargo_bin_cmd!("hub-cli")
        .current_dir(dir)
        .args(["sentiment", "--model", "perceptron", "--model-dir"])
        .arg(dir)
        .arg("--vocabulary")
        .arg(dir.join("word_index.json"))
        .arg("--text")
        .arg(text)
        .output()?;
    assert!(
        output.status.success(),
        "hub-cli failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn sentiment_prints_json_record() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_sentiment_artifacts(work_dir.path())?;

    let positive = run_sentiment(work_dir.path(), "the plot was brilliant")?;
    assert_eq!(positive["task"], "sentiment");
    assert_eq!(positive["model"], "Perceptron");
    assert_eq!(positive["label"], "Positive");

    let negative = run_sentiment(work_dir.path(), "the plot was awful")?;
    assert_eq!(negative["label"], "Negative");
    Ok(())
}

#[test]
fn sentiment_settings_come_from_config_file() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let base = work_dir.path();
    write_sentiment_artifacts(base)?;

    let config_path = base.join("settings.json");
    fs::write(
        &config_path,
        serde_json::json!({
            "vocabulary_path": base.join("word_index.json"),
            "sentiment": { "model_dir": base, "default_model": "perceptron" }
        })
        .to_string(),
    )?;
    let json_path = base.join("out/prediction.json");

    cargo_bin_cmd!("hub-cli")
        .current_dir(base)
        .arg("--config")
        .arg(&config_path)
        .arg("--json")
        .arg(&json_path)
        .args(["sentiment", "--text", "brilliant"])
        .assert()
        .success();

    let record: Value = serde_json::from_str(&fs::read_to_string(&json_path)?)?;
    assert_eq!(record["label"], "Positive");
    Ok(())
}

#[test]
fn blank_review_is_rejected_as_empty_input() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let output = cargo_bin_cmd!("hub-cli")
        .current_dir(work_dir.path())
        .args(["sentiment", "--text", "   "])
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("EmptyInput"));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn missing_vocabulary_is_reported() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_sentiment_artifacts(work_dir.path())?;
    let output = cargo_bin_cmd!("hub-cli")
        .current_dir(work_dir.path())
        .args(["sentiment", "--text", "fine", "--model", "perceptron"])
        .arg("--model-dir")
        .arg(work_dir.path())
        .arg("--vocabulary")
        .arg(work_dir.path().join("absent.json"))
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("VocabularyUnavailable"));
    Ok(())
}

#[test]
fn missing_tumor_model_is_reported() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("scan.png");
    ImageBuffer::from_pixel(64, 64, Rgb([10u8, 10, 10])).save(&image_path)?;

    let output = cargo_bin_cmd!("hub-cli")
        .current_dir(work_dir.path())
        .arg("tumor")
        .arg("--image")
        .arg(&image_path)
        .arg("--model")
        .arg(work_dir.path().join("CNN.onnx"))
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ModelLoadError"));
    Ok(())
}

#[test]
fn tumor_detection_runs_when_model_present() -> Result<(), Box<dyn Error>> {
    let model = Path::new(env!("CARGO_MANIFEST_DIR")).join(TUMOR_MODEL_REL_PATH);
    if !model.exists() {
        eprintln!(
            "skipping tumor CLI test; model missing at {}",
            model.display()
        );
        return Ok(());
    }

    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("scan.png");
    let img = ImageBuffer::from_fn(300, 200, |x, y| {
        let v = ((x + y) % 255) as u8;
        Rgb([v, v, v])
    });
    img.save(&image_path)?;

    let output = cargo_bin_cmd!("hub-cli")
        .arg("tumor")
        .arg("--image")
        .arg(&image_path)
        .arg("--model")
        .arg(&model)
        .output()?;
    assert!(output.status.success());
    let record: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(record["task"], "tumor");
    let label = record["label"].as_str().unwrap_or_default();
    assert!(label == "Tumor Detected" || label == "No Tumor");

    let garbage = work_dir.path().join("garbage.png");
    fs::write(&garbage, b"not a png")?;
    let output = cargo_bin_cmd!("hub-cli")
        .arg("tumor")
        .arg("--image")
        .arg(&garbage)
        .arg("--model")
        .arg(&model)
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ImageDecodeError"));
    Ok(())
}
