use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_imgelf")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "imgelf.exe"
            } else {
                "imgelf"
            });
            p
        })
}

#[test]
fn cli_render_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);
    let out_arg = out_path.to_string_lossy().to_string();

    let status = std::process::Command::new(exe())
        .args([
            "render", "--width", "64", "--height", "48", "--format", "png", "--no-text", "--out",
        ])
        .arg(out_arg.as_str())
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap();
    assert_eq!((img.width(), img.height()), (64, 48));
}

#[test]
fn cli_render_into_directory_uses_download_name() {
    let dir = PathBuf::from("target").join("cli_smoke_dir");
    std::fs::create_dir_all(&dir).unwrap();
    let expected = dir.join("_ImgElf.bmp");
    let _ = std::fs::remove_file(&expected);

    let status = std::process::Command::new(exe())
        .args(["render", "--width", "8", "--height", "8", "--format", "bmp"])
        .arg("--out")
        .arg(&dir)
        .status()
        .unwrap();

    assert!(status.success());
    assert!(expected.exists());
}

#[test]
fn cli_validate_reports_field_errors() {
    let output = std::process::Command::new(exe())
        .args(["validate", "--width", "0", "--height", "600", "--format", "png"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let errors: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        errors,
        serde_json::json!({"width": "Width must be an integer between 1 and 10000"})
    );
}

#[test]
fn cli_limits_prints_effective_limits() {
    let output = std::process::Command::new(exe())
        .args(["limits", "--format", "ico"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let limits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(limits["min_width"], 16);
    assert_eq!(limits["max_height"], 256);
}
