//! The `desktop` feature reads these files at compile time.

use std::path::Path;

use serde_json::Value;

fn manifest_dir() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn tauri_config() -> Value {
    let raw = std::fs::read_to_string(manifest_dir().join("tauri.conf.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn test_bundle_icons_exist_in_their_declared_format() {
    let config = tauri_config();
    let icons = config["bundle"]["icon"].as_array().expect("bundle.icon is a list");
    assert!(!icons.is_empty());

    for icon in icons {
        let path = icon.as_str().unwrap();
        let bytes = std::fs::read(manifest_dir().join(path))
            .unwrap_or_else(|err| panic!("{path}: {err}"));
        let magic: &[u8] = match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("png") => b"\x89PNG\r\n\x1a\n",
            Some("ico") => &[0, 0, 1, 0],
            Some("icns") => b"icns",
            other => panic!("unexpected icon type {other:?}"),
        };
        assert!(bytes.starts_with(magic), "{path} is not a valid icon");
    }
}

#[test]
fn test_default_window_icon_is_rgba() {
    let bytes = std::fs::read(manifest_dir().join("icons/icon.png")).unwrap();
    // IHDR: width, height, bit depth, colour type (6 = RGBA)
    assert_eq!(&bytes[12..16], b"IHDR");
    assert_eq!(bytes[24], 8);
    assert_eq!(bytes[25], 6);
}

#[test]
fn test_frontend_dist_holds_the_page() {
    let config = tauri_config();
    let dist = config["build"]["frontendDist"].as_str().unwrap();
    let page = std::fs::read_to_string(manifest_dir().join(dist).join("index.html")).unwrap();
    for command in ["connect", "set_username", "set_room", "set_draft", "send_message"] {
        assert!(
            page.contains(&format!("invoke('{command}'")),
            "page never invokes {command}"
        );
    }
}
