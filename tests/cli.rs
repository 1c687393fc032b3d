//! 命令行集成测试
//!
//! 只使用不需要远程翻译的页面，测试不访问网络

#[cfg(test)]
mod passing {
    use assert_cmd::Command;
    use std::fs;

    const ENGLISH_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Forum</title></head>
<body><div class="post__body"><p>This is a reply that is already in English</p><p>Ok</p></div></body></html>"#;

    #[test]
    fn writes_page_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        fs::write(&input, ENGLISH_PAGE).unwrap();

        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg(&input)
            .arg("--storage-dir")
            .arg(dir.path().join("storage"))
            .output()
            .unwrap();

        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("<p>This is a reply that is already in English</p>"));
        assert!(stdout.contains("<p>Ok</p>"));
    }

    #[test]
    fn writes_page_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        let output = dir.path().join("translated.html");
        fs::write(&input, ENGLISH_PAGE).unwrap();

        Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("--storage-dir")
            .arg(dir.path().join("storage"))
            .assert()
            .success();

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains(r#"<div class="post__body">"#));
    }

    #[test]
    fn prints_stats_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        fs::write(&input, ENGLISH_PAGE).unwrap();

        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg(&input)
            .arg("--stats")
            .arg("-s")
            .arg("div.post__body")
            .arg("--storage-dir")
            .arg(dir.path().join("storage"))
            .output()
            .unwrap();

        assert!(out.status.success());
        let stats: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(stats["totalTextNodes"], 2);
        assert_eq!(stats["processedNodes"], 2);
        assert_eq!(stats["targetSelectors"][0], "div.post__body");
        assert_eq!(stats["isTranslating"], false);
    }
}

#[cfg(test)]
mod failing {
    use assert_cmd::Command;

    #[test]
    fn missing_input_file() {
        let dir = tempfile::tempdir().unwrap();

        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg(dir.path().join("missing.html"))
            .arg("--storage-dir")
            .arg(dir.path())
            .output()
            .unwrap();

        assert_eq!(out.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&out.stderr).contains("Error:"));
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn invalid_selector() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        std::fs::write(&input, "<p>Hallo</p>").unwrap();

        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg(&input)
            .arg("-s")
            .arg("div..broken")
            .output()
            .unwrap();

        assert_eq!(out.status.code(), Some(1));
        assert!(out.stdout.is_empty());
    }
}
