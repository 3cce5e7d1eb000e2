use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use vibecoder_core::stream::{SseDecoder, StreamDecoder};
use vibecoder_core::{apply_response, render_preview, setup, VibeError, VibeResult, VirtualFileSet};

const TEXT_EXTENSIONS: &[&str] = &["html", "css", "js", "mjs", "json", "md", "txt", "svg"];
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
];

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: vibe-preview <project-dir> <response-file> [output.html]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  vibe-preview ./site reply.txt");
        eprintln!("  vibe-preview ./site reply.sse preview.html");
        process::exit(1);
    }

    setup::init();

    if let Err(e) = run(&args[1], &args[2], args.get(3).map(String::as_str)) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn run(project_dir: &str, response_path: &str, output: Option<&str>) -> VibeResult<()> {
    let files = load_project(Path::new(project_dir))?;
    let raw = fs::read_to_string(response_path)?;
    let response = decode_response(&raw);

    let (parsed, outcome) = apply_response(&files, &response);

    match parsed.tier {
        Some(tier) => eprintln!(
            "✓ parsed {} file(s), {} patch(es) via {:?}{}",
            parsed.files.len(),
            parsed.patches.len(),
            tier,
            if parsed.used_fallback { " (fallback)" } else { "" }
        ),
        None => eprintln!("✗ response contained no file changes"),
    }
    if let Some(thought) = &parsed.thought {
        eprintln!("  Plan: {}", thought);
    }
    for warning in &outcome.warnings {
        eprintln!("  warning: {}", warning);
    }

    let html = preview_document(&outcome.files, project_dir)?;

    match output {
        Some(path) => {
            fs::write(path, html)?;
            println!("✓ preview written to {}", path);
        }
        None => println!("{}", html),
    }
    Ok(())
}

fn preview_document(files: &VirtualFileSet, project_dir: &str) -> VibeResult<String> {
    render_preview(files).ok_or_else(|| VibeError::MissingEntry(project_dir.to_string()))
}

/// Accept either plain text or a captured `data:` event stream.
fn decode_response(raw: &str) -> String {
    if !raw.trim_start().starts_with("data:") {
        return raw.to_string();
    }

    let mut sse = SseDecoder::new();
    let mut decoder = StreamDecoder::new();
    for delta in sse.feed(raw) {
        decoder.push(&delta);
    }
    if let Some(delta) = sse.finish() {
        decoder.push(&delta);
    }
    decoder.finish()
}

fn load_project(root: &Path) -> VibeResult<VirtualFileSet> {
    let mut files = VirtualFileSet::new();
    load_dir(root, root, &mut files)?;
    Ok(files)
}

fn load_dir(root: &Path, dir: &Path, files: &mut VirtualFileSet) -> VibeResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            load_dir(root, &path, files)?;
            continue;
        }

        let Some(ext) = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        else {
            continue;
        };
        let key = path
            .strip_prefix(root)
            .unwrap_or(path.as_path())
            .to_string_lossy()
            .replace('\\', "/");

        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            files.insert(key, fs::read_to_string(&path)?);
        } else if let Some((_, mime)) = IMAGE_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            let bytes = fs::read(&path)?;
            files.insert(key, format!("data:{};base64,{}", mime, BASE64.encode(bytes)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entry_is_not_an_io_error() {
        let files: VirtualFileSet = [("styles.css", "p{}")].into_iter().collect();
        let err = preview_document(&files, "./site").unwrap_err();

        assert_eq!(err, VibeError::MissingEntry("./site".to_string()));
        assert_eq!(err.to_string(), "No index.html in ./site to preview");
    }

    #[test]
    fn test_preview_document_with_entry() {
        let files: VirtualFileSet = [("index.html", "<p>x</p>")].into_iter().collect();
        assert!(preview_document(&files, "./site").unwrap().ends_with("<p>x</p>"));
    }

    #[test]
    fn test_decode_plain_and_event_stream_responses() {
        assert_eq!(decode_response("<!-- filename: a.js -->\nx"), "<!-- filename: a.js -->\nx");

        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"<h1>\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"Hi</h1>\"}}]}";
        assert_eq!(decode_response(sse), "<h1>Hi</h1>");
    }
}
