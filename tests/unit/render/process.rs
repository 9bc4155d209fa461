use super::*;
use crate::analysis::mapper::fallback_schema;
use crate::composition::coder::code;
use crate::director::synth::direct;

fn job(output_path: PathBuf, timeout: Duration) -> RenderJob {
    let ir = direct(&fallback_schema("photo.png"), "zoom in", Some("/in/photo.png"));
    RenderJob {
        composition: code(&ir).unwrap(),
        source_image: Some(PathBuf::from("/in/photo.png")),
        output_path,
        config: RenderConfig::default(),
        timeout,
    }
}

/// Renderer running `script` through `sh -c`; generated flags arrive as `$1..`.
fn sh(script: &str, work_dir: &Path) -> CommandRenderer {
    CommandRenderer::new("sh")
        .with_base_args(["-c", script, "renderer"])
        .with_work_dir(work_dir)
}

const FIND_OUTPUT: &str = r#"out=""; for a in "$@"; do if [ "$prev" = "--output" ]; then out="$a"; fi; prev="$a"; done"#;

#[test]
fn args_follow_the_renderer_contract() {
    let r = CommandRenderer::new("stillmotion-render");
    let j = job(PathBuf::from("/out/v.mp4"), Duration::from_secs(1));
    let args = r.build_args(&j, Path::new("/work/c.json"));
    assert_eq!(
        args,
        [
            "render",
            "--composition",
            "/work/c.json",
            "--output",
            "/out/v.mp4",
            "--codec",
            "h264",
            "--crf",
            "18",
            "--pixel-format",
            "yuv420p",
            "--concurrency",
            "4",
            "--image",
            "/in/photo.png",
        ]
    );

    let mut no_image = j.clone();
    no_image.source_image = None;
    let args = r.build_args(&no_image, Path::new("/work/c.json"));
    assert!(!args.iter().any(|a| a == "--image"));
}

#[tokio::test]
async fn missing_binary_is_reported() {
    let r = CommandRenderer::new("stillmotion-definitely-not-installed");
    assert!(matches!(r.check().await, Err(RenderError::BinaryNotFound(_))));

    let dir = tempfile::tempdir().unwrap();
    let err = r
        .render(&job(dir.path().join("v.mp4"), Duration::from_secs(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::BinaryNotFound(name) if name.contains("not-installed")));
}

#[cfg(unix)]
#[tokio::test]
async fn successful_render_reports_size_and_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let script = format!(
        r#"{FIND_OUTPUT}; echo "rendering" ; printf '%s ' "$@" > "$out""#
    );
    let r = sh(&script, work.path());
    assert!(r.check().await.is_ok());

    let target = out.path().join("nested").join("v.mp4");
    let video = r
        .render(&job(target.clone(), Duration::from_secs(10)))
        .await
        .unwrap();
    assert_eq!(video.path, target);
    assert!(video.file_size > 0);

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("--codec h264"));
    assert!(written.contains("--image /in/photo.png"));

    let leftovers = std::fs::read_dir(work.path()).unwrap().count();
    assert_eq!(leftovers, 0, "composition artifact must be removed");
}

#[cfg(unix)]
#[tokio::test]
async fn artifact_is_the_composition_json() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let script = format!(
        r#"{FIND_OUTPUT}; comp=""; for a in "$@"; do if [ "$p" = "--composition" ]; then comp="$a"; fi; p="$a"; done; cat "$comp" > "$out""#
    );
    let j = job(out.path().join("v.mp4"), Duration::from_secs(10));
    sh(&script, work.path()).render(&j).await.unwrap();

    let copied = std::fs::read_to_string(out.path().join("v.mp4")).unwrap();
    let back = Composition::from_json(&copied).unwrap();
    assert_eq!(back.id, j.composition.id);
    assert_eq!(back.tracks.len(), j.composition.tracks.len());
    assert_eq!(back.metadata.duration_in_frames, 150);
}

#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_keeps_stderr_tail() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let r = sh("echo 'encoder exploded' >&2; exit 3", work.path());
    let err = r
        .render(&job(out.path().join("v.mp4"), Duration::from_secs(10)))
        .await
        .unwrap_err();
    match err {
        RenderError::ProcessFailed { code, stderr } => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("encoder exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn success_without_output_is_distinct_from_failure() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let missing = sh("exit 0", work.path())
        .render(&job(out.path().join("missing.mp4"), Duration::from_secs(10)))
        .await
        .unwrap_err();
    assert!(matches!(missing, RenderError::MissingOutput(_)));

    let script = format!(r#"{FIND_OUTPUT}; : > "$out""#);
    let empty = sh(&script, work.path())
        .render(&job(out.path().join("empty.mp4"), Duration::from_secs(10)))
        .await
        .unwrap_err();
    assert!(matches!(empty, RenderError::EmptyOutput(p) if p.ends_with("empty.mp4")));
}

#[cfg(unix)]
#[tokio::test]
async fn deadline_kills_the_process() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let started = std::time::Instant::now();
    let err = sh("exec sleep 30", work.path())
        .render(&job(out.path().join("v.mp4"), Duration::from_millis(200)))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::TimedOut(d) if d == Duration::from_millis(200)));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn deadline_covers_helpers_holding_the_pipes() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let script = format!(r#"{FIND_OUTPUT}; echo data > "$out"; sleep 30 & exit 0"#);
    let started = std::time::Instant::now();
    let err = sh(&script, work.path())
        .render(&job(out.path().join("v.mp4"), Duration::from_millis(500)))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::TimedOut(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn deadline_kills_the_whole_process_group() {
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pid_file = out.path().join("helper.pid");
    let script = format!(
        r#"sleep 30 & echo $! > '{}'; wait"#,
        pid_file.display()
    );
    let err = sh(&script, work.path())
        .render(&job(out.path().join("v.mp4"), Duration::from_millis(500)))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::TimedOut(_)));

    let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
    let stat = format!("/proc/{pid}/stat");
    let mut alive = true;
    for _ in 0..40 {
        alive = match std::fs::read_to_string(&stat) {
            // Field 3 is the state; a zombie is already dead.
            Ok(s) => s.rsplit(") ").next().is_some_and(|rest| !rest.starts_with('Z')),
            Err(_) => false,
        };
        if !alive {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!alive, "helper {pid} outlived the deadline");
}

#[tokio::test]
async fn verify_output_checks_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v.mp4");
    assert!(matches!(
        verify_output(&path).await,
        Err(RenderError::MissingOutput(_))
    ));
    std::fs::write(&path, b"").unwrap();
    assert!(matches!(
        verify_output(&path).await,
        Err(RenderError::EmptyOutput(_))
    ));
    std::fs::write(&path, b"data").unwrap();
    assert_eq!(verify_output(&path).await.unwrap(), 4);
}

#[test]
fn failure_messages_name_the_cause() {
    let e = RenderError::ProcessFailed {
        code: None,
        stderr: "x".into(),
    };
    assert_eq!(e.to_string(), "renderer exited with a signal: x");
    let e = RenderError::EmptyOutput(PathBuf::from("/o/v.mp4"));
    assert!(e.to_string().contains("/o/v.mp4"));
}
