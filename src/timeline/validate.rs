use std::fmt;

use crate::{
    foundation::core::TIME_EPSILON,
    timeline::model::{Camera, MOTION_IR_VERSION, Timeline, TimelineMetadata},
};

/// Default project name for generated timelines.
pub const DEFAULT_PROJECT_NAME: &str = "Image Motion";

/// Outcome of a structural validation pass. Collects every violation rather than stopping at
/// the first.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// `true` when `errors` is empty.
    pub is_valid: bool,
    /// Human-readable violations, each prefixed with the JSON path it concerns.
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn from_issues(issues: Vec<Issue>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            errors: issues.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            return write!(f, "valid");
        }
        write!(f, "{}", self.errors.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathElem {
    Field(&'static str),
    Index(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Issue {
    path: Vec<PathElem>,
    message: String,
}

impl Issue {
    pub(crate) fn at(path: &[PathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        let mut s = String::from("$");
        for p in &self.path {
            match *p {
                PathElem::Field(name) => {
                    s.push('.');
                    s.push_str(name);
                }
                PathElem::Index(i) => {
                    s.push('[');
                    s.push_str(&i.to_string());
                    s.push(']');
                }
            }
        }
        write!(f, "{s}: {}", self.message)
    }
}

/// Empty, structurally complete timeline skeleton. The caller must add at least one asset and
/// one track before it validates.
pub fn create_basic_timeline(duration: f64, width: u32, height: u32, fps: u32) -> Timeline {
    Timeline {
        version: MOTION_IR_VERSION.to_string(),
        metadata: TimelineMetadata {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            created_at: None,
            duration,
            fps,
            width,
            height,
            background_color: None,
        },
        assets: Vec::new(),
        tracks: Vec::new(),
        camera: Camera::default(),
        global_effects: Vec::new(),
    }
}

/// [`create_basic_timeline`] with the default 5 s, 1920×1080 @ 30 fps settings.
pub fn default_timeline() -> Timeline {
    create_basic_timeline(5.0, 1920, 1080, 30)
}

/// Check the Motion-IR invariants: at least one asset and one track, every layer ends within
/// the timeline, every keyframe lies in `[0, duration]`. Never fails; violations are reported.
pub fn validate_motion_ir(timeline: &Timeline) -> ValidationReport {
    let mut issues = Vec::new();
    let total = timeline.metadata.duration;

    if timeline.assets.is_empty() {
        issues.push(Issue::at(
            &[PathElem::Field("assets")],
            "timeline must have at least one asset",
        ));
    }
    if timeline.tracks.is_empty() {
        issues.push(Issue::at(
            &[PathElem::Field("tracks")],
            "timeline must have at least one track",
        ));
    }

    for (ti, track) in timeline.tracks.iter().enumerate() {
        for (li, layer) in track.layers.iter().enumerate() {
            let path = [
                PathElem::Field("tracks"),
                PathElem::Index(ti),
                PathElem::Field("layers"),
                PathElem::Index(li),
            ];
            if layer.end_time() > total + TIME_EPSILON {
                issues.push(Issue::at(
                    &path,
                    format!(
                        "layer '{}' ends at {}s, beyond timeline duration {}s",
                        layer.id,
                        layer.end_time(),
                        total
                    ),
                ));
            }
            for (ki, kf) in layer.keyframes.iter().enumerate() {
                if kf.time < -TIME_EPSILON || kf.time > total + TIME_EPSILON {
                    let mut kpath = path.to_vec();
                    kpath.push(PathElem::Field("keyframes"));
                    kpath.push(PathElem::Index(ki));
                    issues.push(Issue::at(
                        &kpath,
                        format!(
                            "keyframe at {}s in layer '{}' is outside [0, {}s]",
                            kf.time, layer.id, total
                        ),
                    ));
                }
            }
        }
    }

    ValidationReport::from_issues(issues)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/validate.rs"]
mod tests;
