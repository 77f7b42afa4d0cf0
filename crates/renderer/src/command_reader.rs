//! Decode capability backed by an external helper program.
//!
//! The helper is run once per scene. Its arguments are built from a template
//! in which these placeholders are substituted:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{reader}` | reader id |
//! | `{source}` | payload file |
//! | `{product}` | product (composite) name |
//! | `{area}` | target area definition as JSON |
//! | `{output}` | PNG file the helper must write |
//!
//! `{area}` is the serialized [`AreaDefinition`]:
//!
//! ```json
//! {
//!   "area_id": "euro",
//!   "description": "Europe, polar stereographic, 4 km",
//!   "projection": {"proj": "stere", "lat_0": 90.0, "lon_0": 14.0, "lat_ts": 60.0, "radius": 6371229.0},
//!   "width": 1024,
//!   "height": 1024,
//!   "area_extent": [-2717181.73, -5571048.14, 1378818.27, -1475048.14]
//! }
//! ```
//!
//! `projection.proj` is `latlon`, `geos` (`lon_0`, `h`, `a`, `b`, `sweep`),
//! `lcc` (`lat_0`, `lon_0`, `lat_1`, `lat_2`, `radius`) or `stere` (`lat_0`,
//! `lon_0`, `lat_ts`, `radius`). Extents are in metres, degrees for `latlon`.
//!
//! The helper prints `{"start_time": "...", "end_time": "..."}` as its last
//! line on stdout. Everything it prints on stderr is fed to the warning scope.
//! `tools/satpy-render` implements this contract with satpy.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use projection::AreaDefinition;
use sat_common::parse_iso8601;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::reader::{RawScene, SceneImage, SceneReader};
use crate::warnings::WarningScope;

/// Helper program and argument template.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandReaderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// [`SceneReader`] that delegates decoding to an external program.
#[derive(Debug, Clone)]
pub struct CommandReader {
    reader_id: String,
    config: CommandReaderConfig,
}

#[derive(Debug, Deserialize)]
struct SceneTimes {
    start_time: String,
    end_time: String,
}

/// Scene waiting to be run through the helper.
struct CommandScene {
    reader_id: String,
    config: CommandReaderConfig,
    source: PathBuf,
    product: String,
    area: Option<AreaDefinition>,
}

impl CommandReader {
    pub fn new(reader_id: impl Into<String>, config: CommandReaderConfig) -> Self {
        Self {
            reader_id: reader_id.into(),
            config,
        }
    }

    pub fn reader_id(&self) -> &str {
        &self.reader_id
    }
}

impl SceneReader for CommandReader {
    fn load(
        &self,
        source: &Path,
        product: &str,
        _warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>> {
        if !source.is_file() {
            return Err(RenderError::Decode {
                source_file: source.to_path_buf(),
                message: "payload file does not exist".to_string(),
            });
        }

        Ok(Box::new(CommandScene {
            reader_id: self.reader_id.clone(),
            config: self.config.clone(),
            source: source.to_path_buf(),
            product: product.to_string(),
            area: None,
        }))
    }
}

impl RawScene for CommandScene {
    fn resample(
        mut self: Box<Self>,
        area: &AreaDefinition,
        _warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>> {
        self.area = Some(area.clone());
        Ok(self)
    }

    fn enhance(self: Box<Self>, warnings: &mut WarningScope<'_>) -> RenderResult<SceneImage> {
        let decode_error = |message: String| RenderError::Decode {
            source_file: self.source.clone(),
            message,
        };

        let output = tempfile::Builder::new()
            .prefix(".scene")
            .suffix(".png")
            .tempfile()?;

        let area_json = serde_json::to_string(&self.area)
            .map_err(|e| decode_error(format!("failed to serialize area: {}", e)))?;

        let source = self.source.to_string_lossy();
        let output_path = output.path().to_string_lossy();
        let values = [
            ("{reader}", self.reader_id.as_str()),
            ("{source}", source.as_ref()),
            ("{product}", self.product.as_str()),
            ("{area}", area_json.as_str()),
            ("{output}", output_path.as_ref()),
        ];
        let args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|arg| substitute(arg, &values))
            .collect();

        debug!(command = %self.config.command, ?args, "Running scene helper");

        let result = Command::new(&self.config.command)
            .args(&args)
            .output()
            .map_err(|e| decode_error(format!("failed to run {}: {}", self.config.command, e)))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        for line in stderr.lines() {
            warnings.observe(line);
        }

        if !result.status.success() {
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(decode_error(format!(
                "{} exited with {}: {}",
                self.config.command,
                result.status,
                last.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&result.stdout);
        let (start_time, end_time) = parse_scene_times(&stdout).map_err(decode_error)?;

        let image = image::open(output.path())?.to_rgba8();

        Ok(SceneImage {
            image,
            start_time,
            end_time,
        })
    }
}

fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
}

/// Read scene times from the helper's last non-empty stdout line.
fn parse_scene_times(stdout: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| "helper printed no scene times".to_string())?;

    let times: SceneTimes = serde_json::from_str(line.trim())
        .map_err(|e| format!("malformed scene times {:?}: {}", line, e))?;

    let start = parse_iso8601(&times.start_time).map_err(|e| e.to_string())?;
    let end = parse_iso8601(&times.end_time).map_err(|e| e.to_string())?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_substitute_placeholders() {
        let arg = substitute(
            "--in={source}:{product}",
            &[("{source}", "/data/a.nat"), ("{product}", "natural_color")],
        );
        assert_eq!(arg, "--in=/data/a.nat:natural_color");
    }

    #[test]
    fn test_parse_scene_times_uses_last_line() {
        let stdout = "loading...\n{\"start_time\": \"2015-04-14T09:00:09.6\", \"end_time\": \"2015-04-14T09:12:41\"}\n\n";
        let (start, end) = parse_scene_times(stdout).unwrap();
        assert_eq!(start.timestamp(), Utc.with_ymd_and_hms(2015, 4, 14, 9, 0, 9).unwrap().timestamp());
        assert_eq!(end, Utc.with_ymd_and_hms(2015, 4, 14, 9, 12, 41).unwrap());
    }

    #[test]
    fn test_parse_scene_times_errors() {
        assert!(parse_scene_times("").is_err());
        assert!(parse_scene_times("done").is_err());
        assert!(parse_scene_times(r#"{"start_time": "yesterday", "end_time": "today"}"#).is_err());
    }

    #[test]
    fn test_area_json_matches_documented_shape() {
        let area = AreaDefinition::new(
            "euro",
            projection::Projection::Stere(projection::PolarStereographic::north(14.0, 60.0)),
            1024,
            1024,
            [-2717181.73, -5571048.14, 1378818.27, -1475048.14].into(),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::to_value(Some(&area)).unwrap();

        assert_eq!(json["area_id"], "euro");
        assert_eq!(json["projection"]["proj"], "stere");
        assert_eq!(json["projection"]["lat_ts"], 60.0);
        assert!(json["projection"]["radius"].is_number());
        assert_eq!(json["width"], 1024);
        assert_eq!(json["area_extent"][3], -1475048.14);
    }

    #[test]
    fn test_missing_payload_fails_on_load() {
        let reader = CommandReader::new(
            "seviri_l1b_native",
            CommandReaderConfig {
                command: "true".to_string(),
                args: Vec::new(),
            },
        );
        let filter = crate::warnings::WarningFilter::default();
        let mut scope = filter.scope("test");
        let result = reader.load(Path::new("/nonexistent/scene.nat"), "natural_color", &mut scope);
        assert!(matches!(result, Err(RenderError::Decode { .. })));
    }

    #[cfg(unix)]
    fn shell_reader(script: &str) -> CommandReader {
        CommandReader::new(
            "seviri_l1b_native",
            CommandReaderConfig {
                command: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    script.to_string(),
                    "helper".to_string(),
                    "{output}".to_string(),
                    "{product}".to_string(),
                ],
            },
        )
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("scene.nat");
        std::fs::write(&payload, b"native").unwrap();
        let fixture = dir.path().join("fixture.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 255]))
            .save(&fixture)
            .unwrap();

        let script = format!(
            "cp {} \"$1\" && echo 'RuntimeWarning: invalid value encountered' >&2 && \
             echo '{{\"start_time\": \"2015-04-14T09:00:09\", \"end_time\": \"2015-04-14T09:12:41\"}}'",
            fixture.display()
        );
        let reader = shell_reader(&script);
        let filter = crate::warnings::WarningFilter::default();
        let mut scope = filter.scope("test");

        let area = AreaDefinition::new(
            "tiny",
            projection::Projection::Latlon,
            4,
            3,
            [0.0, 0.0, 4.0, 3.0].into(),
        )
        .unwrap();
        let scene = reader.load(&payload, "natural_color", &mut scope).unwrap();
        let scene = scene.resample(&area, &mut scope).unwrap();
        let image = scene.enhance(&mut scope).unwrap();

        assert_eq!(image.image.dimensions(), (4, 3));
        assert_eq!(image.end_time, Utc.with_ymd_and_hms(2015, 4, 14, 9, 12, 41).unwrap());
        assert_eq!(scope.suppressed(), 1);
        assert_eq!(scope.reported(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_failure_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("scene.nat");
        std::fs::write(&payload, b"native").unwrap();

        let reader = shell_reader("echo \"unknown composite $2\" >&2; exit 3");
        let filter = crate::warnings::WarningFilter::default();
        let mut scope = filter.scope("test");

        let scene = reader.load(&payload, "bogus", &mut scope).unwrap();
        match scene.enhance(&mut scope) {
            Err(RenderError::Decode { message, .. }) => {
                assert!(message.contains("unknown composite bogus"), "{}", message);
            }
            Err(other) => panic!("expected Decode, got {}", other),
            Ok(_) => panic!("expected Decode, got a scene"),
        }
        assert_eq!(scope.reported(), 1);
    }
}
