//! Animated GIF assembly.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use sat_common::write_atomically;
use tracing::{debug, info, instrument};

use crate::error::{AnimationError, AnimationResult};

/// Validate a per-frame duration given in seconds.
pub fn frame_duration_from_secs(secs: f64) -> AnimationResult<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(AnimationError::InvalidFrameDuration(secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| AnimationError::InvalidFrameDuration(secs))
}

/// Encode `frames` in order into a looping GIF at `output`.
///
/// Every frame is shown for `frame_duration`. The output is always
/// rewritten, atomically, even if it already exists. All frames must match
/// the first frame's dimensions.
#[instrument(skip(frames), fields(frames = frames.len(), output = %output.display()))]
pub fn animate(
    frames: &[PathBuf],
    output: &Path,
    frame_duration: Duration,
) -> AnimationResult<PathBuf> {
    let Some(first) = frames.first() else {
        return Err(AnimationError::EmptyFrameSequence);
    };

    let delay_ms = u32::try_from(frame_duration.as_millis()).unwrap_or(u32::MAX);
    if delay_ms == 0 {
        return Err(AnimationError::InvalidFrameDuration(
            frame_duration.as_secs_f64(),
        ));
    }

    let expected = image::image_dimensions(first)?;

    let mut encoded = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut encoded);
        encoder.set_repeat(Repeat::Infinite)?;

        for path in frames {
            let image = image::open(path)?.to_rgba8();
            let actual = image.dimensions();
            if actual != expected {
                return Err(AnimationError::FrameSizeMismatch {
                    path: path.clone(),
                    expected,
                    actual,
                });
            }

            encoder.encode_frame(Frame::from_parts(
                image,
                0,
                0,
                Delay::from_numer_denom_ms(delay_ms, 1),
            ))?;
            debug!(frame = %path.display(), "Encoded frame");
        }
    }

    write_atomically(output, |file| file.write_all(&encoded))?;

    info!(
        output = %output.display(),
        frames = frames.len(),
        bytes = encoded.len(),
        "Wrote animation"
    );

    Ok(output.to_path_buf())
}
