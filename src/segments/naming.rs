use crate::scenes::SceneInterval;

/// File name for scene `index`: `{prefix}_{index:04}.mp4`, or with the frame
/// range embedded, `{prefix}_{index:04}_{start:06}-{end:06}.mp4`.
pub fn segment_file_name(
    prefix: &str,
    index: usize,
    interval: SceneInterval,
    include_frame_range: bool,
) -> String {
    if include_frame_range {
        format!(
            "{}_{:04}_{:06}-{:06}.mp4",
            prefix, index, interval.start, interval.end
        )
    } else {
        format!("{}_{:04}.mp4", prefix, index)
    }
}
