//! PCM resampling and track mixing.

/// Native sample rate of every track.
pub const SOURCE_SAMPLE_RATE: f64 = 8192.0;

/// Nearest-neighbour resample from `src_rate` to `dst_rate`.
///
/// Output length is `src.len() / src_rate * dst_rate`; positions past the end
/// of `src` read as silence.
pub fn resample_nearest(src: &[i16], src_rate: f64, dst_rate: u32) -> Vec<i16> {
    if src.is_empty() || src_rate <= 0.0 || dst_rate == 0 {
        return Vec::new();
    }
    let dst_rate = f64::from(dst_rate);
    let dst_len = (src.len() as f64 / src_rate * dst_rate) as usize;
    let step = src_rate / dst_rate;

    (0..dst_len)
        .map(|i| {
            let pos = (i as f64 * step).round() as usize;
            src.get(pos).copied().unwrap_or(0)
        })
        .collect()
}

/// Add half of `src` into `dst` starting at `offset`, clamping to i16.
///
/// Samples that fall past the end of `dst` are dropped.
pub fn mix_into(dst: &mut [i16], src: &[i16], offset: usize) {
    let Some(window) = dst.get_mut(offset..) else {
        return;
    };
    for (out, &sample) in window.iter_mut().zip(src) {
        let mixed = i32::from(*out) + i32::from(sample / 2);
        *out = mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
}

/// Start sample of frame `frame` at `framerate` frames per second.
pub fn frame_offset(frame: usize, dst_rate: u32, framerate: f64) -> usize {
    (frame as f64 * f64::from(dst_rate) / framerate).ceil() as usize
}

/// Master buffer length for `duration` seconds.
pub fn master_len(duration: f64, dst_rate: u32) -> usize {
    (duration * f64::from(dst_rate)).ceil() as usize + 1
}
