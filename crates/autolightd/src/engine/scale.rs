/// Map `value` from the `src` range onto the `dst` range.
///
/// The value is clamped to `src` first and the result is truncated toward
/// zero. A degenerate source range (`src.1 <= src.0`) yields `dst.0`.
pub fn scale(value: i64, src: (i64, i64), dst: (i64, i64)) -> i64 {
    let (src_min, src_max) = src;
    let (dst_min, dst_max) = dst;
    if src_max <= src_min {
        return dst_min;
    }

    let clamped = value.clamp(src_min, src_max);
    let ratio = (clamped - src_min) as f64 / (src_max - src_min) as f64;
    (ratio * (dst_max - dst_min) as f64 + dst_min as f64).trunc() as i64
}
