/// Wall-clock seconds since the Unix epoch as an `f64`.
///
/// Message timestamps and `last_update_ts` in the shared book both use this
/// representation. An `f64` holds ~epoch-second magnitudes with sub-microsecond
/// resolution, which is the granularity the protocol guarantees.
#[inline(always)]
pub fn now_secs() -> f64 {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    t.as_secs_f64()
}

#[inline(always)]
pub fn now_ns() -> u64 {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    t.as_nanos() as u64
}
