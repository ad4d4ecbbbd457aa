use embedded_time::duration::Nanoseconds;

/// Splits a flat row-major offset back into `(x, y)`. No wiring is applied.
pub fn offset_to_xy(offset: usize, columns: usize) -> (usize, usize) {
    (offset % columns, offset / columns)
}

/// Number of whole `slot`-long timer periods that cover `nanos`, rounding up.
pub fn convert_ns_to_slots(nanos: impl Into<Nanoseconds<u32>>, slot: Nanoseconds<u32>) -> u32 {
    let nanos = nanos.into().0;
    nanos / slot.0 + u32::from(nanos % slot.0 != 0)
}
