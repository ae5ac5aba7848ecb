//! Gain unit conversions. Band gain is stored as integer millibel; master
//! gain is stored as a linear multiplier encoded in the bit pattern of an
//! `f32` so it can live in an `AtomicU32`.

/// Converts a dB value to millibel (`round(dB * 1000)`), the storage unit
/// for band gain.
#[inline]
pub fn mdb_from_db(db: f32) -> i32 {
    (db * 1000.0).round() as i32
}

/// Converts millibel back to dB.
#[inline]
pub fn db_from_mdb(mdb: i32) -> f32 {
    mdb as f32 / 1000.0
}

/// Converts a dB value to the linear gain multiplier, then to the bit
/// pattern an `AtomicU32` can hold.
#[inline]
pub fn gain_bits_from_db(db: f32) -> u32 {
    let linear = 10f32.powf(db / 20.0);
    linear.to_bits()
}

/// Recovers the linear gain multiplier from its stored bit pattern.
#[inline]
pub fn gain_from_bits(bits: u32) -> f32 {
    f32::from_bits(bits)
}
